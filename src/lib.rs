//! stacklog - 多通道日志路由
//!
//! 一次日志调用（级别、消息、结构化上下文）按配置分发到多个后端通道，
//! 每个通道有自己的格式、投递方式和失败处理。
//!
//! ## 模块
//!
//! - **cfg**: 配置管理模块（TypeOptions + 类型注册表）
//! - **log**: 日志路由、各通道实现、计时器
//! - **oss**: 对象存储模块（GCP GCS）
//!
//! ## 通道
//!
//! - `ConsoleChannel`: 按级别加样式输出到终端
//! - `FileChannel`: 追加写入本地文件
//! - `StorageChannel`: 把本地文件上传到对象存储
//! - `AggregationChannel`: 写入日志聚合服务，支持批量发送和导出 sink
//! - `NotifierChannel`: 通过聊天机器人推送

pub mod cfg;
pub mod log;
pub mod oss;

// 重新导出主要的公共 API
pub use cfg::{create_trait_from_type_options, register_trait, TypeOptions};

pub use log::{
    Context, Guard, LogChannel, LogError, LogEvent, LogLevel, LogMethod, LogRouter, MetadataValue,
    RouterConfig, Timer, TimerHandler,
};

pub use oss::{GcpGcsObjectStore, GcpGcsObjectStoreConfig, ObjectStore, ObjectStoreError, PutOptions};
