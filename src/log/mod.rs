//! 日志模块
//!
//! 一个 `LogRouter` 对应一组按名称配置的通道。每次日志调用构造一个只读的
//! `LogEvent`，依次交给所有通道；某个通道失败不影响其他通道。
//!
//! # 特性
//!
//! - syslog 八个级别，以及 `line`、`comment`、`warn` 别名
//! - 终端、文件、对象存储、日志聚合、聊天通知五种通道
//! - 基于 `TypeOptions` 的配置创建
//! - 进程级共享 router，`destroy` 后按配置重建
//! - 分段计时与累计计时器
//!
//! # 快速开始
//!
//! ```rust,no_run
//! use stacklog::log::*;
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!     let config: RouterConfig = json5::from_str(r#"
//!         {
//!             name: "settle",
//!             channels: ["console", "file"],
//!             definitions: {
//!                 console: { type: "ConsoleChannel" },
//!                 file: { type: "FileChannel", options: { path: "/tmp/settle.log" } },
//!             },
//!         }
//!     "#).map_err(|e| LogError::configuration(e.to_string()))?;
//!
//!     let router = LogRouter::new(config)?;
//!     router.error("disk full", stacklog::context! { "code" => 42 }).await?;
//!
//!     if let Some(file) = router.file() {
//!         file.set_path("/tmp/other.log").await;
//!     }
//!     router.info("moved", ()).await?;
//!
//!     router.fail_unless(true, "precondition failed", Some("precondition ok"))
//!         .await?
//!         .into_result()?;
//!     Ok(())
//! }
//! ```

pub mod channel;
mod error;
mod global_router;
mod level;
mod log_record;
mod router;
mod timer;
mod transformer;

pub use channel::{
    AggregationChannel, AggregationChannelConfig, CloudLoggingClient, CloudLoggingService,
    ConsoleChannel, ConsoleChannelConfig, FileChannel, FileChannelConfig, LinkProvider, LogChannel,
    LogEntry, NotifierChannel, NotifierChannelConfig, SinkDestination, SinkRequest, StorageChannel,
    StorageChannelConfig, SubLogger,
};
pub use error::{LogError, Result};
pub use global_router::{call, destroy, global_router, init, is_active, log};
pub use level::{LogLevel, LogMethod};
pub use log_record::{Context, LogEvent, MetadataValue};
pub use router::{Guard, LogRouter, RouterConfig};
pub use timer::{Timer, TimerHandler};
pub use transformer::MessageTransformer;
