use std::any::Any;

use crate::log::error::Result;
use crate::log::level::LogLevel;
use crate::log::log_record::LogEvent;

/// 日志通道 trait
///
/// 每个通道接收同一个只读的 `LogEvent`，按自己的规则格式化并投递。
/// `handle` 返回事件是否被吸收：被吸收后 router 不再把事件交给后续通道。
#[async_trait::async_trait]
pub trait LogChannel: Send + Sync {
    /// 通道类型名，与注册名一致
    fn kind(&self) -> &'static str;

    /// 最低处理级别
    fn level(&self) -> LogLevel;

    /// 处理后是否继续向后传递
    fn bubble(&self) -> bool;

    fn is_handling(&self, level: LogLevel) -> bool {
        level >= self.level()
    }

    /// 处理一条日志
    ///
    /// 级别低于阈值时直接返回 `Ok(false)`，不产生任何输出
    async fn handle(&self, event: &LogEvent) -> Result<bool>;

    /// 刷新缓冲（默认实现为空操作）
    async fn flush(&self) -> Result<()> {
        Ok(())
    }

    /// 用于按具体类型访问通道
    fn as_any(&self) -> &dyn Any;

    /// 能生成查看链接的通道返回自身
    fn as_link_provider(&self) -> Option<&dyn LinkProvider> {
        None
    }
}

/// 可生成外部查看链接的通道
#[async_trait::async_trait]
pub trait LinkProvider: Send + Sync {
    async fn link(&self) -> Option<String>;
}
