use once_cell::sync::Lazy;
use std::sync::Arc;
use tokio::sync::Mutex;

use crate::log::error::{LogError, Result};
use crate::log::level::{LogLevel, LogMethod};
use crate::log::log_record::Context;
use crate::log::router::{LogRouter, RouterConfig};

#[derive(Default)]
struct GlobalSlot {
    config: Option<RouterConfig>,
    router: Option<Arc<LogRouter>>,
}

/// 进程内共享的 router
///
/// 保存配置，第一次访问时才构造 router；`destroy` 之后下一次访问会重新构造，
/// 运行期间对通道的修改（路径、接收者等）不会带到下一个任务。
static GLOBAL_SLOT: Lazy<Mutex<GlobalSlot>> = Lazy::new(|| Mutex::new(GlobalSlot::default()));

/// 设置全局 router 的配置
///
/// 已构造的 router 会先 flush 再丢弃
///
/// # 示例
///
/// ```ignore
/// stacklog::log::init(RouterConfig::from_file("config.yaml")?).await?;
/// stacklog::log::global_router().await?.info("job started", ()).await?;
/// stacklog::log::destroy().await?;
/// ```
pub async fn init(config: RouterConfig) -> Result<()> {
    let previous = {
        let mut slot = GLOBAL_SLOT.lock().await;
        slot.config = Some(config);
        slot.router.take()
    };

    if let Some(router) = previous {
        router.flush().await?;
    }
    Ok(())
}

/// 取得全局 router，尚未构造时按配置构造
pub async fn global_router() -> Result<Arc<LogRouter>> {
    let mut slot = GLOBAL_SLOT.lock().await;
    if let Some(router) = &slot.router {
        return Ok(router.clone());
    }

    let config = slot
        .config
        .clone()
        .ok_or_else(|| LogError::configuration("global router is not initialized"))?;
    let router = Arc::new(LogRouter::new(config)?);
    tracing::debug!(router = router.name(), "global router created");
    slot.router = Some(router.clone());
    Ok(router)
}

/// 丢弃当前的全局 router，下一次访问时按配置重新构造
///
/// 丢弃前会 flush 所有通道
pub async fn destroy() -> Result<()> {
    let router = GLOBAL_SLOT.lock().await.router.take();
    if let Some(router) = router {
        router.flush().await?;
        tracing::debug!(router = router.name(), "global router destroyed");
    }
    Ok(())
}

/// 全局 router 当前是否已构造
pub async fn is_active() -> bool {
    GLOBAL_SLOT.lock().await.router.is_some()
}

/// 使用全局 router 记录日志
pub async fn log(
    level: LogLevel,
    message: impl Into<String>,
    context: impl Into<Context>,
) -> Result<()> {
    global_router().await?.log(level, message, context).await
}

/// 使用全局 router 按方法调用
pub async fn call(
    method: LogMethod,
    message: impl Into<String>,
    context: impl Into<Context>,
) -> Result<()> {
    global_router().await?.call(method, message, context).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    fn file_config(path: &std::path::Path) -> anyhow::Result<RouterConfig> {
        Ok(json5::from_str(&format!(
            r#"{{
                name: "global",
                channels: ["file"],
                definitions: {{
                    file: {{ type: "FileChannel", options: {{ path: "{}" }} }},
                }},
            }}"#,
            path.display()
        ))?)
    }

    #[tokio::test]
    #[serial]
    async fn test_uninitialized_is_configuration_error() -> anyhow::Result<()> {
        GLOBAL_SLOT.lock().await.config = None;
        destroy().await?;

        let result = global_router().await;
        assert!(matches!(result, Err(LogError::Configuration(_))));
        Ok(())
    }

    #[tokio::test]
    #[serial]
    async fn test_same_instance_until_destroy() -> anyhow::Result<()> {
        let temp_dir = tempfile::TempDir::new()?;
        init(file_config(&temp_dir.path().join("a.log"))?).await?;
        assert!(!is_active().await);

        let first = global_router().await?;
        let second = global_router().await?;
        assert!(Arc::ptr_eq(&first, &second));
        assert!(is_active().await);

        destroy().await?;
        assert!(!is_active().await);
        let third = global_router().await?;
        assert!(!Arc::ptr_eq(&first, &third));

        destroy().await?;
        Ok(())
    }

    #[tokio::test]
    #[serial]
    async fn test_destroy_reverts_channel_state() -> anyhow::Result<()> {
        let temp_dir = tempfile::TempDir::new()?;
        let default_path = temp_dir.path().join("default.log");
        let custom_path = temp_dir.path().join("custom.log");
        init(file_config(&default_path)?).await?;

        let router = global_router().await?;
        router
            .file()
            .ok_or_else(|| anyhow::anyhow!("file channel missing"))?
            .set_path(&custom_path)
            .await;
        log(LogLevel::Info, "job one", ()).await?;

        destroy().await?;
        call(LogMethod::Comment, "job two", ()).await?;

        let custom = tokio::fs::read_to_string(&custom_path).await?;
        let default = tokio::fs::read_to_string(&default_path).await?;
        assert!(custom.contains("job one"));
        assert!(!custom.contains("job two"));
        assert!(default.contains("global.DEBUG: job two"));

        destroy().await?;
        Ok(())
    }
}
