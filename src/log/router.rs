use serde::Deserialize;
use smart_default::SmartDefault;
use std::collections::HashMap;
use std::path::Path;
use std::sync::{Arc, Once};
use tokio::sync::Mutex;

use crate::cfg::{parse_by_extension, TypeOptions};
use crate::log::channel::{
    create_channel_from_options, register_channels, AggregationChannel, ConsoleChannel, FileChannel,
    LogChannel, NotifierChannel, StorageChannel,
};
use crate::log::error::{LogError, Result};
use crate::log::level::{LogLevel, LogMethod};
use crate::log::log_record::{Context, LogEvent};
use crate::log::timer::{Timer, TimerHandler};

/// LogRouter 配置
///
/// `channels` 按分发顺序列出启用的通道名称，每个名称都必须在 `definitions` 中定义
///
/// ```yaml
/// name: settle
/// channels: [console, file]
/// definitions:
///   console:
///     type: ConsoleChannel
///   file:
///     type: FileChannel
///     options:
///       path: /tmp/settle.log
/// ```
#[derive(Debug, Clone, Deserialize, SmartDefault, PartialEq)]
#[serde(default)]
pub struct RouterConfig {
    /// router 名称，写入文件日志的行首
    #[default = "stacklog"]
    pub name: String,

    /// 启用的通道
    pub channels: Vec<String>,

    /// 通道定义
    pub definitions: HashMap<String, TypeOptions>,
}

impl RouterConfig {
    /// 按扩展名读取 JSON/JSON5、YAML 或 TOML 配置文件
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)?;
        parse_by_extension(path, &content)
            .map_err(|e| LogError::configuration(format!("{}: {:#}", path.display(), e)))
    }
}

/// 注册所有通道（只执行一次）
static REGISTER_ONCE: Once = Once::new();

/// 守卫检查的结果
///
/// 由调用方决定失败后是退出进程、返回错误还是继续
#[must_use]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Guard {
    Passed,
    Failed(String),
}

impl Guard {
    pub fn is_failed(&self) -> bool {
        matches!(self, Guard::Failed(_))
    }

    /// 失败时转换为 `LogError::Guard`
    pub fn into_result(self) -> Result<()> {
        match self {
            Guard::Passed => Ok(()),
            Guard::Failed(message) => Err(LogError::Guard(message)),
        }
    }

    /// 失败时以状态码 1 退出进程
    pub fn exit_on_failure(self) {
        if self.is_failed() {
            std::process::exit(1);
        }
    }
}

/// 多通道日志路由
///
/// 每次日志调用构造一个 `LogEvent`，按配置顺序依次交给各通道。
/// 单个通道失败不影响其他通道，全部尝试后统一返回错误。
pub struct LogRouter {
    name: String,
    channels: Vec<(String, Arc<dyn LogChannel>)>,
    timer_handler: Mutex<TimerHandler>,
}

impl LogRouter {
    /// 从配置创建，未配置任何通道时返回配置错误
    pub fn new(config: RouterConfig) -> Result<Self> {
        REGISTER_ONCE.call_once(|| {
            if let Err(err) = register_channels() {
                tracing::error!(error = %err, "failed to register log channels");
            }
        });

        if config.channels.is_empty() {
            return Err(LogError::configuration(
                "at least one channel must be configured",
            ));
        }

        let mut channels = Vec::with_capacity(config.channels.len());
        for name in &config.channels {
            let options = config.definitions.get(name).ok_or_else(|| {
                LogError::configuration(format!("channel '{}' is not defined", name))
            })?;
            let channel = create_channel_from_options(options).map_err(|e| {
                LogError::configuration(format!("channel '{}': {:#}", name, e))
            })?;
            channels.push((name.clone(), Arc::from(channel)));
        }

        Self::from_channels(config.name, channels)
    }

    /// 使用已创建的通道
    pub fn from_channels(
        name: impl Into<String>,
        channels: Vec<(String, Arc<dyn LogChannel>)>,
    ) -> Result<Self> {
        if channels.is_empty() {
            return Err(LogError::configuration(
                "at least one channel must be configured",
            ));
        }

        Ok(Self {
            name: name.into(),
            channels,
            timer_handler: Mutex::new(TimerHandler::new()),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn channel_names(&self) -> Vec<&str> {
        self.channels.iter().map(|(name, _)| name.as_str()).collect()
    }

    /// 按名称取通道
    pub fn channel(&self, name: &str) -> Option<&dyn LogChannel> {
        self.channels
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, channel)| channel.as_ref())
    }

    /// 取第一个指定类型的通道
    pub fn channel_of<T: 'static>(&self) -> Option<&T> {
        self.channels
            .iter()
            .find_map(|(_, channel)| channel.as_any().downcast_ref::<T>())
    }

    pub fn console(&self) -> Option<&ConsoleChannel> {
        self.channel_of::<ConsoleChannel>()
    }

    pub fn file(&self) -> Option<&FileChannel> {
        self.channel_of::<FileChannel>()
    }

    pub fn storage(&self) -> Option<&StorageChannel> {
        self.channel_of::<StorageChannel>()
    }

    pub fn aggregation(&self) -> Option<&AggregationChannel> {
        self.channel_of::<AggregationChannel>()
    }

    pub fn notifier(&self) -> Option<&NotifierChannel> {
        self.channel_of::<NotifierChannel>()
    }

    /// 把事件依次交给每个通道
    pub async fn dispatch(&self, event: LogEvent) -> Result<()> {
        let mut errors = Vec::new();
        for (name, channel) in &self.channels {
            match channel.handle(&event).await {
                Ok(true) => break,
                Ok(false) => {}
                Err(err) => {
                    tracing::debug!(channel = %name, error = %err, "channel failed to handle event");
                    errors.push(err);
                }
            }
        }

        match LogError::collapse(errors) {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    pub async fn log(
        &self,
        level: LogLevel,
        message: impl Into<String>,
        context: impl Into<Context>,
    ) -> Result<()> {
        let event = LogEvent::new(level, message, context).with_channel(self.name.clone());
        self.dispatch(event).await
    }

    /// 按方法调用，别名映射到对应级别
    pub async fn call(
        &self,
        method: LogMethod,
        message: impl Into<String>,
        context: impl Into<Context>,
    ) -> Result<()> {
        self.log(method.level(), message, context).await
    }

    /// 按方法名调用，未知名称返回配置错误
    pub async fn call_by_name(
        &self,
        method: &str,
        message: impl Into<String>,
        context: impl Into<Context>,
    ) -> Result<()> {
        let method: LogMethod = method.parse().map_err(LogError::Configuration)?;
        self.call(method, message, context).await
    }

    pub async fn emergency(&self, message: impl Into<String>, context: impl Into<Context>) -> Result<()> {
        self.log(LogLevel::Emergency, message, context).await
    }

    pub async fn alert(&self, message: impl Into<String>, context: impl Into<Context>) -> Result<()> {
        self.log(LogLevel::Alert, message, context).await
    }

    pub async fn critical(&self, message: impl Into<String>, context: impl Into<Context>) -> Result<()> {
        self.log(LogLevel::Critical, message, context).await
    }

    pub async fn error(&self, message: impl Into<String>, context: impl Into<Context>) -> Result<()> {
        self.log(LogLevel::Error, message, context).await
    }

    pub async fn warning(&self, message: impl Into<String>, context: impl Into<Context>) -> Result<()> {
        self.log(LogLevel::Warning, message, context).await
    }

    pub async fn notice(&self, message: impl Into<String>, context: impl Into<Context>) -> Result<()> {
        self.log(LogLevel::Notice, message, context).await
    }

    pub async fn info(&self, message: impl Into<String>, context: impl Into<Context>) -> Result<()> {
        self.log(LogLevel::Info, message, context).await
    }

    pub async fn debug(&self, message: impl Into<String>, context: impl Into<Context>) -> Result<()> {
        self.log(LogLevel::Debug, message, context).await
    }

    pub async fn line(&self, message: impl Into<String>, context: impl Into<Context>) -> Result<()> {
        self.call(LogMethod::Line, message, context).await
    }

    pub async fn comment(&self, message: impl Into<String>, context: impl Into<Context>) -> Result<()> {
        self.call(LogMethod::Comment, message, context).await
    }

    pub async fn warn(&self, message: impl Into<String>, context: impl Into<Context>) -> Result<()> {
        self.call(LogMethod::Warn, message, context).await
    }

    /// 通过终端通道提问
    pub async fn ask(&self, prompt: &str) -> Result<String> {
        let console = self
            .console()
            .ok_or_else(|| LogError::configuration("no console channel configured"))?;
        console.ask(prompt).await
    }

    /// 刷新所有通道
    pub async fn flush(&self) -> Result<()> {
        let mut errors = Vec::new();
        for (_, channel) in &self.channels {
            if let Err(err) = channel.flush().await {
                errors.push(err);
            }
        }
        match LogError::collapse(errors) {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    /// 收集所有能生成链接的通道的链接
    pub async fn links(&self) -> Vec<(String, String)> {
        let mut links = Vec::new();
        for (name, channel) in &self.channels {
            if let Some(provider) = channel.as_link_provider() {
                if let Some(link) = provider.link().await {
                    links.push((name.clone(), link));
                }
            }
        }
        links
    }

    pub async fn watch(&self) {
        self.timer_handler.lock().await.watch();
    }

    /// 返回距上次 watch/timing 的间隔文本，不写日志
    pub async fn timing(&self, message: &str) -> String {
        self.timer_handler.lock().await.timing(message)
    }

    pub async fn create_timers(&self, count: usize) -> Vec<Timer> {
        self.timer_handler.lock().await.create_timers(count)
    }

    pub fn create_timer(&self) -> Timer {
        Timer::new()
    }

    /// 条件成立时记录错误并返回失败的守卫，否则记录成功消息（若有）
    pub async fn fail_if(
        &self,
        condition: bool,
        error_message: &str,
        success_message: Option<&str>,
    ) -> Result<Guard> {
        if condition {
            self.error(error_message, ()).await?;
            tracing::error!(reason = error_message, "guard failed");
            return Ok(Guard::Failed(error_message.to_string()));
        }

        if let Some(message) = success_message.filter(|m| !m.is_empty()) {
            self.info(message, ()).await?;
        }
        Ok(Guard::Passed)
    }

    /// 条件不成立时失败
    pub async fn fail_unless(
        &self,
        condition: bool,
        error_message: &str,
        success_message: Option<&str>,
    ) -> Result<Guard> {
        self.fail_if(!condition, error_message, success_message).await
    }

    /// 条件成立时返回 `LogError::Guard`
    pub async fn throw_if(
        &self,
        condition: bool,
        error_message: &str,
        success_message: Option<&str>,
    ) -> Result<()> {
        self.fail_if(condition, error_message, success_message)
            .await?
            .into_result()
    }

    /// 条件不成立时返回 `LogError::Guard`
    pub async fn throw_unless(
        &self,
        condition: bool,
        error_message: &str,
        success_message: Option<&str>,
    ) -> Result<()> {
        self.fail_unless(condition, error_message, success_message)
            .await?
            .into_result()
    }
}
