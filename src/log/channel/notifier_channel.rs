// API 文档参考：
// Telegram Bot API sendMessage: https://core.telegram.org/bots/api#sendmessage
// HTML 格式支持的标签: https://core.telegram.org/bots/api#html-style

use garde::Validate;
use serde::{Deserialize, Serialize};
use smart_default::SmartDefault;
use std::any::Any;
use std::time::Duration;
use tokio::sync::RwLock;

use crate::log::channel::console_channel::truncate_chars;
use crate::log::channel::LogChannel;
use crate::log::error::{LogError, Result};
use crate::log::level::LogLevel;
use crate::log::log_record::LogEvent;
use crate::log::transformer::MessageTransformer;

/// 单条消息的最大字符数
const MAX_MESSAGE_CHARS: usize = 4096;

/// NotifierChannel 配置
#[derive(Debug, Clone, Deserialize, SmartDefault, Validate)]
#[serde(default)]
pub struct NotifierChannelConfig {
    /// Bot API key
    #[garde(length(min = 1))]
    #[default = ""]
    pub api_key: String,

    /// 接收者 ID 列表
    #[garde(skip)]
    pub chat_ids: Vec<String>,

    /// 关闭通知声音（仍会投递）
    #[garde(skip)]
    pub disable_notification: bool,

    #[garde(skip)]
    #[default = "https://api.telegram.org"]
    pub endpoint: String,

    #[garde(range(min = 1))]
    #[default = 10]
    pub timeout_secs: u64,

    #[garde(skip)]
    #[default(LogLevel::Debug)]
    pub level: LogLevel,

    #[garde(skip)]
    #[default = true]
    pub bubble: bool,
}

#[derive(Debug)]
struct NotifierState {
    api_key: String,
    chat_ids: Vec<String>,
    disable_notification: bool,
}

#[derive(Debug, Serialize)]
struct SendMessageRequest<'a> {
    chat_id: &'a str,
    text: &'a str,
    parse_mode: &'static str,
    disable_notification: bool,
    disable_web_page_preview: bool,
}

/// 聊天机器人通知通道
///
/// 消息以 HTML 模式发送，调用方只应使用 Bot API 支持的标签。
/// 每个接收者单独发送，某个接收者失败不影响其他接收者。
pub struct NotifierChannel {
    config: NotifierChannelConfig,
    client: reqwest::Client,
    state: RwLock<NotifierState>,
}

impl NotifierChannel {
    pub fn new(config: NotifierChannelConfig) -> Result<Self> {
        if let Err(errors) = config.validate() {
            return Err(LogError::configuration(format!("{}", errors)));
        }

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| LogError::configuration(format!("failed to build http client: {}", e)))?;

        let mut chat_ids: Vec<String> = Vec::with_capacity(config.chat_ids.len());
        for chat_id in &config.chat_ids {
            if !chat_ids.contains(chat_id) {
                chat_ids.push(chat_id.clone());
            }
        }

        let state = NotifierState {
            api_key: config.api_key.clone(),
            chat_ids,
            disable_notification: config.disable_notification,
        };

        Ok(Self {
            config,
            client,
            state: RwLock::new(state),
        })
    }

    pub async fn set_chat_ids<I, S>(&self, chat_ids: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut unique: Vec<String> = Vec::new();
        for chat_id in chat_ids.into_iter().map(Into::into) {
            if !unique.contains(&chat_id) {
                unique.push(chat_id);
            }
        }
        self.state.write().await.chat_ids = unique;
    }

    /// 添加接收者，已存在时不重复添加
    pub async fn add_chat_id(&self, chat_id: impl Into<String>) {
        let chat_id = chat_id.into();
        let mut state = self.state.write().await;
        if !state.chat_ids.contains(&chat_id) {
            state.chat_ids.push(chat_id);
        }
    }

    pub async fn remove_chat_id(&self, chat_id: &str) {
        self.state.write().await.chat_ids.retain(|id| id != chat_id);
    }

    pub async fn chat_ids(&self) -> Vec<String> {
        self.state.read().await.chat_ids.clone()
    }

    pub async fn set_api_key(&self, api_key: impl Into<String>) {
        self.state.write().await.api_key = api_key.into();
    }

    pub async fn enable_notification(&self) {
        self.state.write().await.disable_notification = false;
    }

    pub async fn disable_notification(&self) {
        self.state.write().await.disable_notification = true;
    }

    pub async fn is_notification_disabled(&self) -> bool {
        self.state.read().await.disable_notification
    }

    /// 把文本发给所有接收者，返回成功的数量
    pub async fn send(&self, text: &str) -> Result<usize> {
        let (api_key, chat_ids, disable_notification) = {
            let state = self.state.read().await;
            (
                state.api_key.clone(),
                state.chat_ids.clone(),
                state.disable_notification,
            )
        };

        let text = truncate_chars(text, MAX_MESSAGE_CHARS);
        let url = format!(
            "{}/bot{}/sendMessage",
            self.config.endpoint.trim_end_matches('/'),
            api_key
        );

        let mut delivered = 0;
        let mut errors = Vec::new();
        for chat_id in &chat_ids {
            let request = SendMessageRequest {
                chat_id,
                text: &text,
                parse_mode: "HTML",
                disable_notification,
                disable_web_page_preview: true,
            };
            match self.send_one(&url, &request).await {
                Ok(()) => delivered += 1,
                Err(err) => {
                    tracing::debug!(chat_id = %chat_id, error = %err, "notifier delivery failed");
                    errors.push(err);
                }
            }
        }

        match LogError::collapse(errors) {
            Some(err) => Err(err),
            None => Ok(delivered),
        }
    }

    async fn send_one(&self, url: &str, request: &SendMessageRequest<'_>) -> Result<()> {
        let response = self
            .client
            .post(url)
            .json(request)
            .send()
            .await
            .map_err(|e| LogError::delivery("notifier", format!("chat {}: {}", request.chat_id, without_url(e))))?;

        let status = response.status();
        if status.is_success() {
            return Ok(());
        }
        let body = response.text().await.unwrap_or_default();
        Err(LogError::delivery(
            "notifier",
            format!("chat {}: HTTP {}: {}", request.chat_id, status.as_u16(), body),
        ))
    }
}

/// 请求地址里带有 api key，错误信息中去掉
fn without_url(err: reqwest::Error) -> String {
    err.without_url().to_string()
}

#[async_trait::async_trait]
impl LogChannel for NotifierChannel {
    fn kind(&self) -> &'static str {
        "NotifierChannel"
    }

    fn level(&self) -> LogLevel {
        self.config.level
    }

    fn bubble(&self) -> bool {
        self.config.bubble
    }

    async fn handle(&self, event: &LogEvent) -> Result<bool> {
        if !self.is_handling(event.level) {
            return Ok(false);
        }

        let text = MessageTransformer::transform(&event.message, &event.context);
        self.send(&text).await?;
        Ok(!self.config.bubble)
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

crate::impl_try_from!(NotifierChannelConfig => NotifierChannel, error: LogError);
crate::impl_box_from!(NotifierChannel => dyn LogChannel);
