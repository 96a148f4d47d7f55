use crate::log::log_record::{Context, LogEvent};

/// 消息转换器
///
/// 把日志消息与结构化上下文合并成一段可直接输出的文本
pub struct MessageTransformer;

impl MessageTransformer {
    /// 合并消息与上下文
    ///
    /// 上下文为空时原样返回消息，否则在消息后换行附上缩进的 JSON
    pub fn transform(message: &str, context: &Context) -> String {
        if context.is_empty() {
            return message.to_string();
        }

        let rendered = serde_json::to_string_pretty(context).unwrap_or_default();
        let mut text = String::with_capacity(message.len() + rendered.len() + 1);
        text.push_str(message);
        text.push('\n');
        text.push_str(&rendered);
        text
    }

    /// 格式化为单行文本（用于文件）
    ///
    /// 格式: `[2025-01-19T12:34:56.789+08:00] channel.LEVEL: message {"key":"value"}`
    pub fn format_line(event: &LogEvent, channel: &str) -> String {
        let timestamp = event
            .timestamp
            .format("%Y-%m-%dT%H:%M:%S%.3f%:z")
            .to_string();

        let mut line = format!("[{}] {}.{}: {}", timestamp, channel, event.level, event.message);
        if !event.context.is_empty() {
            line.push(' ');
            line.push_str(&serde_json::to_string(&event.context).unwrap_or_default());
        }
        line
    }
}
