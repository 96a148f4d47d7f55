use colored::{ColoredString, Colorize};
use serde::Deserialize;
use smart_default::SmartDefault;
use std::any::Any;
use std::io::Write;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader};
use tokio::sync::Mutex;

use crate::log::channel::LogChannel;
use crate::log::error::{LogError, Result};
use crate::log::level::LogLevel;
use crate::log::log_record::{Context, LogEvent};
use crate::log::transformer::MessageTransformer;

/// ConsoleChannel 配置
#[derive(Debug, Clone, Deserialize, SmartDefault)]
#[serde(default)]
pub struct ConsoleChannelConfig {
    /// 最低处理级别
    #[default(LogLevel::Debug)]
    pub level: LogLevel,

    /// 处理后是否继续传递给后续通道
    #[default = true]
    pub bubble: bool,
}

/// 终端通道
///
/// 按级别给消息加上不同的终端样式后写到标准输出
pub struct ConsoleChannel {
    config: ConsoleChannelConfig,
    writer: Mutex<Box<dyn Write + Send>>,
}

impl ConsoleChannel {
    pub fn new(config: ConsoleChannelConfig) -> Self {
        Self::with_writer(config, Box::new(std::io::stdout()))
    }

    /// 使用自定义输出
    pub fn with_writer(config: ConsoleChannelConfig, writer: Box<dyn Write + Send>) -> Self {
        Self {
            config,
            writer: Mutex::new(writer),
        }
    }

    async fn write_lines(&self, lines: &[String]) -> Result<()> {
        let mut writer = self.writer.lock().await;
        for line in lines {
            writeln!(writer, "{}", line)?;
        }
        writer.flush()?;
        Ok(())
    }

    /// 不加样式直接输出
    pub async fn line(&self, message: &str, context: impl Into<Context>) -> Result<()> {
        let text = MessageTransformer::transform(message, &context.into());
        self.write_lines(&[text]).await
    }

    /// 按级别样式输出，不经过级别过滤
    pub async fn write_styled(&self, level: LogLevel, message: &str, context: &Context) -> Result<()> {
        let lines = Self::render(level, message, context);
        self.write_lines(&lines).await
    }

    /// 输出一个错误及其 source 链
    ///
    /// `verbose` 为 true 时保留 1000 个字符，否则 300 个
    pub async fn render_error(&self, err: &(dyn std::error::Error + 'static), verbose: bool) -> Result<()> {
        let mut text = format!("Job Exception: {}", err);
        let mut source = err.source();
        while let Some(cause) = source {
            text.push_str(&format!("\n  caused by: {}", cause));
            source = cause.source();
        }

        let limit = if verbose { 1000 } else { 300 };
        let text = truncate_chars(&text, limit);
        self.write_lines(&[text.red().to_string()]).await
    }

    /// 输出提示并从标准输入读取一行
    pub async fn ask(&self, prompt: &str) -> Result<String> {
        let mut reader = BufReader::new(tokio::io::stdin());
        self.ask_from(prompt, &mut reader).await
    }

    /// 输出提示并从指定输入读取一行，去掉行尾换行
    pub async fn ask_from<R>(&self, prompt: &str, reader: &mut R) -> Result<String>
    where
        R: AsyncBufRead + Unpin + Send,
    {
        {
            let mut writer = self.writer.lock().await;
            write!(writer, "{} ", prompt.green())?;
            writer.flush()?;
        }

        let mut answer = String::new();
        let read = reader.read_line(&mut answer).await?;
        if read == 0 {
            return Err(LogError::Io(std::io::Error::new(
                std::io::ErrorKind::UnexpectedEof,
                "input stream closed",
            )));
        }

        let trimmed = answer.trim_end_matches(['\r', '\n']).len();
        answer.truncate(trimmed);
        Ok(answer)
    }

    /// 按级别渲染为若干行
    fn render(level: LogLevel, message: &str, context: &Context) -> Vec<String> {
        match level {
            LogLevel::Alert => {
                let width = message.chars().count() + 12;
                let border = "*".repeat(width);
                let mut lines = vec![
                    border.red().to_string(),
                    format!("*     {}     *", message).red().to_string(),
                    border.red().to_string(),
                ];
                if !context.is_empty() {
                    lines.push(MessageTransformer::transform("", context).red().to_string());
                }
                lines
            }
            LogLevel::Emergency => {
                let text = MessageTransformer::transform(message, context);
                vec![
                    String::new(),
                    styled(level, &format!("[emergency] {}", text)).to_string(),
                    String::new(),
                ]
            }
            _ => {
                let text = MessageTransformer::transform(message, context);
                let text = match level {
                    LogLevel::Critical => format!("[critical] {}", text),
                    LogLevel::Notice => format!("[!] {}", text),
                    _ => text,
                };
                vec![styled(level, &text).to_string()]
            }
        }
    }
}

fn styled(level: LogLevel, text: &str) -> ColoredString {
    match level {
        LogLevel::Emergency => text.white().on_red().bold().underline(),
        LogLevel::Alert | LogLevel::Error => text.red(),
        LogLevel::Critical => text.white().on_red(),
        LogLevel::Warning => text.black().on_yellow().underline(),
        LogLevel::Notice => text.yellow(),
        LogLevel::Info => text.green(),
        LogLevel::Debug => text.normal(),
    }
}

pub(crate) fn truncate_chars(text: &str, limit: usize) -> String {
    match text.char_indices().nth(limit) {
        Some((index, _)) => text[..index].to_string(),
        None => text.to_string(),
    }
}

#[async_trait::async_trait]
impl LogChannel for ConsoleChannel {
    fn kind(&self) -> &'static str {
        "ConsoleChannel"
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

        self.write_styled(event.level, &event.message, &event.context)
            .await?;
        Ok(!self.config.bubble)
    }

    async fn flush(&self) -> Result<()> {
        self.writer.lock().await.flush()?;
        Ok(())
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

crate::impl_from!(ConsoleChannelConfig => ConsoleChannel);
crate::impl_box_from!(ConsoleChannel => dyn LogChannel);
