use thiserror::Error;

use crate::oss::ObjectStoreError;

/// 日志模块统一错误类型
#[derive(Error, Debug)]
pub enum LogError {
    /// 配置错误：缺少凭证文件、未配置任何 channel、导出参数不合法等
    #[error("configuration error: {0}")]
    Configuration(String),

    /// 单个 channel 的投递失败
    #[error("delivery to '{channel}' failed: {message}")]
    Delivery { channel: String, message: String },

    /// 计时器超时
    #[error("{description} spent {duration:.2} sec, timed out")]
    Timeout { description: String, duration: f64 },

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// 守卫条件触发
    #[error("{0}")]
    Guard(String),

    /// 一次分发中多个 channel 失败
    #[error("{} channels failed: {}", .0.len(), join_errors(.0))]
    Multiple(Vec<LogError>),
}

fn join_errors(errors: &[LogError]) -> String {
    errors
        .iter()
        .map(|e| e.to_string())
        .collect::<Vec<_>>()
        .join("; ")
}

impl LogError {
    pub fn configuration(message: impl Into<String>) -> Self {
        LogError::Configuration(message.into())
    }

    pub fn delivery(channel: impl Into<String>, message: impl Into<String>) -> Self {
        LogError::Delivery {
            channel: channel.into(),
            message: message.into(),
        }
    }

    /// 把多个错误折叠为一个：单个原样返回，多个包装为 Multiple
    pub fn collapse(mut errors: Vec<LogError>) -> Option<LogError> {
        match errors.len() {
            0 => None,
            1 => errors.pop(),
            _ => Some(LogError::Multiple(errors)),
        }
    }
}

impl From<ObjectStoreError> for LogError {
    fn from(err: ObjectStoreError) -> Self {
        match err {
            ObjectStoreError::Configuration(message) => LogError::Configuration(message),
            other => LogError::delivery("storage", other.to_string()),
        }
    }
}

pub type Result<T> = std::result::Result<T, LogError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_collapse() {
        assert!(LogError::collapse(vec![]).is_none());

        let single = LogError::collapse(vec![LogError::delivery("file", "disk full")]).unwrap();
        assert!(matches!(single, LogError::Delivery { .. }));

        let multiple = LogError::collapse(vec![
            LogError::delivery("file", "disk full"),
            LogError::delivery("notifier", "timeout"),
        ])
        .unwrap();
        let text = multiple.to_string();
        assert!(text.starts_with("2 channels failed"));
        assert!(text.contains("disk full"));
        assert!(text.contains("timeout"));
    }

    #[test]
    fn test_timeout_display() {
        let err = LogError::Timeout {
            description: "settle".to_string(),
            duration: 3.14159,
        };
        assert_eq!(err.to_string(), "settle spent 3.14 sec, timed out");
    }

    #[test]
    fn test_from_object_store_error() {
        let err: LogError = ObjectStoreError::Configuration("no bucket".to_string()).into();
        assert!(matches!(err, LogError::Configuration(_)));

        let err: LogError = ObjectStoreError::Network("reset".to_string()).into();
        assert!(matches!(err, LogError::Delivery { ref channel, .. } if channel == "storage"));
    }
}
