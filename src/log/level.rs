use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// 日志级别
///
/// 采用 syslog 的八个等级，按严重程度递增排序：
/// `Debug < Info < Notice < Warning < Error < Critical < Alert < Emergency`
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    /// 调试信息
    Debug = 0,
    /// 一般信息
    Info = 1,
    /// 值得注意的正常事件
    Notice = 2,
    /// 警告
    #[serde(alias = "warn")]
    Warning = 3,
    /// 运行时错误
    Error = 4,
    /// 严重错误
    Critical = 5,
    /// 必须立即处理
    Alert = 6,
    /// 系统不可用
    Emergency = 7,
}

impl LogLevel {
    /// 全部级别，由高到低
    pub const ALL: [LogLevel; 8] = [
        LogLevel::Emergency,
        LogLevel::Alert,
        LogLevel::Critical,
        LogLevel::Error,
        LogLevel::Warning,
        LogLevel::Notice,
        LogLevel::Info,
        LogLevel::Debug,
    ];

    /// 小写名称，即对应的日志方法名
    pub fn as_str(&self) -> &'static str {
        match self {
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Notice => "notice",
            LogLevel::Warning => "warning",
            LogLevel::Error => "error",
            LogLevel::Critical => "critical",
            LogLevel::Alert => "alert",
            LogLevel::Emergency => "emergency",
        }
    }
}

impl FromStr for LogLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "debug" => Ok(LogLevel::Debug),
            "info" => Ok(LogLevel::Info),
            "notice" => Ok(LogLevel::Notice),
            "warning" | "warn" => Ok(LogLevel::Warning),
            "error" => Ok(LogLevel::Error),
            "critical" => Ok(LogLevel::Critical),
            "alert" => Ok(LogLevel::Alert),
            "emergency" => Ok(LogLevel::Emergency),
            _ => Err(format!("invalid log level: {}", s)),
        }
    }
}

impl std::fmt::Display for LogLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str().to_uppercase())
    }
}

/// 可通过名称调用的日志方法
///
/// 八个级别方法加上终端兼容别名：`line`、`comment` 等同 `debug`，`warn` 等同 `warning`。
/// 未知名称在解析阶段即被拒绝。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogMethod {
    Level(LogLevel),
    Line,
    Comment,
    Warn,
}

impl LogMethod {
    /// 方法最终落到的级别
    pub fn level(&self) -> LogLevel {
        match self {
            LogMethod::Level(level) => *level,
            LogMethod::Line | LogMethod::Comment => LogLevel::Debug,
            LogMethod::Warn => LogLevel::Warning,
        }
    }
}

impl FromStr for LogMethod {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "line" => Ok(LogMethod::Line),
            "comment" => Ok(LogMethod::Comment),
            "warn" => Ok(LogMethod::Warn),
            other => other
                .parse::<LogLevel>()
                .map(LogMethod::Level)
                .map_err(|_| format!("unknown log method: {}", s)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_level_from_str() {
        assert_eq!(LogLevel::from_str("emergency").unwrap(), LogLevel::Emergency);
        assert_eq!(LogLevel::from_str("ALERT").unwrap(), LogLevel::Alert);
        assert_eq!(LogLevel::from_str("Critical").unwrap(), LogLevel::Critical);
        assert_eq!(LogLevel::from_str("warn").unwrap(), LogLevel::Warning);
        assert_eq!(LogLevel::from_str("notice").unwrap(), LogLevel::Notice);
        assert!(LogLevel::from_str("trace").is_err());
    }

    #[test]
    fn test_log_level_display() {
        assert_eq!(LogLevel::Warning.to_string(), "WARNING");
        assert_eq!(LogLevel::Emergency.to_string(), "EMERGENCY");
        assert_eq!(LogLevel::Debug.as_str(), "debug");
    }

    #[test]
    fn test_log_level_ordering() {
        for pair in LogLevel::ALL.windows(2) {
            assert!(pair[0] > pair[1], "{:?} should be above {:?}", pair[0], pair[1]);
        }
    }

    #[test]
    fn test_log_level_deserialize_alias() {
        let level: LogLevel = serde_json::from_str("\"warn\"").unwrap();
        assert_eq!(level, LogLevel::Warning);
        let level: LogLevel = serde_json::from_str("\"critical\"").unwrap();
        assert_eq!(level, LogLevel::Critical);
    }

    #[test]
    fn test_log_method_aliases() {
        assert_eq!("line".parse::<LogMethod>().unwrap().level(), LogLevel::Debug);
        assert_eq!("comment".parse::<LogMethod>().unwrap().level(), LogLevel::Debug);
        assert_eq!("warn".parse::<LogMethod>().unwrap(), LogMethod::Warn);
        assert_eq!("warn".parse::<LogMethod>().unwrap().level(), LogLevel::Warning);
        assert_eq!(
            "alert".parse::<LogMethod>().unwrap(),
            LogMethod::Level(LogLevel::Alert)
        );
    }

    #[test]
    fn test_log_method_rejects_unknown_names() {
        let err = "shout".parse::<LogMethod>().unwrap_err();
        assert!(err.contains("unknown log method"));
    }
}
