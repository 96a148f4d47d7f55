use chrono::{DateTime, Local};
use serde::{Serialize, Serializer};
use serde_json::Value;
use std::fmt;

use crate::log::level::LogLevel;

/// 上下文值，支持多种类型
#[derive(Debug, Clone, PartialEq)]
pub enum MetadataValue {
    String(String),
    I64(i64),
    U64(u64),
    F64(f64),
    Bool(bool),
    Null,
    /// 任意 JSON 兼容的数据
    Json(Value),
}

impl Serialize for MetadataValue {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match self {
            MetadataValue::String(s) => serializer.serialize_str(s),
            MetadataValue::I64(n) => serializer.serialize_i64(*n),
            MetadataValue::U64(n) => serializer.serialize_u64(*n),
            MetadataValue::F64(n) => serializer.serialize_f64(*n),
            MetadataValue::Bool(b) => serializer.serialize_bool(*b),
            MetadataValue::Null => serializer.serialize_none(),
            MetadataValue::Json(v) => v.serialize(serializer),
        }
    }
}

impl fmt::Display for MetadataValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MetadataValue::String(s) => write!(f, "{}", s),
            MetadataValue::I64(n) => write!(f, "{}", n),
            MetadataValue::U64(n) => write!(f, "{}", n),
            MetadataValue::F64(n) => write!(f, "{}", n),
            MetadataValue::Bool(b) => write!(f, "{}", b),
            MetadataValue::Null => write!(f, "null"),
            MetadataValue::Json(v) => write!(f, "{}", v),
        }
    }
}

impl MetadataValue {
    /// 从任意实现了 Serialize 的结构体创建，序列化失败时退化为 Null
    pub fn from_struct<T: Serialize>(value: T) -> Self {
        serde_json::to_value(value)
            .map(MetadataValue::Json)
            .unwrap_or(MetadataValue::Null)
    }
}

impl From<String> for MetadataValue {
    fn from(s: String) -> Self {
        MetadataValue::String(s)
    }
}

impl From<&str> for MetadataValue {
    fn from(s: &str) -> Self {
        MetadataValue::String(s.to_string())
    }
}

impl From<i64> for MetadataValue {
    fn from(n: i64) -> Self {
        MetadataValue::I64(n)
    }
}

impl From<i32> for MetadataValue {
    fn from(n: i32) -> Self {
        MetadataValue::I64(n as i64)
    }
}

impl From<u64> for MetadataValue {
    fn from(n: u64) -> Self {
        MetadataValue::U64(n)
    }
}

impl From<u32> for MetadataValue {
    fn from(n: u32) -> Self {
        MetadataValue::U64(n as u64)
    }
}

impl From<usize> for MetadataValue {
    fn from(n: usize) -> Self {
        MetadataValue::U64(n as u64)
    }
}

impl From<f64> for MetadataValue {
    fn from(n: f64) -> Self {
        MetadataValue::F64(n)
    }
}

impl From<bool> for MetadataValue {
    fn from(b: bool) -> Self {
        MetadataValue::Bool(b)
    }
}

impl From<Value> for MetadataValue {
    fn from(v: Value) -> Self {
        MetadataValue::Json(v)
    }
}

/// 日志上下文：保持插入顺序的 key → value 映射
///
/// 同名 key 再次写入时原位覆盖旧值
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Context(Vec<(String, MetadataValue)>);

impl Context {
    pub fn new() -> Self {
        Self::default()
    }

    /// 写入一个键值对（builder 风格）
    pub fn with(mut self, key: impl Into<String>, value: impl Into<MetadataValue>) -> Self {
        self.push(key, value);
        self
    }

    pub fn push(&mut self, key: impl Into<String>, value: impl Into<MetadataValue>) {
        let key = key.into();
        let value = value.into();
        match self.0.iter_mut().find(|(k, _)| *k == key) {
            Some((_, slot)) => *slot = value,
            None => self.0.push((key, value)),
        }
    }

    pub fn get(&self, key: &str) -> Option<&MetadataValue> {
        self.0.iter().find(|(k, _)| k == key).map(|(_, v)| v)
    }

    pub fn iter(&self) -> impl Iterator<Item = &(String, MetadataValue)> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl Serialize for Context {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        use serde::ser::SerializeMap;

        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for (key, value) in &self.0 {
            map.serialize_entry(key, value)?;
        }
        map.end()
    }
}

impl From<()> for Context {
    fn from(_: ()) -> Self {
        Context::new()
    }
}

impl<K, V> From<Vec<(K, V)>> for Context
where
    K: Into<String>,
    V: Into<MetadataValue>,
{
    fn from(pairs: Vec<(K, V)>) -> Self {
        let mut context = Context::new();
        for (key, value) in pairs {
            context.push(key, value);
        }
        context
    }
}

impl<K, V, const N: usize> From<[(K, V); N]> for Context
where
    K: Into<String>,
    V: Into<MetadataValue>,
{
    fn from(pairs: [(K, V); N]) -> Self {
        let mut context = Context::new();
        for (key, value) in pairs {
            context.push(key, value);
        }
        context
    }
}

/// 构建 `Context` 的便捷宏
///
/// ```ignore
/// router.error("disk full", context! { "code" => 42, "mount" => "/data" }).await?;
/// ```
#[macro_export]
macro_rules! context {
    () => {
        $crate::log::Context::new()
    };
    ($($key:expr => $value:expr),+ $(,)?) => {
        $crate::log::Context::new()$(.with($key, $value))+
    };
}

/// 一次日志调用对应的事件
///
/// 每次调用创建一次，之后只读地交给所有 channel
#[derive(Debug, Clone, Serialize)]
pub struct LogEvent {
    /// 发出事件的 router 名称
    pub channel: String,
    pub level: LogLevel,
    pub message: String,
    pub context: Context,
    pub timestamp: DateTime<Local>,
}

impl LogEvent {
    pub fn new(level: LogLevel, message: impl Into<String>, context: impl Into<Context>) -> Self {
        Self {
            channel: "stacklog".to_string(),
            level,
            message: message.into(),
            context: context.into(),
            timestamp: Local::now(),
        }
    }

    pub fn with_channel(mut self, channel: impl Into<String>) -> Self {
        self.channel = channel.into();
        self
    }
}
