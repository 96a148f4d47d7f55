// API 文档参考：
// entries.write: https://cloud.google.com/logging/docs/reference/v2/rest/v2/entries/write
// projects.sinks.create: https://cloud.google.com/logging/docs/reference/v2/rest/v2/projects.sinks/create

use chrono::{DateTime, Local};
use serde::Serialize;
use std::fmt;
use std::ops::BitOr;
use std::str::FromStr;
use std::time::Duration;

use crate::log::error::{LogError, Result};
use crate::log::level::LogLevel;
use crate::log::log_record::Context;

const CHANNEL: &str = "aggregation";

/// 一条远端日志
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LogEntry {
    pub log_name: String,
    pub resource: MonitoredResource,
    pub severity: String,
    pub timestamp: DateTime<Local>,
    pub json_payload: EntryPayload,
}

#[derive(Debug, Clone, Serialize)]
pub struct MonitoredResource {
    #[serde(rename = "type")]
    pub resource_type: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct EntryPayload {
    pub message: String,
    pub context: Context,
}

impl LogEntry {
    pub fn new(log_name: impl Into<String>, level: LogLevel, message: &str, context: &Context) -> Self {
        Self {
            log_name: log_name.into(),
            resource: MonitoredResource {
                resource_type: "global".to_string(),
            },
            severity: level.as_str().to_uppercase(),
            timestamp: Local::now(),
            json_payload: EntryPayload {
                message: message.to_string(),
                context: context.clone(),
            },
        }
    }
}

/// 导出 sink 的请求
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SinkRequest {
    pub name: String,
    pub destination: String,
    pub filter: String,
}

/// 导出目的地，可按位组合
///
/// 检查顺序固定为 storage、bigquery、pubsub、logging
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SinkDestination(u8);

impl SinkDestination {
    /// Cloud Storage 存储桶
    pub const STORAGE: SinkDestination = SinkDestination(0b1);
    /// BigQuery 数据集
    pub const BIGQUERY: SinkDestination = SinkDestination(0b10);
    /// Pub/Sub 主题
    pub const PUBSUB: SinkDestination = SinkDestination(0b100);
    /// Cloud Logging 存储桶
    pub const LOGGING: SinkDestination = SinkDestination(0b1000);

    pub const ALL: [SinkDestination; 4] = [
        SinkDestination::STORAGE,
        SinkDestination::BIGQUERY,
        SinkDestination::PUBSUB,
        SinkDestination::LOGGING,
    ];

    /// 从位掩码构建，0 或包含未知位时报错
    pub fn from_bits(bits: u8) -> Result<Self> {
        if bits == 0 || bits & !0b1111 != 0 {
            return Err(LogError::configuration(format!(
                "invalid sink destination mask: {:#b}",
                bits
            )));
        }
        Ok(SinkDestination(bits))
    }

    pub fn bits(&self) -> u8 {
        self.0
    }

    pub fn contains(&self, other: SinkDestination) -> bool {
        self.0 & other.0 == other.0
    }

    /// 按固定顺序列出包含的单个目的地
    pub fn iter(&self) -> impl Iterator<Item = SinkDestination> + '_ {
        Self::ALL.into_iter().filter(move |d| self.contains(*d))
    }

    /// 该目的地需要的位置参数个数
    pub fn parameter_count(&self) -> usize {
        match *self {
            SinkDestination::STORAGE => 1,
            SinkDestination::BIGQUERY | SinkDestination::PUBSUB => 2,
            SinkDestination::LOGGING => 3,
            _ => 0,
        }
    }

    /// 生成目的地 URI，单个目的地才有意义
    pub fn uri(&self, params: &[String]) -> Result<String> {
        if params.len() < self.parameter_count() || params.iter().any(|p| p.trim().is_empty()) {
            return Err(LogError::configuration(format!(
                "sink destination {} expects {} non-empty parameters, got {:?}",
                self,
                self.parameter_count(),
                params
            )));
        }

        let uri = match *self {
            SinkDestination::STORAGE => format!("storage.googleapis.com/{}", params[0]),
            SinkDestination::BIGQUERY => format!(
                "bigquery.googleapis.com/projects/{}/datasets/{}",
                params[0], params[1]
            ),
            SinkDestination::PUBSUB => format!(
                "pubsub.googleapis.com/projects/{}/topics/{}",
                params[0], params[1]
            ),
            SinkDestination::LOGGING => format!(
                "logging.googleapis.com/projects/{}/locations/{}/buckets/{}",
                params[0], params[1], params[2]
            ),
            _ => {
                return Err(LogError::configuration(format!(
                    "sink destination {} is not a single destination",
                    self
                )))
            }
        };
        Ok(uri)
    }
}

impl BitOr for SinkDestination {
    type Output = SinkDestination;

    fn bitor(self, rhs: Self) -> Self::Output {
        SinkDestination(self.0 | rhs.0)
    }
}

impl fmt::Display for SinkDestination {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names: Vec<&str> = self
            .iter()
            .map(|d| match d {
                SinkDestination::STORAGE => "storage",
                SinkDestination::BIGQUERY => "bigquery",
                SinkDestination::PUBSUB => "pubsub",
                _ => "logging",
            })
            .collect();
        if names.is_empty() {
            write!(f, "{:#b}", self.0)
        } else {
            write!(f, "{}", names.join("|"))
        }
    }
}

impl FromStr for SinkDestination {
    type Err = LogError;

    /// 解析 `storage|bigquery` 形式的名称组合
    fn from_str(s: &str) -> Result<Self> {
        let mut bits = 0u8;
        for name in s.split(['|', ',']).map(str::trim).filter(|n| !n.is_empty()) {
            bits |= match name.to_lowercase().as_str() {
                "storage" => SinkDestination::STORAGE.0,
                "bigquery" => SinkDestination::BIGQUERY.0,
                "pubsub" => SinkDestination::PUBSUB.0,
                "logging" => SinkDestination::LOGGING.0,
                other => {
                    return Err(LogError::configuration(format!(
                        "unknown sink destination: {}",
                        other
                    )))
                }
            };
        }
        SinkDestination::from_bits(bits)
    }
}

/// 日志聚合服务
#[async_trait::async_trait]
pub trait CloudLoggingService: Send + Sync {
    /// 写入一批日志
    async fn write_entries(&self, entries: Vec<LogEntry>) -> Result<()>;

    /// 创建导出 sink
    async fn create_sink(&self, project_id: &str, sink: &SinkRequest) -> Result<()>;
}

/// Cloud Logging v2 REST 客户端
pub struct CloudLoggingClient {
    client: reqwest::Client,
    endpoint: String,
    access_token: Option<String>,
}

impl CloudLoggingClient {
    pub fn new(endpoint: impl Into<String>, access_token: Option<String>) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| LogError::configuration(format!("failed to build http client: {}", e)))?;

        Ok(Self {
            client,
            endpoint: endpoint.into().trim_end_matches('/').to_string(),
            access_token,
        })
    }

    async fn post<T: Serialize + ?Sized>(&self, url: String, body: &T) -> Result<()> {
        let mut request = self.client.post(url).json(body);
        if let Some(token) = &self.access_token {
            request = request.bearer_auth(token);
        }

        let response = request
            .send()
            .await
            .map_err(|e| LogError::delivery(CHANNEL, e.to_string()))?;

        let status = response.status();
        if status.is_success() {
            return Ok(());
        }
        let body = response.text().await.unwrap_or_default();
        Err(LogError::delivery(
            CHANNEL,
            format!("HTTP {}: {}", status.as_u16(), body),
        ))
    }
}

#[async_trait::async_trait]
impl CloudLoggingService for CloudLoggingClient {
    async fn write_entries(&self, entries: Vec<LogEntry>) -> Result<()> {
        if entries.is_empty() {
            return Ok(());
        }
        let url = format!("{}/v2/entries:write", self.endpoint);
        self.post(url, &serde_json::json!({ "entries": entries })).await
    }

    async fn create_sink(&self, project_id: &str, sink: &SinkRequest) -> Result<()> {
        let url = format!(
            "{}/v2/projects/{}/sinks",
            self.endpoint,
            urlencoding::encode(project_id)
        );
        self.post(url, sink).await
    }
}
