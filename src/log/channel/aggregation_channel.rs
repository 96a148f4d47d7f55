use dashmap::DashMap;
use garde::Validate;
use serde::Deserialize;
use smart_default::SmartDefault;
use std::any::Any;
use std::path::Path;
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};

use crate::log::channel::cloud_logging_client::{
    CloudLoggingClient, CloudLoggingService, LogEntry, SinkDestination, SinkRequest,
};
use crate::log::channel::{LinkProvider, LogChannel};
use crate::log::error::{LogError, Result};
use crate::log::level::LogLevel;
use crate::log::log_record::{Context, LogEvent};
use crate::oss::GcpCredential;

/// AggregationChannel 配置
#[derive(Debug, Clone, Deserialize, SmartDefault, Validate)]
#[serde(default)]
pub struct AggregationChannelConfig {
    /// 日志名称，同时作为控制台查询条件
    #[garde(length(min = 1))]
    #[default = "stacklog"]
    pub log_name: String,

    /// GCP 项目 ID
    #[garde(length(min = 1))]
    #[default = ""]
    pub project_id: String,

    /// 凭证文件路径，构造时检查
    #[garde(length(min = 1))]
    #[default = ""]
    pub credential_path: String,

    /// 批量发送，缓冲满或显式 flush 时才写入
    #[garde(skip)]
    #[default = true]
    pub batch_enabled: bool,

    #[garde(range(min = 1))]
    #[default = 50]
    pub batch_size: usize,

    #[garde(skip)]
    #[default = "https://logging.googleapis.com"]
    pub endpoint: String,

    #[garde(skip)]
    #[default(LogLevel::Debug)]
    pub level: LogLevel,

    #[garde(skip)]
    #[default = true]
    pub bubble: bool,
}

/// 按日志名称划分的子 logger
pub struct SubLogger {
    log_name: String,
    service: Arc<dyn CloudLoggingService>,
    batch_enabled: bool,
    batch_size: usize,
    pending: Mutex<Vec<LogEntry>>,
}

impl SubLogger {
    fn new(
        project_id: &str,
        name: &str,
        service: Arc<dyn CloudLoggingService>,
        batch_enabled: bool,
        batch_size: usize,
    ) -> Self {
        Self {
            log_name: format!("projects/{}/logs/{}", project_id, name),
            service,
            batch_enabled,
            batch_size,
            pending: Mutex::new(Vec::new()),
        }
    }

    /// 完整的日志名称 `projects/{project}/logs/{name}`
    pub fn log_name(&self) -> &str {
        &self.log_name
    }

    pub async fn log(&self, level: LogLevel, message: &str, context: &Context) -> Result<()> {
        let entry = LogEntry::new(self.log_name.clone(), level, message, context);
        if !self.batch_enabled {
            return self.service.write_entries(vec![entry]).await;
        }

        let batch = {
            let mut pending = self.pending.lock().await;
            pending.push(entry);
            if pending.len() < self.batch_size {
                return Ok(());
            }
            std::mem::take(&mut *pending)
        };
        self.service.write_entries(batch).await
    }

    pub async fn pending(&self) -> usize {
        self.pending.lock().await.len()
    }

    pub async fn flush(&self) -> Result<()> {
        let batch = std::mem::take(&mut *self.pending.lock().await);
        if batch.is_empty() {
            return Ok(());
        }
        self.service.write_entries(batch).await
    }
}

/// 日志聚合通道
///
/// 把事件写到当前日志名称对应的子 logger，并负责导出 sink 的创建
pub struct AggregationChannel {
    config: AggregationChannelConfig,
    service: Arc<dyn CloudLoggingService>,
    log_name: RwLock<String>,
    loggers: DashMap<String, Arc<SubLogger>>,
}

impl AggregationChannel {
    /// 凭证文件不存在时返回配置错误
    pub fn new(config: AggregationChannelConfig) -> Result<Self> {
        if let Err(errors) = config.validate() {
            return Err(LogError::configuration(format!("{}", errors)));
        }

        let credential_path = shellexpand::tilde(&config.credential_path).to_string();
        if !Path::new(&credential_path).is_file() {
            return Err(LogError::configuration(format!(
                "credential file '{}' for project '{}' is not found",
                credential_path, config.project_id
            )));
        }
        let credential = GcpCredential::from_file(&credential_path)?;

        let client = CloudLoggingClient::new(config.endpoint.clone(), credential.access_token)?;
        Ok(Self::with_service(config, Arc::new(client)))
    }

    /// 使用指定的聚合服务
    pub fn with_service(config: AggregationChannelConfig, service: Arc<dyn CloudLoggingService>) -> Self {
        let channel = Self {
            log_name: RwLock::new(config.log_name.clone()),
            service,
            loggers: DashMap::new(),
            config,
        };
        channel.sub_logger(&channel.config.log_name);
        channel
    }

    pub fn project_id(&self) -> &str {
        &self.config.project_id
    }

    /// 修改日志名称，只影响之后的日志
    pub async fn set_log_name(&self, name: impl Into<String>) {
        *self.log_name.write().await = name.into();
    }

    pub async fn log_name(&self) -> String {
        self.log_name.read().await.clone()
    }

    /// 取得或创建子 logger
    pub fn sub_logger(&self, name: &str) -> Arc<SubLogger> {
        self.loggers
            .entry(name.to_string())
            .or_insert_with(|| {
                tracing::debug!(log_name = name, "create aggregation sub logger");
                Arc::new(SubLogger::new(
                    &self.config.project_id,
                    name,
                    self.service.clone(),
                    self.config.batch_enabled,
                    self.config.batch_size,
                ))
            })
            .clone()
    }

    /// 已创建的子 logger 名称
    pub fn sub_logger_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.loggers.iter().map(|e| e.key().clone()).collect();
        names.sort();
        names
    }

    /// 日志浏览页面链接，查询最近三小时
    pub async fn get_link(&self) -> String {
        let project = urlencoding::encode(&self.config.project_id).into_owned();
        let name = urlencoding::encode(&self.log_name().await).into_owned();
        format!(
            "https://console.cloud.google.com/logs/query;query=logName=\"projects/{p}/logs/{n}\";timeRange=PT3H;storageScope=storage,projects/{p}/locations/global/buckets/_Default/views/_Default",
            p = project,
            n = name
        )
    }

    /// 为当前日志名称创建导出 sink
    ///
    /// 每个被选中的目的地按 storage、bigquery、pubsub、logging 的顺序各建一个
    /// `{sink_name}_{bit}`。所有目的地共用同一组位置参数，参数个数必须恰好等于
    /// 选中目的地中要求最多的那个。返回创建的 sink 名称。
    pub async fn export(
        &self,
        destinations: SinkDestination,
        sink_name: &str,
        params: &[String],
    ) -> Result<Vec<String>> {
        if sink_name.trim().is_empty() {
            return Err(LogError::configuration("sink name must not be empty"));
        }

        let expected = destinations
            .iter()
            .map(|d| d.parameter_count())
            .max()
            .unwrap_or(0);
        if expected == 0 || params.len() != expected {
            return Err(LogError::configuration(format!(
                "export to {} expects {} parameters, got {}",
                destinations,
                expected,
                params.len()
            )));
        }

        // 先生成全部请求，参数有误时不创建任何 sink
        let log_name = self.log_name().await;
        let filter = format!(
            "logName=\"projects/{}/logs/{}\" AND resource.type=\"global\"",
            self.config.project_id, log_name
        );
        let requests = destinations
            .iter()
            .map(|d| {
                Ok(SinkRequest {
                    name: format!("{}_{}", sink_name, d.bits()),
                    destination: d.uri(params)?,
                    filter: filter.clone(),
                })
            })
            .collect::<Result<Vec<_>>>()?;

        let mut created = Vec::with_capacity(requests.len());
        for request in requests {
            self.service
                .create_sink(&self.config.project_id, &request)
                .await?;
            tracing::debug!(sink = %request.name, destination = %request.destination, "created export sink");
            created.push(request.name);
        }
        Ok(created)
    }
}

#[async_trait::async_trait]
impl LinkProvider for AggregationChannel {
    async fn link(&self) -> Option<String> {
        Some(self.get_link().await)
    }
}

#[async_trait::async_trait]
impl LogChannel for AggregationChannel {
    fn kind(&self) -> &'static str {
        "AggregationChannel"
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

        let name = self.log_name().await;
        self.sub_logger(&name)
            .log(event.level, &event.message, &event.context)
            .await?;
        Ok(!self.config.bubble)
    }

    async fn flush(&self) -> Result<()> {
        let loggers: Vec<Arc<SubLogger>> = self.loggers.iter().map(|e| e.value().clone()).collect();
        let mut errors = Vec::new();
        for logger in loggers {
            if let Err(err) = logger.flush().await {
                errors.push(err);
            }
        }
        match LogError::collapse(errors) {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_link_provider(&self) -> Option<&dyn LinkProvider> {
        Some(self)
    }
}

crate::impl_try_from!(AggregationChannelConfig => AggregationChannel, error: LogError);
crate::impl_box_from!(AggregationChannel => dyn LogChannel);
