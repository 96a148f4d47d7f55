// API 文档参考：
// GCS JSON API 上传: https://cloud.google.com/storage/docs/uploading-objects
// 可续传上传: https://cloud.google.com/storage/docs/performing-resumable-uploads

use async_trait::async_trait;
use bytes::Bytes;
use garde::Validate;
use serde::{Deserialize, Serialize};
use smart_default::SmartDefault;
use std::path::Path;
use std::time::Duration;
use tokio_util::io::ReaderStream;

use crate::oss::{GcpCredential, ObjectStore, ObjectStoreError, PutOptions};

const PROVIDER: &str = "GCP GCS";

/// GCP GCS 配置
#[derive(Debug, Deserialize, Serialize, SmartDefault, Clone, Validate)]
#[serde(default)]
pub struct GcpGcsObjectStoreConfig {
    /// 存储桶名称
    #[garde(length(min = 1))]
    #[default = ""]
    pub bucket: String,

    /// GCP 项目 ID（可选，通常从凭证文件中获取）
    #[garde(skip)]
    pub project_id: Option<String>,

    /// 凭证文件路径
    #[garde(skip)]
    pub credential_path: Option<String>,

    /// 自定义端点（用于 fake-gcs-server 或测试）
    #[garde(skip)]
    #[default = "https://storage.googleapis.com"]
    pub endpoint: String,

    /// 请求超时（秒）
    #[garde(range(min = 1))]
    #[default = 60]
    pub timeout_secs: u64,
}

/// GCP GCS 实现，基于 JSON API
pub struct GcpGcsObjectStore {
    client: reqwest::Client,
    config: GcpGcsObjectStoreConfig,
    access_token: Option<String>,
}

impl GcpGcsObjectStore {
    /// 唯一的构造方法
    pub fn new(config: GcpGcsObjectStoreConfig) -> Result<Self, ObjectStoreError> {
        if let Err(errors) = config.validate() {
            return Err(ObjectStoreError::Configuration(format!("{}", errors)));
        }

        let credential = GcpCredential::from_optional_file(config.credential_path.as_deref())?;

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| ObjectStoreError::Configuration(format!("创建 HTTP 客户端失败: {}", e)))?;

        Ok(Self {
            client,
            config,
            access_token: credential.access_token,
        })
    }

    pub fn bucket(&self) -> &str {
        &self.config.bucket
    }

    fn upload_url(&self) -> String {
        format!(
            "{}/upload/storage/v1/b/{}/o",
            self.config.endpoint.trim_end_matches('/'),
            urlencoding::encode(&self.config.bucket)
        )
    }

    fn authorize(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.access_token {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }

    async fn check(
        response: reqwest::Response,
        key: &str,
    ) -> Result<reqwest::Response, ObjectStoreError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        Err(ObjectStoreError::from_status(status.as_u16(), key, PROVIDER, body))
    }

    /// 单次上传
    async fn put_media(
        &self,
        key: &str,
        body: reqwest::Body,
        length: u64,
        content_type: &str,
    ) -> Result<(), ObjectStoreError> {
        let request = self
            .client
            .post(self.upload_url())
            .query(&[("uploadType", "media"), ("name", key)])
            .header(reqwest::header::CONTENT_TYPE, content_type)
            .header(reqwest::header::CONTENT_LENGTH, length)
            .body(body);

        let response = self.authorize(request).send().await?;
        Self::check(response, key).await?;
        Ok(())
    }

    /// 可续传上传：先创建会话拿到 Location，再上传内容
    async fn put_resumable(
        &self,
        key: &str,
        body: reqwest::Body,
        length: u64,
        content_type: &str,
    ) -> Result<(), ObjectStoreError> {
        let request = self
            .client
            .post(self.upload_url())
            .query(&[("uploadType", "resumable"), ("name", key)])
            .header("X-Upload-Content-Type", content_type)
            .json(&serde_json::json!({ "name": key }));

        let response = self.authorize(request).send().await?;
        let response = Self::check(response, key).await?;

        let session_url = response
            .headers()
            .get(reqwest::header::LOCATION)
            .and_then(|v| v.to_str().ok())
            .map(|v| v.to_string())
            .ok_or_else(|| ObjectStoreError::Provider {
                provider: PROVIDER.to_string(),
                message: "可续传会话缺少 Location 头".to_string(),
            })?;

        let request = self
            .client
            .put(session_url)
            .header(reqwest::header::CONTENT_TYPE, content_type)
            .header(reqwest::header::CONTENT_LENGTH, length)
            .body(body);

        let response = self.authorize(request).send().await?;
        Self::check(response, key).await?;
        Ok(())
    }

    async fn upload(
        &self,
        key: &str,
        body: reqwest::Body,
        length: u64,
        options: &PutOptions,
    ) -> Result<(), ObjectStoreError> {
        let content_type = options
            .content_type
            .as_deref()
            .unwrap_or("application/octet-stream");

        tracing::debug!(bucket = %self.config.bucket, key, length, resumable = options.resumable, "gcs put object");

        if options.resumable {
            self.put_resumable(key, body, length, content_type).await
        } else {
            self.put_media(key, body, length, content_type).await
        }
    }
}

#[async_trait]
impl ObjectStore for GcpGcsObjectStore {
    async fn put_object(
        &self,
        key: &str,
        value: Bytes,
        options: PutOptions,
    ) -> Result<(), ObjectStoreError> {
        let length = value.len() as u64;
        self.upload(key, reqwest::Body::from(value), length, &options)
            .await
    }

    /// 文件内容按块读取并流式上传，不整份读入内存
    async fn put_file(
        &self,
        key: &str,
        local_path: &Path,
        options: PutOptions,
    ) -> Result<(), ObjectStoreError> {
        let file = tokio::fs::File::open(local_path).await?;
        let length = file.metadata().await?.len();
        let body = reqwest::Body::wrap_stream(ReaderStream::new(file));
        self.upload(key, body, length, &options).await
    }
}
