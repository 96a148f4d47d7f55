use serde::Deserialize;
use smart_default::SmartDefault;
use std::any::Any;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::{OnceCell, RwLock};

use crate::log::channel::{LinkProvider, LogChannel};
use crate::log::error::{LogError, Result};
use crate::log::level::LogLevel;
use crate::log::log_record::LogEvent;
use crate::oss::{GcpGcsObjectStore, GcpGcsObjectStoreConfig, ObjectStore, PutOptions};

const CONTENT_TYPE: &str = "text/plain;charset=utf-8";

/// StorageChannel 配置
#[derive(Debug, Clone, Deserialize, SmartDefault)]
#[serde(default)]
pub struct StorageChannelConfig {
    /// GCP 项目 ID
    pub project_id: Option<String>,

    /// 凭证文件路径，首次投递时检查
    #[default = ""]
    pub credential_path: String,

    /// 存储桶名称
    #[default = ""]
    pub bucket: String,

    /// 此通道在存储桶下的根目录
    #[default = ""]
    pub bucket_folder: String,

    /// 上传失败时不返回错误
    pub ignore_exceptions: bool,

    /// 存储服务端点
    #[default = "https://storage.googleapis.com"]
    pub endpoint: String,

    /// 公开链接使用的域名，`http://storage.<domain>/...`
    #[default = "googleapis.com"]
    pub public_domain: String,

    #[default(LogLevel::Debug)]
    pub level: LogLevel,

    #[default = true]
    pub bubble: bool,
}

#[derive(Debug, Default)]
struct StorageState {
    bucket_folder: String,
    bucket_path: Option<String>,
    upload_file_path: Option<PathBuf>,
}

/// 对象存储通道
///
/// 每次处理日志时把本地文件整份上传到 `bucket_folder/bucket_path`。
/// 存储客户端在第一次投递时才创建，凭证文件缺失的错误在那时返回。
pub struct StorageChannel {
    config: StorageChannelConfig,
    state: RwLock<StorageState>,
    store: OnceCell<Arc<dyn ObjectStore>>,
}

impl StorageChannel {
    pub fn new(config: StorageChannelConfig) -> Self {
        let state = StorageState {
            bucket_folder: config.bucket_folder.clone(),
            ..Default::default()
        };
        Self {
            config,
            state: RwLock::new(state),
            store: OnceCell::new(),
        }
    }

    /// 使用指定的对象存储实现
    pub fn with_store(config: StorageChannelConfig, store: Arc<dyn ObjectStore>) -> Self {
        let channel = Self::new(config);
        // 新建的 OnceCell 一定可以写入
        let _ = channel.store.set(store);
        channel
    }

    pub fn bucket(&self) -> &str {
        &self.config.bucket
    }

    pub async fn set_bucket_folder(&self, folder: impl Into<String>) {
        self.state.write().await.bucket_folder = folder.into();
    }

    pub async fn bucket_folder(&self) -> String {
        self.state.read().await.bucket_folder.clone()
    }

    pub async fn set_bucket_path(&self, path: impl Into<String>) {
        self.state.write().await.bucket_path = Some(path.into());
    }

    /// 设置要上传的本地文件
    pub async fn set_upload_file_path(&self, path: impl AsRef<Path>) {
        self.state.write().await.upload_file_path = Some(path.as_ref().to_path_buf());
    }

    pub async fn get_upload_file_path(&self) -> Option<PathBuf> {
        self.state.read().await.upload_file_path.clone()
    }

    /// 对象路径：根目录以 `/` 结尾后接子路径，未设置子路径时为 None
    pub async fn get_object_path(&self) -> Option<String> {
        let state = self.state.read().await;
        object_path(&state.bucket_folder, state.bucket_path.as_deref())
    }

    /// 对象的公开网址
    pub async fn get_link(&self) -> Option<String> {
        let path = self.get_object_path().await?;
        let path = path.trim_start_matches('/');
        if path.is_empty() {
            return None;
        }
        Some(format!(
            "http://storage.{}/{}/{}",
            self.config.public_domain, self.config.bucket, path
        ))
    }

    /// 上传本地文件
    ///
    /// 没有设置本地文件时返回 `Ok(false)`
    pub async fn upload(&self) -> Result<bool> {
        let (source, object_path) = {
            let state = self.state.read().await;
            let source = match &state.upload_file_path {
                Some(source) => source.clone(),
                None => return Ok(false),
            };
            (source, object_path(&state.bucket_folder, state.bucket_path.as_deref()))
        };

        let object_path = object_path.ok_or_else(|| {
            LogError::configuration("storage channel has an upload file but no bucket path")
        })?;

        let store = self.store().await?;
        let options = PutOptions::default()
            .with_content_type(CONTENT_TYPE)
            .with_resumable(true);
        store.put_file(&object_path, &source, options).await?;

        tracing::debug!(bucket = %self.config.bucket, object = %object_path, "uploaded log file");
        Ok(true)
    }

    async fn store(&self) -> Result<&Arc<dyn ObjectStore>> {
        self.store
            .get_or_try_init(|| async move {
                let credential_path = shellexpand::tilde(&self.config.credential_path).to_string();
                if !Path::new(&credential_path).is_file() {
                    return Err(LogError::configuration(format!(
                        "credential file '{}' for storage channel is not found",
                        credential_path
                    )));
                }

                let store = GcpGcsObjectStore::new(GcpGcsObjectStoreConfig {
                    bucket: self.config.bucket.clone(),
                    project_id: self.config.project_id.clone(),
                    credential_path: Some(credential_path),
                    endpoint: self.config.endpoint.clone(),
                    ..Default::default()
                })?;
                Ok(Arc::new(store) as Arc<dyn ObjectStore>)
            })
            .await
    }
}

fn object_path(folder: &str, path: Option<&str>) -> Option<String> {
    let path = path.filter(|p| !p.is_empty())?;
    let mut object = folder.trim_end_matches('/').to_string();
    object.push('/');
    object.push_str(path.trim_start_matches('/'));
    Some(object)
}

#[async_trait::async_trait]
impl LinkProvider for StorageChannel {
    async fn link(&self) -> Option<String> {
        self.get_link().await
    }
}

#[async_trait::async_trait]
impl LogChannel for StorageChannel {
    fn kind(&self) -> &'static str {
        "StorageChannel"
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

        // 客户端创建失败不受 ignore_exceptions 影响
        self.store().await?;

        if let Err(err) = self.upload().await {
            if !self.config.ignore_exceptions {
                return Err(err);
            }
            tracing::warn!(error = %err, "storage upload failed, ignored");
        }
        Ok(!self.config.bubble)
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_link_provider(&self) -> Option<&dyn LinkProvider> {
        Some(self)
    }
}

crate::impl_from!(StorageChannelConfig => StorageChannel);
crate::impl_box_from!(StorageChannel => dyn LogChannel);

#[cfg(test)]
mod tests {
    use super::*;
    use crate::oss::ObjectStoreError;
    use bytes::Bytes;
    use tokio::sync::Mutex;

    #[derive(Default)]
    struct RecordingStore {
        uploads: Mutex<Vec<(String, Bytes, Option<String>, bool)>>,
        fail: bool,
    }

    #[async_trait::async_trait]
    impl ObjectStore for RecordingStore {
        async fn put_object(
            &self,
            key: &str,
            value: Bytes,
            options: PutOptions,
        ) -> std::result::Result<(), ObjectStoreError> {
            if self.fail {
                return Err(ObjectStoreError::Network("connection reset".to_string()));
            }
            self.uploads.lock().await.push((
                key.to_string(),
                value,
                options.content_type,
                options.resumable,
            ));
            Ok(())
        }
    }

    fn config() -> StorageChannelConfig {
        StorageChannelConfig {
            bucket: "job-logs".to_string(),
            bucket_folder: "settle".to_string(),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_object_path_requires_sub_path() {
        let channel = StorageChannel::new(config());
        assert_eq!(channel.get_object_path().await, None);
        assert_eq!(channel.get_link().await, None);

        channel.set_bucket_path("2024/01/run.log").await;
        assert_eq!(
            channel.get_object_path().await.as_deref(),
            Some("settle/2024/01/run.log")
        );
    }

    #[tokio::test]
    async fn test_object_path_single_separator() {
        let channel = StorageChannel::new(config());
        channel.set_bucket_folder("settle/").await;
        channel.set_bucket_path("run.log").await;
        assert_eq!(channel.get_object_path().await.as_deref(), Some("settle/run.log"));

        channel.set_bucket_path("/run.log").await;
        assert_eq!(channel.get_object_path().await.as_deref(), Some("settle/run.log"));
        assert_eq!(channel.bucket_folder().await, "settle/");
    }

    #[tokio::test]
    async fn test_object_path_collapses_trailing_separators() {
        let channel = StorageChannel::new(StorageChannelConfig {
            bucket_folder: "settle//".to_string(),
            ..config()
        });
        channel.set_bucket_path("run.log").await;
        assert_eq!(channel.get_object_path().await.as_deref(), Some("settle/run.log"));

        channel.set_bucket_folder("jobs///").await;
        channel.set_bucket_path("//2024/run.log").await;
        assert_eq!(channel.get_object_path().await.as_deref(), Some("jobs/2024/run.log"));
    }

    #[tokio::test]
    async fn test_get_link() {
        let channel = StorageChannel::new(StorageChannelConfig {
            bucket_folder: "/".to_string(),
            ..config()
        });
        channel.set_bucket_path("run.log").await;
        assert_eq!(
            channel.get_link().await.as_deref(),
            Some("http://storage.googleapis.com/job-logs/run.log")
        );
        assert_eq!(
            channel.link().await.as_deref(),
            Some("http://storage.googleapis.com/job-logs/run.log")
        );
    }

    #[tokio::test]
    async fn test_upload_without_source_is_noop() -> anyhow::Result<()> {
        let store = Arc::new(RecordingStore::default());
        let channel = StorageChannel::with_store(config(), store.clone());

        assert!(!channel.upload().await?);
        assert!(store.uploads.lock().await.is_empty());
        Ok(())
    }

    #[tokio::test]
    async fn test_handle_uploads_file() -> anyhow::Result<()> {
        let temp_file = tempfile::NamedTempFile::new()?;
        std::fs::write(temp_file.path(), "job output")?;

        let store = Arc::new(RecordingStore::default());
        let channel = StorageChannel::with_store(config(), store.clone());
        channel.set_bucket_path("run.log").await;
        channel.set_upload_file_path(temp_file.path()).await;
        assert_eq!(
            channel.get_upload_file_path().await.as_deref(),
            Some(temp_file.path())
        );

        let absorbed = channel
            .handle(&LogEvent::new(LogLevel::Info, "done", ()))
            .await?;
        assert!(!absorbed);

        let uploads = store.uploads.lock().await;
        assert_eq!(uploads.len(), 1);
        assert_eq!(uploads[0].0, "settle/run.log");
        assert_eq!(uploads[0].1, Bytes::from("job output"));
        assert_eq!(uploads[0].2.as_deref(), Some(CONTENT_TYPE));
        assert!(uploads[0].3);
        Ok(())
    }

    #[tokio::test]
    async fn test_upload_without_bucket_path_is_configuration_error() -> anyhow::Result<()> {
        let temp_file = tempfile::NamedTempFile::new()?;
        let channel = StorageChannel::with_store(config(), Arc::new(RecordingStore::default()));
        channel.set_upload_file_path(temp_file.path()).await;

        let result = channel.upload().await;
        assert!(matches!(result, Err(LogError::Configuration(_))));
        Ok(())
    }

    #[tokio::test]
    async fn test_upload_failure_propagates() -> anyhow::Result<()> {
        let temp_file = tempfile::NamedTempFile::new()?;
        let store = Arc::new(RecordingStore {
            fail: true,
            ..Default::default()
        });
        let channel = StorageChannel::with_store(config(), store);
        channel.set_bucket_path("run.log").await;
        channel.set_upload_file_path(temp_file.path()).await;

        let result = channel
            .handle(&LogEvent::new(LogLevel::Info, "done", ()))
            .await;
        assert!(matches!(result, Err(LogError::Delivery { .. })));
        Ok(())
    }

    #[tokio::test]
    async fn test_upload_failure_ignored() -> anyhow::Result<()> {
        let temp_file = tempfile::NamedTempFile::new()?;
        let store = Arc::new(RecordingStore {
            fail: true,
            ..Default::default()
        });
        let channel = StorageChannel::with_store(
            StorageChannelConfig {
                ignore_exceptions: true,
                ..config()
            },
            store,
        );
        channel.set_bucket_path("run.log").await;
        channel.set_upload_file_path(temp_file.path()).await;

        let absorbed = channel
            .handle(&LogEvent::new(LogLevel::Info, "done", ()))
            .await?;
        assert!(!absorbed);
        Ok(())
    }

    #[tokio::test]
    async fn test_missing_credential_fails_on_first_use() {
        let channel = StorageChannel::new(StorageChannelConfig {
            credential_path: "/nonexistent/stacklog/credential.json".to_string(),
            ignore_exceptions: true,
            ..config()
        });

        let result = channel
            .handle(&LogEvent::new(LogLevel::Info, "done", ()))
            .await;
        assert!(matches!(result, Err(LogError::Configuration(_))));
    }

    #[tokio::test]
    async fn test_uploads_through_gcs() -> anyhow::Result<()> {
        let mut server = mockito::Server::new_async().await;
        let session_url = format!("{}/session/1", server.url());
        let init = server
            .mock("POST", "/upload/storage/v1/b/job-logs/o")
            .match_query(mockito::Matcher::UrlEncoded(
                "name".into(),
                "settle/run.log".into(),
            ))
            .match_header("x-upload-content-type", CONTENT_TYPE)
            .with_status(200)
            .with_header("location", &session_url)
            .create_async()
            .await;
        let upload = server
            .mock("PUT", "/session/1")
            .match_body("line\n")
            .with_status(200)
            .create_async()
            .await;

        let credential = tempfile::NamedTempFile::new()?;
        std::fs::write(credential.path(), r#"{"access_token":"tok"}"#)?;
        let source = tempfile::NamedTempFile::new()?;
        std::fs::write(source.path(), "line\n")?;

        let channel = StorageChannel::new(StorageChannelConfig {
            credential_path: credential.path().to_string_lossy().to_string(),
            endpoint: server.url(),
            ..config()
        });
        channel.set_bucket_path("run.log").await;
        channel.set_upload_file_path(source.path()).await;
        channel
            .handle(&LogEvent::new(LogLevel::Info, "done", ()))
            .await?;

        init.assert_async().await;
        upload.assert_async().await;
        Ok(())
    }
}
