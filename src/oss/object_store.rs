use async_trait::async_trait;
use bytes::Bytes;
use std::path::Path;

use crate::oss::ObjectStoreError;

/// 上传选项
#[derive(Debug, Clone, Default)]
pub struct PutOptions {
    /// 内容类型，缺省为 `application/octet-stream`
    pub content_type: Option<String>,
    /// 使用可续传上传会话
    pub resumable: bool,
}

impl PutOptions {
    pub fn with_content_type(mut self, content_type: impl Into<String>) -> Self {
        self.content_type = Some(content_type.into());
        self
    }

    pub fn with_resumable(mut self, resumable: bool) -> Self {
        self.resumable = resumable;
        self
    }
}

/// 对象存储统一接口
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// 上传对象
    async fn put_object(
        &self,
        key: &str,
        value: Bytes,
        options: PutOptions,
    ) -> Result<(), ObjectStoreError>;

    /// 上传本地文件
    ///
    /// 默认实现整份读入内存后调用 `put_object`，远程实现应改为流式上传
    async fn put_file(
        &self,
        key: &str,
        local_path: &Path,
        options: PutOptions,
    ) -> Result<(), ObjectStoreError> {
        let content = tokio::fs::read(local_path).await?;
        self.put_object(key, Bytes::from(content), options).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::sync::Mutex;

    #[derive(Default)]
    struct MemoryStore {
        objects: Mutex<Vec<(String, Bytes, PutOptions)>>,
    }

    #[async_trait]
    impl ObjectStore for MemoryStore {
        async fn put_object(
            &self,
            key: &str,
            value: Bytes,
            options: PutOptions,
        ) -> Result<(), ObjectStoreError> {
            self.objects
                .lock()
                .await
                .push((key.to_string(), value, options));
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_put_file_default_reads_local_file() -> Result<(), ObjectStoreError> {
        let temp_file = tempfile::NamedTempFile::new()?;
        std::fs::write(temp_file.path(), "line 1\nline 2\n")?;

        let store = MemoryStore::default();
        store
            .put_file(
                "logs/job.log",
                temp_file.path(),
                PutOptions::default().with_content_type("text/plain"),
            )
            .await?;

        let objects = store.objects.lock().await;
        assert_eq!(objects.len(), 1);
        assert_eq!(objects[0].0, "logs/job.log");
        assert_eq!(objects[0].1, Bytes::from("line 1\nline 2\n"));
        assert_eq!(objects[0].2.content_type.as_deref(), Some("text/plain"));
        Ok(())
    }

    #[tokio::test]
    async fn test_put_file_missing_source() {
        let store = MemoryStore::default();
        let result = store
            .put_file("k", Path::new("/nonexistent/stacklog/file.log"), PutOptions::default())
            .await;
        assert!(matches!(result, Err(ObjectStoreError::Io(_))));
    }
}
