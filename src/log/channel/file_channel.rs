use serde::Deserialize;
use smart_default::SmartDefault;
use std::any::Any;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;

use crate::log::channel::LogChannel;
use crate::log::error::Result;
use crate::log::level::LogLevel;
use crate::log::log_record::LogEvent;
use crate::log::transformer::MessageTransformer;

/// FileChannel 配置
#[derive(Debug, Clone, Deserialize, SmartDefault)]
#[serde(default)]
pub struct FileChannelConfig {
    /// 日志文件路径，`~` 会被展开
    #[default = "logs/stacklog.log"]
    pub path: String,

    #[default(LogLevel::Debug)]
    pub level: LogLevel,

    #[default = true]
    pub bubble: bool,
}

/// 文件通道
///
/// 每条日志以单行文本追加到当前路径，路径可在运行时修改
pub struct FileChannel {
    config: FileChannelConfig,
    path: Mutex<PathBuf>,
}

impl FileChannel {
    pub fn new(config: FileChannelConfig) -> Self {
        let path = PathBuf::from(shellexpand::tilde(&config.path).as_ref());
        Self {
            config,
            path: Mutex::new(path),
        }
    }

    pub async fn set_path(&self, path: impl AsRef<Path>) {
        *self.path.lock().await = path.as_ref().to_path_buf();
    }

    pub async fn get_path(&self) -> PathBuf {
        self.path.lock().await.clone()
    }

    /// 清空文件内容，文件不存在时什么也不做
    pub async fn clear_file(&self) -> Result<()> {
        let path = self.path.lock().await;
        match tokio::fs::OpenOptions::new()
            .write(true)
            .truncate(true)
            .open(&*path)
            .await
        {
            Ok(_) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    /// 删除文件，文件不存在时什么也不做
    pub async fn delete_file(&self) -> Result<()> {
        let path = self.path.lock().await;
        match tokio::fs::remove_file(&*path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    /// 把一段文本写入任意文件，覆盖原内容
    pub async fn dump(&self, content: &str, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        ensure_parent_dir(path).await?;
        tokio::fs::write(path, content).await?;
        Ok(())
    }

    async fn append_line(&self, line: &str) -> Result<()> {
        let path = self.path.lock().await;
        ensure_parent_dir(&path).await?;

        let mut file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&*path)
            .await?;
        file.write_all(line.as_bytes()).await?;
        file.write_all(b"\n").await?;
        file.flush().await?;
        Ok(())
    }
}

/// 父目录不存在时以 0775 权限创建
async fn ensure_parent_dir(path: &Path) -> Result<()> {
    let parent = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => return Ok(()),
    };
    if tokio::fs::try_exists(parent).await? {
        return Ok(());
    }

    let mut builder = tokio::fs::DirBuilder::new();
    builder.recursive(true);
    #[cfg(unix)]
    builder.mode(0o775);
    builder.create(parent).await?;
    Ok(())
}

#[async_trait::async_trait]
impl LogChannel for FileChannel {
    fn kind(&self) -> &'static str {
        "FileChannel"
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

        let line = MessageTransformer::format_line(event, &event.channel);
        self.append_line(&line).await?;
        Ok(!self.config.bubble)
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

crate::impl_from!(FileChannelConfig => FileChannel);
crate::impl_box_from!(FileChannel => dyn LogChannel);

#[cfg(test)]
mod tests {
    use super::*;

    fn channel_at(path: &Path) -> FileChannel {
        FileChannel::new(FileChannelConfig {
            path: path.to_string_lossy().to_string(),
            ..Default::default()
        })
    }

    #[tokio::test]
    async fn test_handle_appends_lines() -> anyhow::Result<()> {
        let temp_dir = tempfile::TempDir::new()?;
        let path = temp_dir.path().join("app.log");
        let channel = channel_at(&path);

        channel
            .handle(&LogEvent::new(LogLevel::Error, "disk full", [("code", 42)]).with_channel("job"))
            .await?;
        channel
            .handle(&LogEvent::new(LogLevel::Info, "second", ()))
            .await?;

        let contents = tokio::fs::read_to_string(&path).await?;
        let lines: Vec<&str> = contents.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].contains("job.ERROR: disk full {\"code\":42}"));
        assert!(lines[1].contains("stacklog.INFO: second"));
        Ok(())
    }

    #[tokio::test]
    async fn test_creates_parent_directories() -> anyhow::Result<()> {
        let temp_dir = tempfile::TempDir::new()?;
        let path = temp_dir.path().join("nested/deeper/app.log");
        let channel = channel_at(&path);

        channel
            .handle(&LogEvent::new(LogLevel::Debug, "hello", ()))
            .await?;
        assert!(path.is_file());

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let mode = std::fs::metadata(temp_dir.path().join("nested"))?
                .permissions()
                .mode();
            assert_eq!(mode & 0o002, 0);
        }
        Ok(())
    }

    #[tokio::test]
    async fn test_level_filter() -> anyhow::Result<()> {
        let temp_dir = tempfile::TempDir::new()?;
        let path = temp_dir.path().join("app.log");
        let channel = FileChannel::new(FileChannelConfig {
            path: path.to_string_lossy().to_string(),
            level: LogLevel::Error,
            ..Default::default()
        });

        let absorbed = channel
            .handle(&LogEvent::new(LogLevel::Warning, "ignored", ()))
            .await?;
        assert!(!absorbed);
        assert!(!path.exists());
        Ok(())
    }

    #[tokio::test]
    async fn test_set_path() -> anyhow::Result<()> {
        let temp_dir = tempfile::TempDir::new()?;
        let channel = channel_at(&temp_dir.path().join("a.log"));

        let other = temp_dir.path().join("b.log");
        channel.set_path(&other).await;
        assert_eq!(channel.get_path().await, other);

        channel
            .handle(&LogEvent::new(LogLevel::Info, "moved", ()))
            .await?;
        assert!(other.is_file());
        assert!(!temp_dir.path().join("a.log").exists());
        Ok(())
    }

    #[tokio::test]
    async fn test_clear_and_delete_are_idempotent() -> anyhow::Result<()> {
        let temp_dir = tempfile::TempDir::new()?;
        let path = temp_dir.path().join("app.log");
        let channel = channel_at(&path);

        // 文件不存在时不报错
        channel.clear_file().await?;
        channel.delete_file().await?;

        channel
            .handle(&LogEvent::new(LogLevel::Info, "content", ()))
            .await?;
        channel.clear_file().await?;
        assert_eq!(tokio::fs::read_to_string(&path).await?, "");

        channel.delete_file().await?;
        assert!(!path.exists());
        channel.delete_file().await?;
        Ok(())
    }

    #[tokio::test]
    async fn test_dump() -> anyhow::Result<()> {
        let temp_dir = tempfile::TempDir::new()?;
        let channel = channel_at(&temp_dir.path().join("app.log"));

        let target = temp_dir.path().join("dump/report.txt");
        channel.dump("report body", &target).await?;
        assert_eq!(tokio::fs::read_to_string(&target).await?, "report body");
        Ok(())
    }
}
