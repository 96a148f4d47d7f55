use serde::Deserialize;
use std::path::Path;

use crate::oss::ObjectStoreError;

/// GCP 凭证文件
///
/// 只读取本库用到的字段；`access_token` 存在时作为 Bearer 令牌使用。
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct GcpCredential {
    #[serde(rename = "type")]
    pub credential_type: Option<String>,
    pub project_id: Option<String>,
    pub client_email: Option<String>,
    pub access_token: Option<String>,
}

impl GcpCredential {
    /// 读取凭证文件，文件不存在或格式错误都是配置错误
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ObjectStoreError> {
        let path = path.as_ref();
        if !path.is_file() {
            return Err(ObjectStoreError::Configuration(format!(
                "凭证文件不存在: {}",
                path.display()
            )));
        }

        let content = std::fs::read_to_string(path).map_err(|e| {
            ObjectStoreError::Configuration(format!("读取凭证文件失败: {}", e))
        })?;

        serde_json::from_str(&content).map_err(|e| {
            ObjectStoreError::Configuration(format!("解析凭证文件失败: {}", e))
        })
    }

    /// 读取可选的凭证文件
    pub fn from_optional_file(path: Option<&str>) -> Result<Self, ObjectStoreError> {
        match path {
            Some(path) => Self::from_file(shellexpand::tilde(path).as_ref()),
            None => Ok(Self::default()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_file() -> anyhow::Result<()> {
        let temp_file = tempfile::NamedTempFile::new()?;
        std::fs::write(
            temp_file.path(),
            r#"{"type":"service_account","project_id":"p1","access_token":"tok"}"#,
        )?;

        let credential = GcpCredential::from_file(temp_file.path())?;
        assert_eq!(credential.credential_type.as_deref(), Some("service_account"));
        assert_eq!(credential.project_id.as_deref(), Some("p1"));
        assert_eq!(credential.access_token.as_deref(), Some("tok"));
        assert!(credential.client_email.is_none());
        Ok(())
    }

    #[test]
    fn test_missing_file_is_configuration_error() {
        let result = GcpCredential::from_file("/nonexistent/stacklog/credential.json");
        assert!(matches!(result, Err(ObjectStoreError::Configuration(_))));
    }

    #[test]
    fn test_malformed_file_is_configuration_error() -> anyhow::Result<()> {
        let temp_file = tempfile::NamedTempFile::new()?;
        std::fs::write(temp_file.path(), "not json")?;

        let result = GcpCredential::from_file(temp_file.path());
        assert!(matches!(result, Err(ObjectStoreError::Configuration(_))));
        Ok(())
    }

    #[test]
    fn test_optional_none() -> anyhow::Result<()> {
        let credential = GcpCredential::from_optional_file(None)?;
        assert!(credential.access_token.is_none());
        Ok(())
    }
}
