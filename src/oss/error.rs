use thiserror::Error;

/// 对象存储统一错误类型
#[derive(Error, Debug)]
pub enum ObjectStoreError {
    #[error("对象不存在: {key}")]
    NotFound { key: String },

    #[error("认证失败: {0}")]
    Authentication(String),

    #[error("权限不足: {0}")]
    PermissionDenied(String),

    #[error("网络错误: {0}")]
    Network(String),

    #[error("限流: {0}")]
    RateLimited(String),

    #[error("配置错误: {0}")]
    Configuration(String),

    #[error("厂商错误 [{provider}]: {message}")]
    Provider { provider: String, message: String },

    #[error("IO 错误: {0}")]
    Io(#[from] std::io::Error),
}

impl ObjectStoreError {
    /// 根据 HTTP 状态码归类错误
    pub fn from_status(status: u16, key: &str, provider: &str, body: String) -> Self {
        match status {
            401 => ObjectStoreError::Authentication(body),
            403 => ObjectStoreError::PermissionDenied(body),
            404 => ObjectStoreError::NotFound {
                key: key.to_string(),
            },
            429 => ObjectStoreError::RateLimited(body),
            _ => ObjectStoreError::Provider {
                provider: provider.to_string(),
                message: format!("HTTP {}: {}", status, body),
            },
        }
    }
}

impl From<reqwest::Error> for ObjectStoreError {
    fn from(err: reqwest::Error) -> Self {
        ObjectStoreError::Network(err.to_string())
    }
}
