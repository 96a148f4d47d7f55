//! 对象存储模块
//!
//! 定义统一的 `ObjectStore` 接口，以及基于 GCS JSON API 的实现。

mod error;
mod gcp_credential;
mod gcp_gcs_object_store;
mod object_store;

pub use error::ObjectStoreError;
pub use gcp_credential::GcpCredential;
pub use gcp_gcs_object_store::{GcpGcsObjectStore, GcpGcsObjectStoreConfig};
pub use object_store::{ObjectStore, PutOptions};
