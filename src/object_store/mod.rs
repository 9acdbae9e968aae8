mod local;

pub use local::LocalStore;

use async_trait::async_trait;
use bytes::Bytes;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ObjectStoreError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Object not found: {0}")]
    NotFound(String),
}

/// Abstraction over blob storage backends.
/// Keys are paths: originals live at a file's `local_path`, variants at
/// `{local_path}_{size}`.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Write a blob, replacing any existing blob at `key`.
    async fn put(&self, key: &str, data: Bytes) -> Result<(), ObjectStoreError>;
    async fn get(&self, key: &str) -> Result<Bytes, ObjectStoreError>;
    async fn delete(&self, key: &str) -> Result<(), ObjectStoreError>;
}
