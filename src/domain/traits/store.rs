use async_trait::async_trait;
use crate::application::errors::StorageError;

/// Store trait - sectioned key/value persistence
#[async_trait]
pub trait Store: Send + Sync {
    async fn get(&self, section: &str, key: &str) -> Result<Option<String>, StorageError>;
    async fn set(&self, section: &str, key: &str, value: &str) -> Result<(), StorageError>;

    /// Write pending changes to the backing medium
    async fn flush(&self) -> Result<(), StorageError>;
}
