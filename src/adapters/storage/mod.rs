use crate::error::Result;
use async_trait::async_trait;

pub mod file;
pub mod memory;

pub use file::FileSecureStore;
pub use memory::MemorySecureStore;

/// Key/value storage for session secrets.
#[async_trait]
pub trait SecureStore: Send + Sync + std::fmt::Debug + 'static {
    async fn get(&self, key: &str) -> Result<Option<String>>;
    async fn set(&self, key: &str, value: &str) -> Result<()>;
    /// Removing a missing key is not an error.
    async fn remove(&self, key: &str) -> Result<()>;
}
