//! Opaque byte cache consumed by the preview pipeline.
//!
//! Keys are strings from [`CacheKey`]; values are encoded preview bytes. Stored
//! artifacts never expire: a new modification time yields a new key.

mod key;
mod memory;

use async_trait::async_trait;

pub use key::CacheKey;
pub use memory::MemoryCache;

/// Failure reported by a cache backend.
#[derive(Debug, Clone, thiserror::Error)]
#[error("{0}")]
pub struct CacheError(pub String);

/// Async key/value byte store. Implementations must allow concurrent access to
/// distinct keys; cancellation is dropping the returned future.
#[async_trait]
pub trait CacheStore: Send + Sync {
    async fn store(&self, key: &str, value: Vec<u8>) -> Result<(), CacheError>;

    /// Returns `Ok(None)` on a miss.
    async fn load(&self, key: &str) -> Result<Option<Vec<u8>>, CacheError>;

    async fn delete(&self, key: &str) -> Result<(), CacheError>;
}
