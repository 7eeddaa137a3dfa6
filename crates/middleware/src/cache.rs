use async_trait::async_trait;
use bytes::Bytes;
use std::time::Duration;

use crate::error::CacheError;

/// External key-value store used to offload oversized message bodies.
/// Concurrency is the backing service's concern; implementations must be
/// safe to share across publisher and consumer instances.
#[async_trait]
pub trait Cache: Send + Sync {
    /// Get a value; `None` when the key is absent or expired
    async fn get(&self, key: &str) -> Result<Option<Bytes>, CacheError>;

    /// Set a value with optional TTL
    async fn set(&self, key: &str, value: Bytes, ttl: Option<Duration>) -> Result<(), CacheError>;

    /// Delete a key (consumers may use this once an offloaded body is read)
    async fn delete(&self, key: &str) -> Result<(), CacheError>;

    /// Check existence
    async fn exists(&self, key: &str) -> Result<bool, CacheError>;
}
