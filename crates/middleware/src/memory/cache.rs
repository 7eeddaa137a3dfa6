use async_trait::async_trait;
use bytes::Bytes;
use std::collections::HashMap;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;

use crate::cache::Cache;
use crate::error::CacheError;

struct CacheEntry {
    value: Bytes,
    expires_at: Option<Instant>,
}

impl CacheEntry {
    fn is_expired(&self) -> bool {
        self.expires_at.map(|e| Instant::now() > e).unwrap_or(false)
    }
}

pub struct InMemoryCache {
    data: RwLock<HashMap<String, CacheEntry>>,
}

impl InMemoryCache {
    pub fn new() -> Self {
        Self { data: RwLock::new(HashMap::new()) }
    }
}

impl Default for InMemoryCache {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Cache for InMemoryCache {
    async fn get(&self, key: &str) -> Result<Option<Bytes>, CacheError> {
        let data = self.data.read().await;
        Ok(data
            .get(key)
            .and_then(|e| if e.is_expired() { None } else { Some(e.value.clone()) }))
    }

    async fn set(&self, key: &str, value: Bytes, ttl: Option<Duration>) -> Result<(), CacheError> {
        let expires_at = ttl.map(|d| Instant::now() + d);
        let mut data = self.data.write().await;
        data.insert(key.to_string(), CacheEntry { value, expires_at });
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<(), CacheError> {
        let mut data = self.data.write().await;
        data.remove(key);
        Ok(())
    }

    async fn exists(&self, key: &str) -> Result<bool, CacheError> {
        let data = self.data.read().await;
        Ok(data.get(key).map(|e| !e.is_expired()).unwrap_or(false))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_get_set() {
        let cache = InMemoryCache::new();
        cache.set("key", Bytes::from("value"), None).await.unwrap();
        assert_eq!(cache.get("key").await.unwrap(), Some(Bytes::from("value")));
        assert!(cache.exists("key").await.unwrap());
    }

    #[tokio::test]
    async fn test_delete() {
        let cache = InMemoryCache::new();
        cache.set("key", Bytes::from("value"), None).await.unwrap();
        cache.delete("key").await.unwrap();
        assert!(cache.get("key").await.unwrap().is_none());
        assert!(!cache.exists("key").await.unwrap());
    }

    #[tokio::test]
    async fn test_ttl_expiration() {
        let cache = InMemoryCache::new();
        cache
            .set("key", Bytes::from("value"), Some(Duration::from_millis(1)))
            .await
            .unwrap();
        tokio::time::sleep(Duration::from_millis(10)).await;
        assert!(cache.get("key").await.unwrap().is_none());
    }
}
