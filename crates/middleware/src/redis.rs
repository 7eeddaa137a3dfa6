//! Redis-backed implementation of the [`Cache`] trait, used as the offload
//! tier for oversized message bodies.

use async_trait::async_trait;
use bytes::Bytes;
use redis::AsyncCommands;
use std::time::Duration;

use crate::cache::Cache;
use crate::error::CacheError;

pub struct RedisCache {
    conn: redis::aio::MultiplexedConnection,
}

impl RedisCache {
    pub async fn new(redis_url: &str) -> Result<Self, CacheError> {
        let client = redis::Client::open(redis_url)
            .map_err(|e| CacheError::ConnectionFailed(e.to_string()))?;
        let mut conn = client
            .get_multiplexed_async_connection()
            .await
            .map_err(|e| CacheError::ConnectionFailed(e.to_string()))?;

        // Test connection
        let _: String = redis::cmd("PING")
            .query_async(&mut conn)
            .await
            .map_err(|e| CacheError::ConnectionFailed(e.to_string()))?;

        tracing::info!("Connected to Redis");
        Ok(Self { conn })
    }
}

#[async_trait]
impl Cache for RedisCache {
    async fn get(&self, key: &str) -> Result<Option<Bytes>, CacheError> {
        let mut conn = self.conn.clone();
        let value: Option<Vec<u8>> = conn
            .get(key)
            .await
            .map_err(|e| CacheError::OperationFailed(e.to_string()))?;
        Ok(value.map(Bytes::from))
    }

    async fn set(&self, key: &str, value: Bytes, ttl: Option<Duration>) -> Result<(), CacheError> {
        let mut conn = self.conn.clone();
        match ttl {
            Some(ttl) => {
                conn.set_ex::<_, _, ()>(key, value.as_ref(), ttl.as_secs())
                    .await
                    .map_err(|e| CacheError::OperationFailed(e.to_string()))?;
                tracing::debug!(key = %key, ttl_secs = ttl.as_secs(), "SET with EX");
            }
            None => {
                conn.set::<_, _, ()>(key, value.as_ref())
                    .await
                    .map_err(|e| CacheError::OperationFailed(e.to_string()))?;
                tracing::debug!(key = %key, "SET");
            }
        }
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<(), CacheError> {
        let mut conn = self.conn.clone();
        conn.del::<_, ()>(key)
            .await
            .map_err(|e| CacheError::OperationFailed(e.to_string()))
    }

    async fn exists(&self, key: &str) -> Result<bool, CacheError> {
        let mut conn = self.conn.clone();
        conn.exists(key)
            .await
            .map_err(|e| CacheError::OperationFailed(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // Requires a running Redis server:
    // docker run -p 6379:6379 redis:latest

    #[tokio::test]
    #[ignore]
    async fn test_set_get_roundtrip() {
        let cache = RedisCache::new("redis://localhost:6379").await.unwrap();
        cache
            .set("pubsub-test:key", Bytes::from("value"), Some(Duration::from_secs(60)))
            .await
            .unwrap();
        assert_eq!(
            cache.get("pubsub-test:key").await.unwrap(),
            Some(Bytes::from("value"))
        );
        cache.delete("pubsub-test:key").await.unwrap();
        assert!(!cache.exists("pubsub-test:key").await.unwrap());
    }
}
