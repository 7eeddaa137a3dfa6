//! Publisher: offload decision, attribute binding and mode-aware dispatch.

use std::sync::Arc;

use bytes::Bytes;
use uuid::Uuid;

use pubsub_middleware::{Cache, OutgoingMessage, Transport, ORDERED_SUFFIX};

use crate::attributes::{self, AttributeMap, AttributeValue};
use crate::offload::{is_large, offload_ttl, RESERVED_OFFLOAD_KEY};
use crate::{Error, Result};

/// How a publish is dispatched. Ordered delivery always carries both the
/// ordering key and the deduplication id; standard delivery carries
/// neither, so supplying them to a standard destination is unrepresentable.
#[derive(Debug, Clone)]
pub enum Dispatch {
    Standard,
    Ordered { group_id: String, dedup_id: String },
}

/// Publishes messages to topics, offloading oversized bodies to the cache
/// tier. Transport and cache handles are injected at construction; there
/// is no ambient session state, and concurrent publishes are independent.
pub struct Publisher {
    transport: Arc<dyn Transport>,
    cache: Arc<dyn Cache>,
}

impl Publisher {
    pub fn new(transport: Arc<dyn Transport>, cache: Arc<dyn Cache>) -> Self {
        Self { transport, cache }
    }

    /// Publish `body` to the topic identified by `topic_arn`.
    ///
    /// Pipeline: mode/naming preconditions, offload decision, attribute
    /// validation, wire binding, dispatch. Returns the transport-assigned
    /// message id. Transport failures are logged with the destination and
    /// re-raised; an offload store failure propagates rather than letting
    /// the oversized body be silently dropped.
    pub async fn publish(
        &self,
        topic_arn: &str,
        body: impl Into<Bytes>,
        mut attributes: AttributeMap,
        dispatch: Dispatch,
    ) -> Result<String> {
        match &dispatch {
            Dispatch::Ordered { group_id, dedup_id } => {
                if !topic_arn.ends_with(ORDERED_SUFFIX) {
                    return Err(Error::Configuration(format!(
                        "ordered publish requires a destination ending in {}, got {}",
                        ORDERED_SUFFIX, topic_arn
                    )));
                }
                if group_id.is_empty() || dedup_id.is_empty() {
                    return Err(Error::Configuration(
                        "ordered publish requires a non-empty group id and dedup id".to_string(),
                    ));
                }
            }
            Dispatch::Standard => {
                if topic_arn.ends_with(ORDERED_SUFFIX) {
                    return Err(Error::Configuration(format!(
                        "{} is an ordered destination and requires Dispatch::Ordered",
                        topic_arn
                    )));
                }
            }
        }

        let mut body = body.into();
        if is_large(&body) {
            let key = Uuid::new_v4().to_string();
            self.cache.set(&key, body.clone(), Some(offload_ttl())).await?;
            tracing::debug!(key = %key, size = body.len(), "offloaded oversized body");
            attributes.insert(
                RESERVED_OFFLOAD_KEY.to_string(),
                AttributeValue::String(key.clone()),
            );
            // The inline body becomes a placeholder; consumers resolve the
            // original through the reserved attribute
            body = Bytes::from(key);
        }

        attributes::validate(&attributes)?;
        let wire = attributes::bind(&attributes);

        let (group_id, dedup_id) = match dispatch {
            Dispatch::Standard => (None, None),
            Dispatch::Ordered { group_id, dedup_id } => (Some(group_id), Some(dedup_id)),
        };
        let message = OutgoingMessage { body, attributes: wire, group_id, dedup_id };

        match self.transport.publish(topic_arn, message).await {
            Ok(message_id) => {
                tracing::debug!(topic = %topic_arn, message_id = %message_id, "published");
                Ok(message_id)
            }
            Err(e) => {
                tracing::error!(topic = %topic_arn, error = %e, "publish failed");
                Err(Error::Publish(format!("{}: {}", topic_arn, e)))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::offload::{OFFLOAD_THRESHOLD_BYTES, OFFLOAD_TTL_MINUTES};
    use async_trait::async_trait;
    use pubsub_middleware::{
        DeliveryMode, InMemoryCache, QueueHandle, ReceiveOptions, ReceivedMessage, TopicHandle,
        TransportError,
    };
    use std::collections::HashMap;
    use std::sync::Mutex;
    use std::time::Duration;

    /// Records published messages instead of dispatching them.
    #[derive(Default)]
    struct RecordingTransport {
        published: Mutex<Vec<(String, OutgoingMessage)>>,
        fail_publish: bool,
    }

    impl RecordingTransport {
        fn published(&self) -> Vec<(String, OutgoingMessage)> {
            self.published.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl Transport for RecordingTransport {
        async fn create_topic(
            &self,
            name: &str,
            _mode: DeliveryMode,
        ) -> std::result::Result<TopicHandle, TransportError> {
            Ok(TopicHandle { name: name.to_string(), arn: name.to_string() })
        }

        async fn publish(
            &self,
            topic_arn: &str,
            message: OutgoingMessage,
        ) -> std::result::Result<String, TransportError> {
            if self.fail_publish {
                return Err(TransportError::PublishFailed("wire down".to_string()));
            }
            self.published.lock().unwrap().push((topic_arn.to_string(), message));
            Ok("mid-1".to_string())
        }

        async fn create_queue(
            &self,
            name: &str,
            _mode: DeliveryMode,
        ) -> std::result::Result<QueueHandle, TransportError> {
            Ok(QueueHandle {
                name: name.to_string(),
                url: name.to_string(),
                arn: name.to_string(),
            })
        }

        async fn receive(
            &self,
            _queue_url: &str,
            _options: &ReceiveOptions,
        ) -> std::result::Result<Vec<ReceivedMessage>, TransportError> {
            Ok(Vec::new())
        }

        async fn delete(
            &self,
            _queue_url: &str,
            _receipt_handle: &str,
        ) -> std::result::Result<(), TransportError> {
            Ok(())
        }

        async fn subscribe(
            &self,
            _topic_arn: &str,
            _queue_arn: &str,
        ) -> std::result::Result<String, TransportError> {
            Ok("sub".to_string())
        }
    }

    fn publisher_with(
        transport: Arc<RecordingTransport>,
        cache: Arc<InMemoryCache>,
    ) -> Publisher {
        Publisher::new(transport, cache)
    }

    fn attrs() -> AttributeMap {
        let mut attributes = AttributeMap::new();
        attributes.insert("kind".to_string(), AttributeValue::String("event".to_string()));
        attributes
    }

    #[tokio::test]
    async fn test_small_body_is_sent_inline() {
        let transport = Arc::new(RecordingTransport::default());
        let cache = Arc::new(InMemoryCache::new());
        let publisher = publisher_with(transport.clone(), cache);

        let id = publisher
            .publish("mem:topic:events", "small body", attrs(), Dispatch::Standard)
            .await
            .unwrap();
        assert_eq!(id, "mid-1");

        let published = transport.published();
        assert_eq!(published.len(), 1);
        let (_, message) = &published[0];
        assert_eq!(message.body, Bytes::from("small body"));
        assert!(!message.attributes.contains_key(RESERVED_OFFLOAD_KEY));
    }

    #[tokio::test]
    async fn test_body_at_threshold_stays_inline() {
        let transport = Arc::new(RecordingTransport::default());
        let cache = Arc::new(InMemoryCache::new());
        let publisher = publisher_with(transport.clone(), cache);

        let body = vec![b'x'; OFFLOAD_THRESHOLD_BYTES];
        publisher
            .publish("mem:topic:events", body.clone(), attrs(), Dispatch::Standard)
            .await
            .unwrap();

        let (_, message) = &transport.published()[0];
        assert_eq!(message.body.len(), OFFLOAD_THRESHOLD_BYTES);
        assert!(!message.attributes.contains_key(RESERVED_OFFLOAD_KEY));
    }

    #[tokio::test]
    async fn test_oversized_body_is_offloaded_with_placeholder() {
        let transport = Arc::new(RecordingTransport::default());
        let cache = Arc::new(InMemoryCache::new());
        let publisher = publisher_with(transport.clone(), cache.clone());

        let body = vec![b'x'; OFFLOAD_THRESHOLD_BYTES + 1];
        publisher
            .publish("mem:topic:events", body.clone(), attrs(), Dispatch::Standard)
            .await
            .unwrap();

        let (_, message) = &transport.published()[0];
        let key = &message.attributes[RESERVED_OFFLOAD_KEY].value;

        // Inline body replaced by the key placeholder
        assert_eq!(message.body, Bytes::from(key.clone()));
        // Full body stored under the fresh key
        assert_eq!(cache.get(key).await.unwrap(), Some(Bytes::from(body)));
        // 10-day TTL policy
        assert_eq!(OFFLOAD_TTL_MINUTES, 14_400);
    }

    #[tokio::test]
    async fn test_offload_cache_failure_propagates() {
        struct BrokenCache;
        #[async_trait]
        impl Cache for BrokenCache {
            async fn get(
                &self,
                _key: &str,
            ) -> std::result::Result<Option<Bytes>, pubsub_middleware::CacheError> {
                Ok(None)
            }
            async fn set(
                &self,
                _key: &str,
                _value: Bytes,
                _ttl: Option<Duration>,
            ) -> std::result::Result<(), pubsub_middleware::CacheError> {
                Err(pubsub_middleware::CacheError::OperationFailed("down".to_string()))
            }
            async fn delete(&self, _key: &str) -> std::result::Result<(), pubsub_middleware::CacheError> {
                Ok(())
            }
            async fn exists(&self, _key: &str) -> std::result::Result<bool, pubsub_middleware::CacheError> {
                Ok(false)
            }
        }

        let transport = Arc::new(RecordingTransport::default());
        let publisher = Publisher::new(transport.clone(), Arc::new(BrokenCache));

        let body = vec![b'x'; OFFLOAD_THRESHOLD_BYTES + 1];
        let result = publisher
            .publish("mem:topic:events", body, attrs(), Dispatch::Standard)
            .await;
        assert!(matches!(result, Err(Error::Cache(_))));
        // Nothing was dispatched with a dangling offload reference
        assert!(transport.published().is_empty());
    }

    #[tokio::test]
    async fn test_ordered_publish_requires_suffix() {
        let transport = Arc::new(RecordingTransport::default());
        let publisher = publisher_with(transport.clone(), Arc::new(InMemoryCache::new()));

        let result = publisher
            .publish(
                "mem:topic:orders",
                "o",
                AttributeMap::new(),
                Dispatch::Ordered {
                    group_id: "g".to_string(),
                    dedup_id: "d".to_string(),
                },
            )
            .await;
        assert!(matches!(result, Err(Error::Configuration(_))));
        assert!(transport.published().is_empty());
    }

    #[tokio::test]
    async fn test_ordered_publish_requires_non_empty_keys() {
        let transport = Arc::new(RecordingTransport::default());
        let publisher = publisher_with(transport, Arc::new(InMemoryCache::new()));

        let result = publisher
            .publish(
                "mem:topic:orders.fifo",
                "o",
                AttributeMap::new(),
                Dispatch::Ordered { group_id: String::new(), dedup_id: "d".to_string() },
            )
            .await;
        assert!(matches!(result, Err(Error::Configuration(_))));
    }

    #[tokio::test]
    async fn test_standard_publish_to_ordered_destination_rejected() {
        let transport = Arc::new(RecordingTransport::default());
        let publisher = publisher_with(transport, Arc::new(InMemoryCache::new()));

        let result = publisher
            .publish("mem:topic:orders.fifo", "o", AttributeMap::new(), Dispatch::Standard)
            .await;
        assert!(matches!(result, Err(Error::Configuration(_))));
    }

    #[tokio::test]
    async fn test_ordered_publish_carries_keys_to_transport() {
        let transport = Arc::new(RecordingTransport::default());
        let publisher = publisher_with(transport.clone(), Arc::new(InMemoryCache::new()));

        publisher
            .publish(
                "mem:topic:orders.fifo",
                "o",
                AttributeMap::new(),
                Dispatch::Ordered {
                    group_id: "group-1".to_string(),
                    dedup_id: "dedup-1".to_string(),
                },
            )
            .await
            .unwrap();

        let (_, message) = &transport.published()[0];
        assert_eq!(message.group_id.as_deref(), Some("group-1"));
        assert_eq!(message.dedup_id.as_deref(), Some("dedup-1"));
    }

    #[tokio::test]
    async fn test_invalid_attributes_rejected_before_dispatch() {
        let transport = Arc::new(RecordingTransport::default());
        let publisher = publisher_with(transport.clone(), Arc::new(InMemoryCache::new()));

        let mut attributes = AttributeMap::new();
        attributes.insert(String::new(), AttributeValue::String("x".to_string()));
        let result = publisher
            .publish("mem:topic:events", "body", attributes, Dispatch::Standard)
            .await;
        assert!(matches!(result, Err(Error::Validation(_))));
        assert!(transport.published().is_empty());
    }

    #[tokio::test]
    async fn test_transport_failure_surfaces() {
        let transport = Arc::new(RecordingTransport {
            fail_publish: true,
            ..Default::default()
        });
        let publisher = publisher_with(transport, Arc::new(InMemoryCache::new()));

        let result = publisher
            .publish("mem:topic:events", "body", attrs(), Dispatch::Standard)
            .await;
        assert!(matches!(result, Err(Error::Publish(_))));
    }
}
