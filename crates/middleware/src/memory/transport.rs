use std::collections::HashMap;
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

use async_trait::async_trait;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::error::TransportError;
use crate::integrity::body_digest;
use crate::transport::{
    filter_attributes, DeliveryMode, OutgoingMessage, QueueHandle, ReceiveOptions,
    ReceivedMessage, TopicHandle, Transport, WireAttributeMap,
};

/// Dedup window for ordered topics
const DEDUP_WINDOW: Duration = Duration::from_secs(300);

/// Granularity of the long-poll wait loop
const POLL_INTERVAL: Duration = Duration::from_millis(10);

struct QueuedMessage {
    id: String,
    body: bytes::Bytes,
    body_md5: String,
    attributes: HashMap<String, String>,
    message_attributes: WireAttributeMap,
    /// Hidden from receivers until this instant while a delivery is in flight
    invisible_until: Option<Instant>,
    /// Receipt handle of the outstanding delivery, if any
    receipt_handle: Option<String>,
}

struct TopicState {
    mode: DeliveryMode,
    /// Queue arns bound to this topic (raw delivery)
    subscriptions: Vec<String>,
    /// dedup_id -> (first seen, original message id)
    dedup: HashMap<String, (Instant, String)>,
}

struct QueueState {
    mode: DeliveryMode,
    /// Delivery order is enqueue order
    messages: Vec<QueuedMessage>,
}

#[derive(Default)]
struct Inner {
    /// Keyed by topic arn
    topics: HashMap<String, TopicState>,
    /// Keyed by queue url
    queues: HashMap<String, QueueState>,
    /// Queue arn -> queue url
    queue_urls: HashMap<String, String>,
}

/// In-memory transport with real queue semantics: topic fan-out, visibility
/// timeouts, one-time receipt handles, enqueue-time body digests and a
/// dedup window for ordered topics. Backs the adapter test suites.
pub struct InMemoryTransport {
    inner: RwLock<Inner>,
}

impl InMemoryTransport {
    pub fn new() -> Self {
        Self { inner: RwLock::new(Inner::default()) }
    }

    fn topic_arn(name: &str) -> String {
        format!("mem:topic:{}", name)
    }

    fn queue_url(name: &str) -> String {
        format!("mem://queue/{}", name)
    }

    fn queue_arn(name: &str) -> String {
        format!("mem:queue:{}", name)
    }

    fn now_millis() -> u128 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis())
            .unwrap_or(0)
    }

    /// Number of messages currently held by a queue, in flight or not.
    /// Test observability only.
    pub async fn queue_depth(&self, queue_url: &str) -> usize {
        let inner = self.inner.read().await;
        inner.queues.get(queue_url).map(|q| q.messages.len()).unwrap_or(0)
    }
}

impl Default for InMemoryTransport {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Transport for InMemoryTransport {
    async fn create_topic(
        &self,
        name: &str,
        mode: DeliveryMode,
    ) -> Result<TopicHandle, TransportError> {
        let arn = Self::topic_arn(name);
        let mut inner = self.inner.write().await;
        inner.topics.entry(arn.clone()).or_insert_with(|| TopicState {
            mode,
            subscriptions: Vec::new(),
            dedup: HashMap::new(),
        });
        Ok(TopicHandle { name: name.to_string(), arn })
    }

    async fn publish(
        &self,
        topic_arn: &str,
        message: OutgoingMessage,
    ) -> Result<String, TransportError> {
        let mut inner = self.inner.write().await;
        let inner = &mut *inner;

        let topic = inner
            .topics
            .get_mut(topic_arn)
            .ok_or_else(|| TransportError::PublishFailed(format!("unknown topic {}", topic_arn)))?;

        let now = Instant::now();
        if topic.mode == DeliveryMode::Ordered {
            if let Some(dedup_id) = &message.dedup_id {
                topic.dedup.retain(|_, (seen, _)| now.duration_since(*seen) < DEDUP_WINDOW);
                if let Some((_, original_id)) = topic.dedup.get(dedup_id) {
                    // Duplicate within the window: suppressed, original id returned
                    return Ok(original_id.clone());
                }
            }
        }

        let message_id = Uuid::new_v4().to_string();
        let body_md5 = body_digest(&message.body);
        let mut attributes = HashMap::new();
        attributes.insert("SentTimestamp".to_string(), Self::now_millis().to_string());
        if let Some(group_id) = &message.group_id {
            attributes.insert("MessageGroupId".to_string(), group_id.clone());
        }

        for queue_arn in topic.subscriptions.clone() {
            let Some(url) = inner.queue_urls.get(&queue_arn) else { continue };
            if let Some(queue) = inner.queues.get_mut(url) {
                queue.messages.push(QueuedMessage {
                    id: message_id.clone(),
                    body: message.body.clone(),
                    body_md5: body_md5.clone(),
                    attributes: attributes.clone(),
                    message_attributes: message.attributes.clone(),
                    invisible_until: None,
                    receipt_handle: None,
                });
            }
        }

        if topic.mode == DeliveryMode::Ordered {
            if let Some(dedup_id) = message.dedup_id {
                topic.dedup.insert(dedup_id, (now, message_id.clone()));
            }
        }

        Ok(message_id)
    }

    async fn create_queue(
        &self,
        name: &str,
        mode: DeliveryMode,
    ) -> Result<QueueHandle, TransportError> {
        let url = Self::queue_url(name);
        let arn = Self::queue_arn(name);
        let mut inner = self.inner.write().await;
        inner
            .queues
            .entry(url.clone())
            .or_insert_with(|| QueueState { mode, messages: Vec::new() });
        inner.queue_urls.insert(arn.clone(), url.clone());
        Ok(QueueHandle { name: name.to_string(), url, arn })
    }

    async fn receive(
        &self,
        queue_url: &str,
        options: &ReceiveOptions,
    ) -> Result<Vec<ReceivedMessage>, TransportError> {
        let deadline = Instant::now() + options.effective_wait_time();
        loop {
            {
                let mut inner = self.inner.write().await;
                let queue = inner.queues.get_mut(queue_url).ok_or_else(|| {
                    TransportError::ReceiveFailed(format!("unknown queue {}", queue_url))
                })?;

                let now = Instant::now();
                let mut batch = Vec::new();
                for msg in queue.messages.iter_mut() {
                    if batch.len() >= options.effective_max_messages() {
                        break;
                    }
                    if msg.invisible_until.is_some_and(|until| until > now) {
                        if queue.mode == DeliveryMode::Ordered {
                            // An in-flight message blocks everything behind
                            // it; ordered queues never deliver out of order
                            break;
                        }
                        continue;
                    }
                    let receipt_handle = Uuid::new_v4().to_string();
                    msg.invisible_until = Some(now + options.visibility_timeout);
                    msg.receipt_handle = Some(receipt_handle.clone());
                    batch.push(ReceivedMessage {
                        id: msg.id.clone(),
                        receipt_handle,
                        body: msg.body.clone(),
                        body_md5: msg.body_md5.clone(),
                        attributes: filter_attributes(&msg.attributes, &options.attribute_names),
                        message_attributes: filter_attributes(
                            &msg.message_attributes,
                            &options.message_attribute_names,
                        ),
                    });
                }
                if !batch.is_empty() {
                    return Ok(batch);
                }
            }

            if Instant::now() >= deadline {
                return Ok(Vec::new());
            }
            tokio::time::sleep(POLL_INTERVAL).await;
        }
    }

    async fn delete(&self, queue_url: &str, receipt_handle: &str) -> Result<(), TransportError> {
        let mut inner = self.inner.write().await;
        let queue = inner.queues.get_mut(queue_url).ok_or_else(|| {
            TransportError::DeleteFailed(format!("unknown queue {}", queue_url))
        })?;

        let now = Instant::now();
        let position = queue.messages.iter().position(|m| {
            m.receipt_handle.as_deref() == Some(receipt_handle)
                && m.invisible_until.is_some_and(|until| until > now)
        });
        match position {
            Some(index) => {
                queue.messages.remove(index);
                Ok(())
            }
            None => Err(TransportError::DeleteFailed(
                "unknown or expired receipt handle".to_string(),
            )),
        }
    }

    async fn subscribe(
        &self,
        topic_arn: &str,
        queue_arn: &str,
    ) -> Result<String, TransportError> {
        let mut inner = self.inner.write().await;
        if !inner.queue_urls.contains_key(queue_arn) {
            return Err(TransportError::SubscribeFailed(format!(
                "unknown queue {}",
                queue_arn
            )));
        }
        let topic = inner.topics.get_mut(topic_arn).ok_or_else(|| {
            TransportError::SubscribeFailed(format!("unknown topic {}", topic_arn))
        })?;
        if !topic.subscriptions.iter().any(|arn| arn == queue_arn) {
            topic.subscriptions.push(queue_arn.to_string());
        }
        Ok(format!("{}:{}", topic_arn, Uuid::new_v4()))
    }
}
