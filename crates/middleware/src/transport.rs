use async_trait::async_trait;
use bytes::Bytes;
use std::collections::HashMap;
use std::time::Duration;

use crate::error::TransportError;

/// Reserved name suffix for ordered (FIFO) topics and queues
pub const ORDERED_SUFFIX: &str = ".fifo";

/// Hard transport limit on messages per receive call
pub const MAX_RECEIVE_BATCH: usize = 10;

/// Hard transport limit on long-poll wait time
pub const MAX_WAIT_TIME: Duration = Duration::from_secs(20);

/// Wildcard for attribute filters: return all metadata
pub const ATTRIBUTES_ALL: &str = "All";

/// Per-destination delivery classification, fixed at creation time.
/// Ordered destinations guarantee per-group ordering and deduplicate
/// within the transport's dedup window; their names must end with
/// [`ORDERED_SUFFIX`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeliveryMode {
    Standard,
    Ordered,
}

impl DeliveryMode {
    /// Whether `name` conforms to this mode's naming convention.
    pub fn matches_name(&self, name: &str) -> bool {
        match self {
            DeliveryMode::Ordered => name.ends_with(ORDERED_SUFFIX),
            DeliveryMode::Standard => !name.ends_with(ORDERED_SUFFIX),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TopicHandle {
    pub name: String,
    pub arn: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueueHandle {
    pub name: String,
    pub url: String,
    pub arn: String,
}

/// Typed-attribute wire representation: a type tag plus a textual value.
/// Binary values travel base64-encoded with `data_type == "Binary"`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WireAttribute {
    pub data_type: String,
    pub value: String,
}

impl WireAttribute {
    pub fn string(value: impl Into<String>) -> Self {
        Self { data_type: "String".to_string(), value: value.into() }
    }

    pub fn binary(encoded: impl Into<String>) -> Self {
        Self { data_type: "Binary".to_string(), value: encoded.into() }
    }
}

pub type WireAttributeMap = HashMap<String, WireAttribute>;

/// Message handed to the transport for dispatch.
/// `group_id` and `dedup_id` are only meaningful for ordered destinations.
#[derive(Debug, Clone)]
pub struct OutgoingMessage {
    pub body: Bytes,
    pub attributes: WireAttributeMap,
    pub group_id: Option<String>,
    pub dedup_id: Option<String>,
}

/// Message as delivered from a queue.
///
/// `receipt_handle` is a one-time token: it authorizes acknowledgment of
/// this delivery instance only until it is used or the visibility timeout
/// elapses. `body_md5` is the transport-computed content digest of `body`.
#[derive(Debug, Clone)]
pub struct ReceivedMessage {
    pub id: String,
    pub receipt_handle: String,
    pub body: Bytes,
    pub body_md5: String,
    pub attributes: HashMap<String, String>,
    pub message_attributes: WireAttributeMap,
}

/// Receive-side tuning for a single poll call.
#[derive(Debug, Clone)]
pub struct ReceiveOptions {
    /// Messages per receive call, clamped to [`MAX_RECEIVE_BATCH`]
    pub max_messages: usize,
    /// How long a delivered message stays hidden from other receivers
    pub visibility_timeout: Duration,
    /// Long-poll bound; a receive call never blocks longer than this
    pub wait_time: Duration,
    /// Which transport attributes to return ("All" or named keys)
    pub attribute_names: Vec<String>,
    /// Which message attributes to return ("All" or named keys)
    pub message_attribute_names: Vec<String>,
}

impl Default for ReceiveOptions {
    fn default() -> Self {
        Self {
            max_messages: MAX_RECEIVE_BATCH,
            visibility_timeout: Duration::from_secs(15),
            wait_time: Duration::from_secs(20),
            attribute_names: vec![ATTRIBUTES_ALL.to_string()],
            message_attribute_names: vec![ATTRIBUTES_ALL.to_string()],
        }
    }
}

impl ReceiveOptions {
    pub fn effective_max_messages(&self) -> usize {
        self.max_messages.min(MAX_RECEIVE_BATCH).max(1)
    }

    pub fn effective_wait_time(&self) -> Duration {
        self.wait_time.min(MAX_WAIT_TIME)
    }
}

/// Apply an attribute-name filter ("All" or an explicit key list).
pub(crate) fn filter_attributes<V: Clone>(
    source: &HashMap<String, V>,
    names: &[String],
) -> HashMap<String, V> {
    if names.iter().any(|n| n == ATTRIBUTES_ALL) {
        source.clone()
    } else {
        source
            .iter()
            .filter(|(k, _)| names.contains(k))
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect()
    }
}

/// Messaging backend boundary: topic fan-out plus queue point-to-point
/// delivery with visibility timeouts and explicit acknowledgment.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Create (or return the existing) topic
    async fn create_topic(
        &self,
        name: &str,
        mode: DeliveryMode,
    ) -> Result<TopicHandle, TransportError>;

    /// Publish to a topic, returning the transport-assigned message id
    async fn publish(
        &self,
        topic_arn: &str,
        message: OutgoingMessage,
    ) -> Result<String, TransportError>;

    /// Create (or return the existing) queue
    async fn create_queue(
        &self,
        name: &str,
        mode: DeliveryMode,
    ) -> Result<QueueHandle, TransportError>;

    /// One receive call; an empty result is a normal outcome, not an error
    async fn receive(
        &self,
        queue_url: &str,
        options: &ReceiveOptions,
    ) -> Result<Vec<ReceivedMessage>, TransportError>;

    /// Acknowledge (delete) one delivery by its receipt handle
    async fn delete(&self, queue_url: &str, receipt_handle: &str) -> Result<(), TransportError>;

    /// Bind a queue to a topic with raw delivery (the queue receives the
    /// original message body, not a notification envelope)
    async fn subscribe(&self, topic_arn: &str, queue_arn: &str)
        -> Result<String, TransportError>;
}
