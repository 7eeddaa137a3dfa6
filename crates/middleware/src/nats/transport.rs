use std::collections::HashMap;

use async_nats::jetstream::consumer::pull;
use async_nats::jetstream::stream::{Config, RetentionPolicy, Source, StorageType};
use async_nats::jetstream::{self, Context};
use async_nats::Client;
use async_trait::async_trait;
use bytes::Bytes;
use futures_util::StreamExt;

use crate::error::TransportError;
use crate::integrity::body_digest;
use crate::transport::{
    filter_attributes, DeliveryMode, OutgoingMessage, QueueHandle, ReceiveOptions,
    ReceivedMessage, TopicHandle, Transport, WireAttribute, WireAttributeMap,
};

/// Header carrying the publisher-computed body digest
const HDR_BODY_MD5: &str = "Ps-Body-Md5";
/// Header carrying the ordering group id
const HDR_GROUP_ID: &str = "Ps-Group-Id";
/// JetStream's native dedup header; carries the deduplication id
const HDR_DEDUP_ID: &str = "Nats-Msg-Id";
/// Prefix for typed message attributes carried as headers
const HDR_ATTR_PREFIX: &str = "Ps-Attr-";

/// Durable pull consumer shared by all receivers of a queue
const DURABLE_NAME: &str = "pubsub";

fn sanitize(name: &str) -> String {
    name.chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
        .collect()
}

fn topic_stream_name(name: &str) -> String {
    format!("TOPIC_{}", sanitize(name).to_uppercase())
}

fn queue_stream_name(name: &str) -> String {
    format!("QUEUE_{}", sanitize(name).to_uppercase())
}

fn topic_subject(name: &str) -> String {
    format!("topic.{}", name)
}

fn queue_arn(name: &str) -> String {
    format!("queue.{}", name)
}

fn encode_attribute(attr: &WireAttribute) -> String {
    format!("{}:{}", attr.data_type, attr.value)
}

fn parse_attribute(raw: &str) -> Option<WireAttribute> {
    raw.split_once(':').map(|(data_type, value)| WireAttribute {
        data_type: data_type.to_string(),
        value: value.to_string(),
    })
}

/// JetStream-backed transport.
///
/// Mapping: a topic is a stream capturing its `topic.{name}` subject; a
/// queue is a work-queue stream that *sources* the topic streams it is
/// subscribed to (raw delivery, no envelope). A receive call is a pull
/// fetch whose `ack_wait` plays the visibility timeout; the per-delivery
/// ack reply subject is the receipt handle, and `delete` acknowledges by
/// publishing to it. Deduplication rides JetStream's `Nats-Msg-Id` window.
///
/// The durable consumer is created on first receive; the visibility
/// timeout is fixed for the queue at that point.
pub struct NatsTransport {
    client: Client,
    jetstream: Context,
}

impl NatsTransport {
    /// Create a new NatsTransport from an existing client
    pub fn new(client: Client) -> Self {
        let jetstream = jetstream::new(client.clone());
        Self { client, jetstream }
    }

    /// Connect to a NATS server and create the transport
    pub async fn connect(url: &str) -> Result<Self, TransportError> {
        let client = async_nats::connect(url)
            .await
            .map_err(|e| TransportError::ConnectionFailed(e.to_string()))?;
        tracing::info!(url = %url, "Connected to NATS");
        Ok(Self::new(client))
    }
}

#[async_trait]
impl Transport for NatsTransport {
    async fn create_topic(
        &self,
        name: &str,
        _mode: DeliveryMode,
    ) -> Result<TopicHandle, TransportError> {
        let config = Config {
            name: topic_stream_name(name),
            subjects: vec![topic_subject(name)],
            retention: RetentionPolicy::Limits,
            storage: StorageType::File,
            ..Default::default()
        };
        self.jetstream
            .get_or_create_stream(config)
            .await
            .map_err(|e| TransportError::CreateFailed(format!("topic {}: {}", name, e)))?;
        Ok(TopicHandle { name: name.to_string(), arn: topic_subject(name) })
    }

    async fn publish(
        &self,
        topic_arn: &str,
        message: OutgoingMessage,
    ) -> Result<String, TransportError> {
        let mut headers = async_nats::HeaderMap::new();
        let digest = body_digest(&message.body);
        headers.insert(HDR_BODY_MD5, digest.as_str());
        for (key, attr) in &message.attributes {
            let name = format!("{}{}", HDR_ATTR_PREFIX, key);
            let value = encode_attribute(attr);
            headers.insert(name.as_str(), value.as_str());
        }
        if let Some(group_id) = &message.group_id {
            headers.insert(HDR_GROUP_ID, group_id.as_str());
        }
        if let Some(dedup_id) = &message.dedup_id {
            headers.insert(HDR_DEDUP_ID, dedup_id.as_str());
        }

        let ack = self
            .jetstream
            .publish_with_headers(topic_arn.to_string(), headers, message.body)
            .await
            .map_err(|e| TransportError::PublishFailed(e.to_string()))?
            .await
            .map_err(|e| TransportError::PublishFailed(e.to_string()))?;

        Ok(format!("{}:{}", ack.stream, ack.sequence))
    }

    async fn create_queue(
        &self,
        name: &str,
        _mode: DeliveryMode,
    ) -> Result<QueueHandle, TransportError> {
        let stream_name = queue_stream_name(name);
        let config = Config {
            name: stream_name.clone(),
            subjects: Vec::new(),
            retention: RetentionPolicy::WorkQueue,
            storage: StorageType::File,
            ..Default::default()
        };
        self.jetstream
            .get_or_create_stream(config)
            .await
            .map_err(|e| TransportError::CreateFailed(format!("queue {}: {}", name, e)))?;
        Ok(QueueHandle {
            name: name.to_string(),
            url: stream_name,
            arn: queue_arn(name),
        })
    }

    async fn receive(
        &self,
        queue_url: &str,
        options: &ReceiveOptions,
    ) -> Result<Vec<ReceivedMessage>, TransportError> {
        let stream = self
            .jetstream
            .get_stream(queue_url)
            .await
            .map_err(|e| TransportError::ReceiveFailed(format!("{}: {}", queue_url, e)))?;

        let consumer = stream
            .get_or_create_consumer(
                DURABLE_NAME,
                pull::Config {
                    durable_name: Some(DURABLE_NAME.to_string()),
                    ack_wait: options.visibility_timeout,
                    ..Default::default()
                },
            )
            .await
            .map_err(|e| TransportError::ReceiveFailed(e.to_string()))?;

        let mut messages = consumer
            .fetch()
            .max_messages(options.effective_max_messages())
            .expires(options.effective_wait_time())
            .messages()
            .await
            .map_err(|e| TransportError::ReceiveFailed(e.to_string()))?;

        let mut batch = Vec::new();
        while let Some(message) = messages.next().await {
            let message = message.map_err(|e| TransportError::ReceiveFailed(e.to_string()))?;
            let info = message
                .info()
                .map_err(|e| TransportError::ReceiveFailed(e.to_string()))?;
            let id = format!("{}:{}", queue_url, info.stream_sequence);
            let receipt_handle = message
                .message
                .reply
                .as_ref()
                .map(|subject| subject.to_string())
                .ok_or_else(|| {
                    TransportError::ReceiveFailed("delivery without ack subject".to_string())
                })?;

            let mut attributes = HashMap::new();
            let mut message_attributes = WireAttributeMap::new();
            let mut body_md5 = String::new();
            if let Some(headers) = &message.message.headers {
                for (name, values) in headers.iter() {
                    let Some(value) = values.first() else { continue };
                    let name = name.to_string();
                    let value = value.to_string();
                    if name == HDR_BODY_MD5 {
                        body_md5 = value;
                    } else if name == HDR_GROUP_ID {
                        attributes.insert("MessageGroupId".to_string(), value);
                    } else if let Some(key) = name.strip_prefix(HDR_ATTR_PREFIX) {
                        if let Some(attr) = parse_attribute(&value) {
                            message_attributes.insert(key.to_string(), attr);
                        }
                    }
                }
            }
            if body_md5.is_empty() {
                // Publisher did not stamp a digest; compute one so the
                // consumer-side verification still holds
                body_md5 = body_digest(&message.message.payload);
            }

            batch.push(ReceivedMessage {
                id,
                receipt_handle,
                body: message.message.payload.clone(),
                body_md5,
                attributes: filter_attributes(&attributes, &options.attribute_names),
                message_attributes: filter_attributes(
                    &message_attributes,
                    &options.message_attribute_names,
                ),
            });
        }

        Ok(batch)
    }

    async fn delete(&self, _queue_url: &str, receipt_handle: &str) -> Result<(), TransportError> {
        self.client
            .publish(receipt_handle.to_string(), Bytes::from_static(b"+ACK"))
            .await
            .map_err(|e| TransportError::DeleteFailed(e.to_string()))
    }

    async fn subscribe(
        &self,
        topic_arn: &str,
        queue_arn: &str,
    ) -> Result<String, TransportError> {
        let topic_name = topic_arn.strip_prefix("topic.").ok_or_else(|| {
            TransportError::SubscribeFailed(format!("not a topic arn: {}", topic_arn))
        })?;
        let queue_name = queue_arn.strip_prefix("queue.").ok_or_else(|| {
            TransportError::SubscribeFailed(format!("not a queue arn: {}", queue_arn))
        })?;

        let mut stream = self
            .jetstream
            .get_stream(queue_stream_name(queue_name))
            .await
            .map_err(|e| TransportError::SubscribeFailed(e.to_string()))?;
        let info = stream
            .info()
            .await
            .map_err(|e| TransportError::SubscribeFailed(e.to_string()))?;

        let mut config = info.config.clone();
        let source_name = topic_stream_name(topic_name);
        let mut sources = config.sources.take().unwrap_or_default();
        if !sources.iter().any(|s| s.name == source_name) {
            sources.push(Source { name: source_name, ..Default::default() });
        }
        config.sources = Some(sources);

        self.jetstream
            .update_stream(&config)
            .await
            .map_err(|e| TransportError::SubscribeFailed(e.to_string()))?;

        Ok(format!("{}->{}", topic_arn, queue_arn))
    }
}
