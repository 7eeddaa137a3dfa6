//! Thin destination-management wrappers over the transport.
//!
//! The only logic here is the ordered-mode naming convention: violations
//! fail with a configuration error before the transport is ever invoked.
//! (One uniform policy for both topics and queues; no silent null
//! results.)

use std::sync::Arc;

use pubsub_middleware::{DeliveryMode, QueueHandle, TopicHandle, Transport, ORDERED_SUFFIX};

use crate::{Error, Result};

pub struct Admin {
    transport: Arc<dyn Transport>,
}

impl Admin {
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        Self { transport }
    }

    fn check_name(name: &str, mode: DeliveryMode) -> Result<()> {
        if mode.matches_name(name) {
            return Ok(());
        }
        let detail = match mode {
            DeliveryMode::Ordered => format!("ordered names must end with {}", ORDERED_SUFFIX),
            DeliveryMode::Standard => {
                format!("standard names must not end with {}", ORDERED_SUFFIX)
            }
        };
        tracing::error!(name = %name, mode = ?mode, "destination name violates naming convention");
        Err(Error::Configuration(format!("invalid name {}: {}", name, detail)))
    }

    pub async fn create_topic(&self, name: &str, mode: DeliveryMode) -> Result<TopicHandle> {
        Self::check_name(name, mode)?;
        let topic = self.transport.create_topic(name, mode).await.map_err(|e| {
            tracing::error!(name = %name, error = %e, "couldn't create topic");
            Error::from(e)
        })?;
        tracing::info!(name = %name, arn = %topic.arn, "created topic");
        Ok(topic)
    }

    pub async fn create_queue(&self, name: &str, mode: DeliveryMode) -> Result<QueueHandle> {
        Self::check_name(name, mode)?;
        let queue = self.transport.create_queue(name, mode).await.map_err(|e| {
            tracing::error!(name = %name, error = %e, "couldn't create queue");
            Error::from(e)
        })?;
        tracing::info!(name = %name, url = %queue.url, "created queue");
        Ok(queue)
    }

    /// Bind a queue to a topic (raw delivery), returning the subscription id.
    pub async fn subscribe(&self, topic: &TopicHandle, queue: &QueueHandle) -> Result<String> {
        let subscription =
            self.transport.subscribe(&topic.arn, &queue.arn).await.map_err(|e| {
                tracing::error!(topic = %topic.arn, queue = %queue.arn, error = %e, "couldn't subscribe");
                Error::from(e)
            })?;
        tracing::info!(topic = %topic.arn, queue = %queue.arn, "subscribed queue to topic");
        Ok(subscription)
    }
}
