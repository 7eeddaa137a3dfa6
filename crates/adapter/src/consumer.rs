//! Consumer loop: poll, verify, resolve offload, handle, acknowledge.
//!
//! Redelivery is entirely driven by the transport's visibility timeout:
//! this loop performs no internal retry or backoff. A message is deleted
//! from the queue only after the handler reports it processed.

use std::sync::Arc;

use async_trait::async_trait;

use pubsub_middleware::{integrity, Cache, CacheError, ReceiveOptions, ReceivedMessage, Transport};

use crate::offload::RESERVED_OFFLOAD_KEY;
use crate::Result;

/// Typed handler outcome. `Complete` acknowledges the message; `Retry`
/// leaves it for redelivery after the visibility timeout.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Disposition {
    Complete,
    Retry,
}

/// Caller-supplied per-message business logic. Opaque to the loop beyond
/// the returned disposition.
#[async_trait]
pub trait MessageHandler: Send + Sync {
    async fn handle(&self, message: &ReceivedMessage) -> Disposition;
}

pub struct Consumer {
    transport: Arc<dyn Transport>,
    cache: Arc<dyn Cache>,
}

impl Consumer {
    pub fn new(transport: Arc<dyn Transport>, cache: Arc<dyn Cache>) -> Self {
        Self { transport, cache }
    }

    /// One poll: a single receive call, then per message in receipt order
    /// verify integrity, resolve any offloaded body and invoke the handler,
    /// deleting only on [`Disposition::Complete`]. An empty receive is a
    /// normal outcome. Skipped messages (corruption, unresolvable offload,
    /// `Retry`) stay invisible until their timeout and are then redelivered.
    ///
    /// Returns the received batch as delivered by the transport.
    pub async fn poll(
        &self,
        queue_url: &str,
        handler: &dyn MessageHandler,
        options: &ReceiveOptions,
    ) -> Result<Vec<ReceivedMessage>> {
        let batch = self.transport.receive(queue_url, options).await.map_err(|e| {
            tracing::error!(queue = %queue_url, error = %e, "receive failed");
            e
        })?;

        if batch.is_empty() {
            tracing::debug!(queue = %queue_url, "no messages received");
            return Ok(batch);
        }

        for message in &batch {
            if let Err(e) = integrity::verify(message) {
                tracing::warn!(
                    queue = %queue_url,
                    message_id = %message.id,
                    error = %e,
                    "integrity check failed, leaving message for redelivery"
                );
                continue;
            }

            let resolved = match self.resolve_offload(message).await {
                Ok(resolved) => resolved,
                Err(e) => {
                    tracing::warn!(
                        queue = %queue_url,
                        message_id = %message.id,
                        error = %e,
                        "couldn't resolve offloaded body, leaving message for redelivery"
                    );
                    continue;
                }
            };

            match handler.handle(&resolved).await {
                Disposition::Complete => {
                    self.transport
                        .delete(queue_url, &message.receipt_handle)
                        .await
                        .map_err(|e| {
                            tracing::error!(
                                queue = %queue_url,
                                message_id = %message.id,
                                error = %e,
                                "delete failed"
                            );
                            e
                        })?;
                    tracing::debug!(queue = %queue_url, message_id = %message.id, "acknowledged");
                }
                Disposition::Retry => {
                    tracing::debug!(
                        queue = %queue_url,
                        message_id = %message.id,
                        "handler deferred, leaving message for redelivery"
                    );
                }
            }
        }

        Ok(batch)
    }

    /// Swap in the cached body when the message carries an offload
    /// reference. The record is not deleted here; cleanup is the caller's
    /// policy (it expires at TTL otherwise).
    async fn resolve_offload(&self, message: &ReceivedMessage) -> Result<ReceivedMessage> {
        let Some(reference) = message.message_attributes.get(RESERVED_OFFLOAD_KEY) else {
            return Ok(message.clone());
        };
        let key = reference.value.as_str();
        match self.cache.get(key).await? {
            Some(body) => {
                let mut resolved = message.clone();
                resolved.body = body;
                Ok(resolved)
            }
            None => Err(CacheError::OperationFailed(format!(
                "offload record {} missing or expired",
                key
            ))
            .into()),
        }
    }
}
