use thiserror::Error;

#[derive(Error, Debug)]
pub enum TransportError {
    #[error("connection failed: {0}")]
    ConnectionFailed(String),
    #[error("create failed: {0}")]
    CreateFailed(String),
    #[error("publish failed: {0}")]
    PublishFailed(String),
    #[error("receive failed: {0}")]
    ReceiveFailed(String),
    #[error("delete failed: {0}")]
    DeleteFailed(String),
    #[error("subscribe failed: {0}")]
    SubscribeFailed(String),
    #[error("timeout")]
    Timeout,
}

#[derive(Error, Debug)]
pub enum CacheError {
    #[error("connection failed: {0}")]
    ConnectionFailed(String),
    #[error("operation failed: {0}")]
    OperationFailed(String),
}

/// Body checksum did not match what the transport reported.
/// The message stays unacknowledged and becomes redeliverable once its
/// visibility timeout elapses.
#[derive(Error, Debug)]
#[error("checksum mismatch for message {message_id}: transport reported {reported}, computed {computed}")]
pub struct IntegrityError {
    pub message_id: String,
    pub reported: String,
    pub computed: String,
}
