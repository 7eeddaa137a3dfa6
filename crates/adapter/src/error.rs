use thiserror::Error;

use pubsub_codec::CodecError;
use pubsub_middleware::{CacheError, IntegrityError, TransportError};

#[derive(Error, Debug)]
pub enum Error {
    /// Invalid naming/mode combination; the caller must fix and retry
    #[error("configuration error: {0}")]
    Configuration(String),

    /// Bad attribute input; the caller must fix and retry
    #[error("attribute validation failed: {0}")]
    Validation(String),

    #[error("transport error: {0}")]
    Transport(#[from] TransportError),

    #[error("cache error: {0}")]
    Cache(#[from] CacheError),

    #[error("integrity error: {0}")]
    Integrity(#[from] IntegrityError),

    #[error("codec error: {0}")]
    Codec(#[from] CodecError),

    #[error("publish failed: {0}")]
    Publish(String),
}
