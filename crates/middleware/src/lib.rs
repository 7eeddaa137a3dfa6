//! pubsub-middleware: Pluggable messaging abstractions
//!
//! Provides trait-based abstractions for the Transport (topic fan-out and
//! queue delivery) and Cache (payload offload) boundaries, with in-memory
//! implementations for testing and NATS/Redis backends for deployment.

pub mod cache;
pub mod error;
pub mod integrity;
pub mod memory;
pub mod nats;
#[cfg(feature = "redis")]
pub mod redis;
pub mod transport;

pub use cache::Cache;
pub use error::{CacheError, IntegrityError, TransportError};
pub use memory::{InMemoryCache, InMemoryTransport};
pub use nats::NatsTransport;
#[cfg(feature = "redis")]
pub use redis::RedisCache;
pub use transport::{
    DeliveryMode, OutgoingMessage, QueueHandle, ReceiveOptions, ReceivedMessage, TopicHandle,
    Transport, WireAttribute, WireAttributeMap, ORDERED_SUFFIX,
};
