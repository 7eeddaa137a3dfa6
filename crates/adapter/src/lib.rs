//! pubsub-adapter: one API over topic fan-out and queue point-to-point
//! messaging, with transparent offload of oversized payloads to a cache
//! tier.
//!
//! The adapter is three cooperating pieces:
//! - [`publisher::Publisher`] decides inline vs. offloaded delivery, binds
//!   typed attributes and dispatches to standard or ordered destinations;
//! - [`consumer::Consumer`] polls a queue, verifies body integrity,
//!   resolves offloaded payloads and acknowledges only what the handler
//!   reports as processed;
//! - [`admin::Admin`] wraps destination creation and subscription wiring,
//!   enforcing the ordered-mode naming convention.
//!
//! Transport and cache backends are injected at construction; see
//! `pubsub-middleware` for the trait boundaries and the in-memory, NATS
//! and Redis implementations.

pub mod admin;
pub mod attributes;
pub mod config;
pub mod consumer;
pub mod error;
pub mod offload;
pub mod publisher;

pub use error::Error;
pub type Result<T> = std::result::Result<T, Error>;
