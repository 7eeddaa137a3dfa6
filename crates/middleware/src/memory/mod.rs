//! In-memory implementations for testing
pub mod cache;
pub mod transport;

pub use cache::InMemoryCache;
pub use transport::InMemoryTransport;
