//! Offload policy for oversized message bodies.
//!
//! Bodies above the threshold never travel inline: the publisher stores
//! them in the cache tier under a fresh key, sends the key as the body
//! placeholder and references it from the reserved attribute so consumers
//! can resolve the original payload.

use std::time::Duration;

/// Bodies strictly larger than this are offloaded (exactly this size
/// stays inline). Fixed policy, not caller-tunable.
pub const OFFLOAD_THRESHOLD_BYTES: usize = 200 * 1024;

/// Offload records live 10 days; unread records expire on their own
pub const OFFLOAD_TTL_MINUTES: u64 = 10 * 24 * 60;

/// Reserved attribute key carrying the offload cache key
pub const RESERVED_OFFLOAD_KEY: &str = "redis_key";

/// True when a body exceeds the inline threshold and must be offloaded.
pub fn is_large(body: &[u8]) -> bool {
    body.len() > OFFLOAD_THRESHOLD_BYTES
}

/// TTL applied to offload records.
pub fn offload_ttl() -> Duration {
    Duration::from_secs(OFFLOAD_TTL_MINUTES * 60)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_threshold_is_exclusive() {
        let at_limit = vec![0u8; OFFLOAD_THRESHOLD_BYTES];
        let over_limit = vec![0u8; OFFLOAD_THRESHOLD_BYTES + 1];
        assert!(!is_large(&at_limit));
        assert!(is_large(&over_limit));
    }

    #[test]
    fn test_ttl_is_ten_days() {
        assert_eq!(OFFLOAD_TTL_MINUTES, 14_400);
        assert_eq!(offload_ttl(), Duration::from_secs(864_000));
    }
}
