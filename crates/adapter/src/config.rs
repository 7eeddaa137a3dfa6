//! Environment-driven configuration for wiring the live backends.

#[derive(Debug, Clone)]
pub struct Config {
    pub nats_url: String,
    pub redis_url: String,
}

impl Config {
    pub fn from_env() -> Self {
        let nats_url =
            std::env::var("NATS_URL").unwrap_or_else(|_| "nats://localhost:4222".into());

        let redis_url =
            std::env::var("REDIS_URL").unwrap_or_else(|_| "redis://localhost:6379".into());

        Self { nats_url, redis_url }
    }
}
