pub mod cache;
pub mod config;
pub mod database;
pub mod kafka_producer;
pub mod logging;
pub mod oauth;
pub mod rate_limiter;
pub mod token_codec;

pub use cache::{CacheStore, InMemoryCacheStore, RedisCacheStore};
pub use config::Config;
pub use kafka_producer::{EventPublisher, KafkaEventPublisher, NoopEventPublisher};
pub use oauth::{OAuthClient, StubOAuthClient};
pub use rate_limiter::{FixedWindowRateLimiter, RateLimiter};
pub use token_codec::JwtTokenCodec;
