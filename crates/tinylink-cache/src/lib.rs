//! Cache implementations for the tinylink resolution service.
//!
//! Every backend implements [`UrlCache`]: an in-process [`MokaUrlCache`], a
//! single Redis node ([`RedisUrlCache`]) and a partitioned Redis cluster
//! ([`ClusterUrlCache`]) that follows `MOVED`/`ASK` redirections.

pub mod cluster;
pub mod memory;
pub mod redis;

pub use cluster::{ClusterConfig, ClusterNode, ClusterUrlCache, NodeConnector};
pub use memory::MokaUrlCache;
pub use self::redis::{RedisCacheConfig, RedisUrlCache};

pub use tinylink_core::cache::{Result, UrlCache, DEFAULT_CACHE_TTL};
pub use tinylink_core::CacheError;

/// Default namespace for cache keys.
pub const DEFAULT_KEY_PREFIX: &str = "tl:url:";

/// Whole seconds for a Redis `SETEX`, never below one.
pub(crate) fn ttl_seconds(ttl: std::time::Duration) -> u64 {
    let secs = ttl.as_secs() + u64::from(ttl.subsec_nanos() > 0);
    secs.max(1)
}
