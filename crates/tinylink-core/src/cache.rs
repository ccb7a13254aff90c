use crate::error::CacheError;
use crate::shortcode::ShortCode;
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;

/// Result type for cache operations.
pub type Result<T> = std::result::Result<T, CacheError>;

/// Default time-to-live of a cached `code -> long URL` entry.
pub const DEFAULT_CACHE_TTL: Duration = Duration::from_secs(3600);

/// A best-effort cache of `short code -> long URL` entries.
///
/// The cache is never authoritative: entries may be missing, evicted early or
/// expire at any time. Implementations can be in-process, a single Redis
/// node, or a partitioned cluster.
#[async_trait]
pub trait UrlCache: Send + Sync + 'static {
    /// Get the long URL cached for a code.
    ///
    /// Returns `Ok(None)` if the key is not in the cache.
    async fn get_url(&self, code: &ShortCode) -> Result<Option<String>>;

    /// Store a long URL for a code, expiring after `ttl`.
    async fn set_url(&self, code: &ShortCode, long_url: &str, ttl: Duration) -> Result<()>;

    /// Remove the entry for a code.
    ///
    /// It is not an error if the key does not exist.
    async fn del(&self, code: &ShortCode) -> Result<()>;

    /// Releases the connections held by the cache.
    async fn close(&self) {}
}

#[async_trait]
impl<T: UrlCache + ?Sized> UrlCache for Arc<T> {
    async fn get_url(&self, code: &ShortCode) -> Result<Option<String>> {
        (**self).get_url(code).await
    }

    async fn set_url(&self, code: &ShortCode, long_url: &str, ttl: Duration) -> Result<()> {
        (**self).set_url(code, long_url, ttl).await
    }

    async fn del(&self, code: &ShortCode) -> Result<()> {
        (**self).del(code).await
    }

    async fn close(&self) {
        (**self).close().await
    }
}
