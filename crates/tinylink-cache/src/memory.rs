use async_trait::async_trait;
use moka::future::Cache;
use moka::policy::Expiry;
use std::time::{Duration, Instant};
use tinylink_core::ShortCode;
use tracing::{debug, trace};

use crate::{Result, UrlCache};

#[derive(Debug, Clone)]
struct CachedUrl {
    long_url: String,
    ttl: Duration,
}

/// Expires each entry after the TTL it was written with.
struct PerEntryTtl;

impl Expiry<ShortCode, CachedUrl> for PerEntryTtl {
    fn expire_after_create(
        &self,
        _key: &ShortCode,
        value: &CachedUrl,
        _created_at: Instant,
    ) -> Option<Duration> {
        Some(value.ttl)
    }

    fn expire_after_update(
        &self,
        _key: &ShortCode,
        value: &CachedUrl,
        _updated_at: Instant,
        _duration_until_expiry: Option<Duration>,
    ) -> Option<Duration> {
        Some(value.ttl)
    }
}

/// An in-process [`UrlCache`] backed by moka.
///
/// Entries expire after the TTL passed to `set_url` and may be evicted
/// earlier once `max_capacity` is reached.
#[derive(Clone)]
pub struct MokaUrlCache {
    inner: Cache<ShortCode, CachedUrl>,
}

impl MokaUrlCache {
    pub fn with_capacity(max_capacity: u64) -> Self {
        let inner = Cache::builder()
            .max_capacity(max_capacity)
            .expire_after(PerEntryTtl)
            .build();
        debug!(max_capacity, "moka url cache initialized");
        Self { inner }
    }

    /// Number of live entries, after pending maintenance has run.
    pub async fn entry_count(&self) -> u64 {
        self.inner.run_pending_tasks().await;
        self.inner.entry_count()
    }
}

impl Default for MokaUrlCache {
    fn default() -> Self {
        Self::with_capacity(10_000)
    }
}

impl std::fmt::Debug for MokaUrlCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MokaUrlCache")
            .field("entry_count", &self.inner.entry_count())
            .finish()
    }
}

#[async_trait]
impl UrlCache for MokaUrlCache {
    async fn get_url(&self, code: &ShortCode) -> Result<Option<String>> {
        let hit = self.inner.get(code).await.map(|cached| cached.long_url);
        trace!(code = %code, hit = hit.is_some(), "moka lookup");
        Ok(hit)
    }

    async fn set_url(&self, code: &ShortCode, long_url: &str, ttl: Duration) -> Result<()> {
        self.inner
            .insert(
                code.clone(),
                CachedUrl {
                    long_url: long_url.to_owned(),
                    ttl,
                },
            )
            .await;
        Ok(())
    }

    async fn del(&self, code: &ShortCode) -> Result<()> {
        self.inner.invalidate(code).await;
        Ok(())
    }

    async fn close(&self) {
        self.inner.invalidate_all();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::DEFAULT_CACHE_TTL;

    fn code(s: &str) -> ShortCode {
        ShortCode::new_unchecked(s)
    }

    #[tokio::test]
    async fn set_then_get() {
        let cache = MokaUrlCache::default();
        cache
            .set_url(&code("AbC1234"), "https://example.com", DEFAULT_CACHE_TTL)
            .await
            .unwrap();

        assert_eq!(
            cache.get_url(&code("AbC1234")).await.unwrap().as_deref(),
            Some("https://example.com")
        );
        assert_eq!(cache.get_url(&code("missing")).await.unwrap(), None);
    }

    #[tokio::test]
    async fn del_removes_entry() {
        let cache = MokaUrlCache::default();
        cache
            .set_url(&code("AbC1234"), "https://example.com", DEFAULT_CACHE_TTL)
            .await
            .unwrap();
        cache.del(&code("AbC1234")).await.unwrap();
        cache.del(&code("never-set")).await.unwrap();

        assert_eq!(cache.get_url(&code("AbC1234")).await.unwrap(), None);
    }

    #[tokio::test]
    async fn entries_expire_after_their_own_ttl() {
        let cache = MokaUrlCache::default();
        cache
            .set_url(&code("short"), "https://short.example", Duration::from_millis(50))
            .await
            .unwrap();
        cache
            .set_url(&code("long"), "https://long.example", DEFAULT_CACHE_TTL)
            .await
            .unwrap();

        tokio::time::sleep(Duration::from_millis(200)).await;

        assert_eq!(cache.get_url(&code("short")).await.unwrap(), None);
        assert_eq!(
            cache.get_url(&code("long")).await.unwrap().as_deref(),
            Some("https://long.example")
        );
    }

    #[tokio::test]
    async fn close_drops_all_entries() {
        let cache = MokaUrlCache::default();
        cache
            .set_url(&code("AbC1234"), "https://example.com", DEFAULT_CACHE_TTL)
            .await
            .unwrap();
        cache.close().await;

        assert_eq!(cache.get_url(&code("AbC1234")).await.unwrap(), None);
    }
}
