use crate::config::ServiceConfig;
use async_trait::async_trait;
use tinylink_core::{
    Allocation, KeyAllocator, NewUrl, Repository, ShortCode, ShortUrl, Shortener, ShortenerError,
    UrlCache, UrlRecord,
};
use tracing::{debug, info, trace, warn};

/// Creates and resolves short URLs over a store, an allocator and a cache.
///
/// - **create**: validate, allocate a code, persist the record unless the
///   allocator already did, then write the cache entry.
/// - **resolve**: read the cache; on a miss (or any cache failure) read the
///   store and repopulate the cache.
///
/// Cache writes are best effort and cache errors are logged and dropped.
/// Store errors propagate with their kind preserved.
#[derive(Debug, Clone)]
pub struct ResolutionService<R, A, C> {
    repository: R,
    allocator: A,
    cache: C,
    config: ServiceConfig,
}

impl<R, A, C> ResolutionService<R, A, C>
where
    R: Repository,
    A: KeyAllocator,
    C: UrlCache,
{
    pub fn new(repository: R, allocator: A, cache: C, config: ServiceConfig) -> Self {
        Self {
            repository,
            allocator,
            cache,
            config,
        }
    }

    pub fn config(&self) -> &ServiceConfig {
        &self.config
    }

    /// Closes the store and cache connections.
    pub async fn close(&self) {
        self.cache.close().await;
        self.repository.close().await;
        info!("resolution service closed");
    }

    /// Validates that the URL uses the http or https scheme and names a
    /// location after it.
    fn validate_url(url: &str) -> Result<(), ShortenerError> {
        let rest = url
            .strip_prefix("https://")
            .or_else(|| url.strip_prefix("http://"))
            .ok_or_else(|| {
                ShortenerError::InvalidUrl(format!("URL scheme must be http or https: {url}"))
            })?;

        if rest.is_empty() || rest.chars().any(char::is_whitespace) {
            return Err(ShortenerError::InvalidUrl(format!(
                "URL must have a valid host: {url}"
            )));
        }

        Ok(())
    }

    async fn fill_cache(&self, code: &ShortCode, long_url: &str) {
        if let Err(e) = self
            .cache
            .set_url(code, long_url, self.config.cache_ttl)
            .await
        {
            warn!(code = %code, error = %e, "dropping cache write");
        }
    }
}

#[async_trait]
impl<R, A, C> Shortener for ResolutionService<R, A, C>
where
    R: Repository,
    A: KeyAllocator,
    C: UrlCache,
{
    async fn create(
        &self,
        long_url: &str,
        owner_id: Option<&str>,
    ) -> Result<ShortUrl, ShortenerError> {
        Self::validate_url(long_url)?;

        let url = NewUrl::new(long_url, owner_id.map(str::to_owned));
        let code = match self.allocator.allocate(&url).await? {
            Allocation::Bound(code) => code,
            Allocation::Reserved(code) => {
                let record = UrlRecord::new(code, url.long_url, url.owner_id);
                self.repository.insert(&record).await?
            }
        };

        self.fill_cache(&code, long_url).await;

        let url = code.to_url(&self.config.base_url);
        info!(code = %code, "short url created");
        Ok(ShortUrl { code, url })
    }

    async fn resolve(&self, code: &str) -> Result<String, ShortenerError> {
        let code = ShortCode::new(code)?;

        match self.cache.get_url(&code).await {
            Ok(Some(long_url)) => {
                debug!(code = %code, "resolved from cache");
                return Ok(long_url);
            }
            Ok(None) => trace!(code = %code, "cache miss"),
            Err(e) => warn!(code = %code, error = %e, "cache read failed, falling back to store"),
        }

        let record = self
            .repository
            .get(&code)
            .await?
            .ok_or_else(|| ShortenerError::NotFound(code.to_string()))?;

        self.fill_cache(&code, &record.long_url).await;
        debug!(code = %code, "resolved from store");
        Ok(record.long_url)
    }
}
