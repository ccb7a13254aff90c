use async_trait::async_trait;
use redis::aio::ConnectionManager;
use redis::AsyncCommands;
use std::future::Future;
use std::time::Duration;
use tinylink_core::{CacheError, ShortCode};
use tracing::{debug, trace, warn};
use typed_builder::TypedBuilder;

use crate::{ttl_seconds, Result, UrlCache, DEFAULT_KEY_PREFIX};

/// Connection settings for a single Redis node.
#[derive(Debug, Clone, TypedBuilder)]
pub struct RedisCacheConfig {
    /// e.g. `redis://127.0.0.1:6379`
    #[builder(setter(into))]
    pub url: String,
    #[builder(default = DEFAULT_KEY_PREFIX.to_string(), setter(into))]
    pub key_prefix: String,
    #[builder(default = Duration::from_secs(5))]
    pub connect_timeout: Duration,
    #[builder(default = Duration::from_secs(3))]
    pub command_timeout: Duration,
}

pub(crate) fn map_redis_error(operation: &str, err: redis::RedisError) -> CacheError {
    let message = format!("{operation}: {err}");
    if err.is_timeout() {
        return CacheError::Timeout(message);
    }
    if err.is_connection_dropped() || err.is_connection_refusal() || err.is_io_error() {
        return CacheError::Unavailable(message);
    }

    let lowered = message.to_ascii_lowercase();
    if lowered.contains("timed out") {
        CacheError::Timeout(message)
    } else if lowered.contains("connection refused")
        || lowered.contains("broken pipe")
        || lowered.contains("connection reset")
        || lowered.contains("connection closed")
    {
        CacheError::Unavailable(message)
    } else {
        CacheError::Operation(message)
    }
}

/// Runs a Redis call under `limit`, mapping both failure kinds to [`CacheError`].
pub(crate) async fn bounded<T, F>(limit: Duration, operation: &str, fut: F) -> Result<T>
where
    F: Future<Output = redis::RedisResult<T>>,
{
    match tokio::time::timeout(limit, fut).await {
        Ok(result) => result.map_err(|e| map_redis_error(operation, e)),
        Err(_) => Err(CacheError::Timeout(format!(
            "{operation}: no reply within {}ms",
            limit.as_millis()
        ))),
    }
}

/// Opens a managed connection to `url` within `connect_timeout`.
///
/// The manager re-establishes a dropped socket on its own with exponential
/// backoff; calls issued while it is down fail and are retried on the next
/// request.
pub(crate) async fn open_connection(
    url: &str,
    connect_timeout: Duration,
) -> Result<ConnectionManager> {
    let client = redis::Client::open(url)
        .map_err(|e| CacheError::Initialization(format!("invalid redis url '{url}': {e}")))?;
    bounded(
        connect_timeout,
        "failed to connect to Redis",
        client.get_connection_manager(),
    )
    .await
}

/// A single-node Redis implementation of [`UrlCache`].
///
/// Values are stored as plain strings under `{key_prefix}{code}` with a
/// per-entry `SETEX` expiry.
#[derive(Debug, Clone)]
pub struct RedisUrlCache {
    conn: ConnectionManager,
    key_prefix: String,
    command_timeout: Duration,
}

impl RedisUrlCache {
    /// Creates a new Redis URL cache over an established connection.
    pub fn new(conn: ConnectionManager) -> Self {
        Self {
            conn,
            key_prefix: DEFAULT_KEY_PREFIX.to_string(),
            command_timeout: Duration::from_secs(3),
        }
    }

    /// Creates a new Redis URL cache with a custom key prefix.
    ///
    /// # Arguments
    ///
    /// * `conn` - A managed Redis connection
    /// * `key_prefix` - Custom prefix for cache keys (e.g., "myapp:url:")
    pub fn with_prefix(
        conn: ConnectionManager,
        key_prefix: impl Into<String>,
    ) -> Self {
        Self {
            key_prefix: key_prefix.into(),
            ..Self::new(conn)
        }
    }

    /// Connects to the node described by `config`.
    pub async fn connect(config: &RedisCacheConfig) -> Result<Self> {
        let conn = open_connection(&config.url, config.connect_timeout).await?;
        debug!(url = %config.url, "connected to redis");
        Ok(Self {
            conn,
            key_prefix: config.key_prefix.clone(),
            command_timeout: config.command_timeout,
        })
    }

    /// Generates the cache key for a short code.
    fn cache_key(&self, code: &ShortCode) -> String {
        format!("{}{}", self.key_prefix, code.as_str())
    }
}

#[async_trait]
impl UrlCache for RedisUrlCache {
    async fn get_url(&self, code: &ShortCode) -> Result<Option<String>> {
        let key = self.cache_key(code);
        trace!(code = %code, "Fetching URL from Redis cache");

        let mut conn = self.conn.clone();
        let result = bounded(
            self.command_timeout,
            "failed to fetch value from Redis",
            conn.get::<_, Option<String>>(&key),
        )
        .await;

        match result {
            Ok(Some(long_url)) => {
                debug!(code = %code, "Cache hit in Redis");
                Ok(Some(long_url))
            }
            Ok(None) => {
                trace!(code = %code, "Cache miss in Redis");
                Ok(None)
            }
            Err(e) => {
                warn!(code = %code, error = %e, "Redis error on get");
                Err(e)
            }
        }
    }

    async fn set_url(&self, code: &ShortCode, long_url: &str, ttl: Duration) -> Result<()> {
        let key = self.cache_key(code);
        trace!(code = %code, "Storing URL in Redis cache");

        let mut conn = self.conn.clone();
        bounded(
            self.command_timeout,
            "failed to write value to Redis",
            conn.set_ex::<_, _, ()>(&key, long_url, ttl_seconds(ttl)),
        )
        .await
        .inspect(|()| debug!(code = %code, "Cached URL in Redis"))
        .inspect_err(|e| warn!(code = %code, error = %e, "Failed to cache URL in Redis"))
    }

    async fn del(&self, code: &ShortCode) -> Result<()> {
        let key = self.cache_key(code);
        trace!(code = %code, "Removing URL from Redis cache");

        let mut conn = self.conn.clone();
        bounded(
            self.command_timeout,
            "failed to delete value from Redis",
            conn.del::<_, ()>(&key),
        )
        .await
        .inspect_err(|e| warn!(code = %code, error = %e, "Failed to remove URL from Redis"))
    }
}
