use crate::error::StorageError;
use crate::shortcode::ShortCode;
use async_trait::async_trait;
use jiff::Timestamp;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Result type for repository and key pool operations.
pub type Result<T> = std::result::Result<T, StorageError>;

/// A stored URL record in the repository.
///
/// Every field is immutable once the record has been inserted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UrlRecord {
    /// The short code the record is bound to.
    pub short_code: ShortCode,
    /// The original URL that was shortened.
    pub long_url: String,
    /// The owner of the record, if the creator was identified.
    pub owner_id: Option<String>,
    /// When the record was inserted.
    pub created_at: Timestamp,
}

impl UrlRecord {
    /// Creates a record stamped with the current time.
    pub fn new(short_code: ShortCode, long_url: impl Into<String>, owner_id: Option<String>) -> Self {
        Self {
            short_code,
            long_url: long_url.into(),
            owner_id,
            created_at: Timestamp::now(),
        }
    }
}

/// The durable source of truth for URL records.
#[async_trait]
pub trait Repository: Send + Sync + 'static {
    /// Inserts a new URL record if its short code is free.
    ///
    /// Returns `Err(StorageError::Conflict)` if the code is already bound; in
    /// that case no row is created or modified.
    async fn insert(&self, record: &UrlRecord) -> Result<ShortCode>;

    /// Retrieves the URL record for a given short code.
    /// Returns `None` if the code does not exist.
    async fn get(&self, code: &ShortCode) -> Result<Option<UrlRecord>>;

    /// Releases the connections held by the repository.
    async fn close(&self) {}
}

/// A reserve of pre-generated short codes.
///
/// Entries are created in bulk ahead of traffic, claimed exactly once and
/// never deleted.
#[async_trait]
pub trait KeyPool: Send + Sync + 'static {
    /// Atomically claims one unclaimed code and marks it claimed.
    ///
    /// Concurrent claimants never receive the same code. Returns `None` when
    /// the pool has no unclaimed entry left.
    async fn claim(&self) -> Result<Option<ShortCode>>;

    /// Adds codes to the pool, skipping any that already exist.
    ///
    /// Returns the number of entries actually added.
    async fn seed(&self, codes: &[ShortCode]) -> Result<u64>;

    /// Counts the entries that are still unclaimed.
    async fn remaining(&self) -> Result<u64>;

    /// Releases the connections held by the pool.
    async fn close(&self) {}
}

#[async_trait]
impl<T: Repository + ?Sized> Repository for Arc<T> {
    async fn insert(&self, record: &UrlRecord) -> Result<ShortCode> {
        (**self).insert(record).await
    }

    async fn get(&self, code: &ShortCode) -> Result<Option<UrlRecord>> {
        (**self).get(code).await
    }

    async fn close(&self) {
        (**self).close().await
    }
}

#[async_trait]
impl<T: KeyPool + ?Sized> KeyPool for Arc<T> {
    async fn claim(&self) -> Result<Option<ShortCode>> {
        (**self).claim().await
    }

    async fn seed(&self, codes: &[ShortCode]) -> Result<u64> {
        (**self).seed(codes).await
    }

    async fn remaining(&self) -> Result<u64> {
        (**self).remaining().await
    }

    async fn close(&self) {
        (**self).close().await
    }
}
