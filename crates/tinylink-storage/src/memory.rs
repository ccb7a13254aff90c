use async_trait::async_trait;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use tinylink_core::repository::{Repository, Result};
use tinylink_core::{ShortCode, StorageError, UrlRecord};

/// In-memory implementation of the Repository trait using DashMap.
///
/// DashMap shards its locks, so concurrent reads and writes to different
/// buckets never block each other. Inserts go through the entry API, which
/// holds the shard lock between the existence check and the write.
#[derive(Debug, Default)]
pub struct InMemoryRepository {
    storage: DashMap<ShortCode, UrlRecord>,
}

impl InMemoryRepository {
    /// Creates a new in-memory repository.
    pub fn new() -> Self {
        Self {
            storage: DashMap::new(),
        }
    }

    /// Creates a new in-memory repository with the specified capacity.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            storage: DashMap::with_capacity(capacity),
        }
    }

    /// Number of stored records.
    pub fn len(&self) -> usize {
        self.storage.len()
    }

    pub fn is_empty(&self) -> bool {
        self.storage.is_empty()
    }
}

#[async_trait]
impl Repository for InMemoryRepository {
    async fn insert(&self, record: &UrlRecord) -> Result<ShortCode> {
        match self.storage.entry(record.short_code.clone()) {
            Entry::Occupied(_) => Err(StorageError::Conflict(record.short_code.to_string())),
            Entry::Vacant(slot) => {
                slot.insert(record.clone());
                Ok(record.short_code.clone())
            }
        }
    }

    async fn get(&self, code: &ShortCode) -> Result<Option<UrlRecord>> {
        Ok(self.storage.get(code).map(|entry| entry.value().clone()))
    }
}
