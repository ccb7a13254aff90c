mod error;
pub mod memory;
pub mod pool;
pub mod postgres;

pub use memory::InMemoryRepository;
pub use pool::InMemoryKeyPool;
pub use postgres::{PgStoreConfig, PostgresKeyPool, PostgresRepository};

pub use tinylink_core::repository::{KeyPool, Repository, Result};
pub use tinylink_core::{StorageError, UrlRecord};
