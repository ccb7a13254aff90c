use async_trait::async_trait;
use tinylink_core::allocator::Result;
use tinylink_core::{Allocation, AllocatorError, KeyAllocator, KeyPool, NewUrl};
use tracing::{debug, warn};

/// Allocates by claiming a pre-generated code from a [`KeyPool`].
///
/// The claim marks the entry used, so the code is never handed out again
/// even if the caller later fails to store its record. An empty pool fails
/// the request with [`AllocatorError::ExhaustedKeySpace`]; refilling it is
/// the job of [`seed_pool`](crate::seed_pool).
#[derive(Debug, Clone)]
pub struct PoolAllocator<P> {
    pool: P,
}

impl<P> PoolAllocator<P> {
    pub fn new(pool: P) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &P {
        &self.pool
    }
}

#[async_trait]
impl<P: KeyPool> KeyAllocator for PoolAllocator<P> {
    async fn allocate(&self, _url: &NewUrl) -> Result<Allocation> {
        match self.pool.claim().await? {
            Some(code) => {
                debug!(code = %code, "claimed pooled short code");
                Ok(Allocation::Reserved(code))
            }
            None => {
                warn!("key pool is exhausted");
                Err(AllocatorError::ExhaustedKeySpace(
                    "key pool has no unclaimed entries".to_string(),
                ))
            }
        }
    }
}
