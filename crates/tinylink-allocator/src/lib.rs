//! Short code allocation.
//!
//! Two [`KeyAllocator`](tinylink_core::KeyAllocator) strategies live here:
//! [`GenerateAndCheck`] draws random candidates and claims them by inserting
//! the record itself, while [`PoolAllocator`] claims codes that were seeded
//! into a [`KeyPool`](tinylink_core::KeyPool) ahead of time by [`seed_pool`].

pub mod check;
pub mod pool;
pub mod random;
pub mod seed;

pub use check::GenerateAndCheck;
pub use pool::PoolAllocator;
pub use random::{RandomGenerator, ALPHABET, DEFAULT_CODE_LENGTH};
pub use seed::{seed_pool, DEFAULT_SEED_BATCH_SIZE};

use std::sync::Arc;
use tinylink_core::ShortCode;

/// Trait for generating short codes.
///
/// Implementations are pure generators that don't interact with storage;
/// uniqueness is checked by whoever persists the code.
pub trait Generator: Send + Sync + 'static {
    type Output: Into<ShortCode>;

    /// Generates a candidate short code.
    fn generate(&self) -> Self::Output;
}

impl<G: Generator> Generator for Arc<G> {
    type Output = G::Output;

    fn generate(&self) -> Self::Output {
        (**self).generate()
    }
}
