use crate::Generator;
use tinylink_core::repository::Result;
use tinylink_core::{KeyPool, ShortCode};
use tracing::{debug, info};

pub const DEFAULT_SEED_BATCH_SIZE: usize = 10_000;

/// Generates `total` candidate codes and adds them to `pool` in batches of
/// `batch_size`.
///
/// Candidates already present in the pool, claimed or not, are skipped, so
/// the number of entries added (the return value) can be lower than `total`.
/// A failed batch aborts the run; batches written before it stay in place.
pub async fn seed_pool<P, G>(pool: &P, generator: &G, total: u64, batch_size: usize) -> Result<u64>
where
    P: KeyPool + ?Sized,
    G: Generator,
{
    let batch_size = batch_size.max(1);
    let mut generated = 0u64;
    let mut added = 0u64;

    while generated < total {
        let size = usize::try_from(total - generated)
            .map_or(batch_size, |left| left.min(batch_size));
        let batch: Vec<ShortCode> = (0..size).map(|_| generator.generate().into()).collect();

        let inserted = pool.seed(&batch).await?;
        generated += size as u64;
        added += inserted;

        if inserted < size as u64 {
            debug!(skipped = size as u64 - inserted, "skipped codes already in the pool");
        }
        info!(generated, added, total, "seeded key pool batch");
    }

    Ok(added)
}
