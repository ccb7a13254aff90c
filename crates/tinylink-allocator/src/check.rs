use crate::Generator;
use async_trait::async_trait;
use tinylink_core::allocator::Result;
use tinylink_core::{
    Allocation, AllocatorError, KeyAllocator, NewUrl, Repository, RetryPolicy, ShortCode,
    StorageError, UrlRecord,
};
use tracing::{debug, warn};

/// Allocates by drawing a candidate and inserting the record under it.
///
/// The insert is the claim: it either binds the candidate atomically or
/// reports a conflict, in which case a fresh candidate is drawn. After
/// `policy.max_attempts` conflicts the request fails with
/// [`AllocatorError::ExhaustedKeySpace`].
#[derive(Debug, Clone)]
pub struct GenerateAndCheck<R, G> {
    repository: R,
    generator: G,
    policy: RetryPolicy,
}

impl<R, G> GenerateAndCheck<R, G> {
    pub fn new(repository: R, generator: G) -> Self {
        Self::with_policy(repository, generator, RetryPolicy::allocation())
    }

    pub fn with_policy(repository: R, generator: G, policy: RetryPolicy) -> Self {
        Self {
            repository,
            generator,
            policy,
        }
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }
}

#[async_trait]
impl<R: Repository, G: Generator> KeyAllocator for GenerateAndCheck<R, G> {
    async fn allocate(&self, url: &NewUrl) -> Result<Allocation> {
        let attempts = self.policy.max_attempts;

        for attempt in 0..attempts {
            let candidate: ShortCode = self.generator.generate().into();
            let record = UrlRecord::new(candidate, url.long_url.clone(), url.owner_id.clone());

            match self.repository.insert(&record).await {
                Ok(code) => {
                    debug!(code = %code, attempt, "short code bound");
                    return Ok(Allocation::Bound(code));
                }
                Err(StorageError::Conflict(code)) => {
                    debug!(code = %code, attempt, "short code collision");
                    if attempt + 1 < attempts {
                        self.policy.wait(attempt).await;
                    }
                }
                Err(e) => return Err(e.into()),
            }
        }

        warn!(attempts, "no free short code within the retry budget");
        Err(AllocatorError::ExhaustedKeySpace(format!(
            "every candidate collided after {attempts} attempts"
        )))
    }
}
