use std::time::Duration;
use typed_builder::TypedBuilder;

/// A bounded retry policy with capped exponential backoff.
///
/// The same policy type drives both allocation retries (a fresh candidate
/// after every conflict) and cache cluster redirections (a resend after
/// every redirect).
#[derive(Debug, Clone, Copy, PartialEq, TypedBuilder)]
pub struct RetryPolicy {
    /// Maximum number of attempts the policy allows.
    #[builder(default = 5)]
    pub max_attempts: u32,
    /// Delay before the first retry.
    #[builder(default = Duration::ZERO)]
    pub base_backoff: Duration,
    /// Upper bound for any single delay.
    #[builder(default = Duration::from_millis(100))]
    pub max_backoff: Duration,
    /// Factor applied to the delay after each retry.
    #[builder(default = 2.0)]
    pub multiplier: f64,
}

impl RetryPolicy {
    /// Allocation policy: five candidates, no delay between them.
    pub fn allocation() -> Self {
        Self::builder().build()
    }

    /// Redirection policy: follow up to sixteen redirects, backing off a
    /// little while the cluster settles into its new topology.
    pub fn redirections() -> Self {
        Self::builder()
            .max_attempts(16)
            .base_backoff(Duration::from_millis(1))
            .max_backoff(Duration::from_millis(50))
            .build()
    }

    /// A policy that allows exactly `max_attempts` attempts without delay.
    pub fn immediate(max_attempts: u32) -> Self {
        Self::builder().max_attempts(max_attempts).build()
    }

    /// Calculates the backoff before retry number `attempt` (0-indexed).
    pub fn backoff(&self, attempt: u32) -> Duration {
        if self.base_backoff.is_zero() {
            return Duration::ZERO;
        }
        let exponent = i32::try_from(attempt).unwrap_or(i32::MAX);
        let scaled = self.base_backoff.as_nanos() as f64 * self.multiplier.powi(exponent);
        let capped = scaled.min(self.max_backoff.as_nanos() as f64).max(0.0);
        Duration::from_nanos(capped.round() as u64)
    }

    /// Sleeps for the backoff of retry number `attempt`, if any.
    pub async fn wait(&self, attempt: u32) {
        let delay = self.backoff(attempt);
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::allocation()
    }
}
