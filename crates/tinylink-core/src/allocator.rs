use crate::error::AllocatorError;
use crate::shortcode::ShortCode;
use async_trait::async_trait;

/// Result type for allocation.
pub type Result<T> = std::result::Result<T, AllocatorError>;

/// The URL a code is being allocated for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewUrl {
    /// The validated long URL.
    pub long_url: String,
    /// The optional owner of the new record.
    pub owner_id: Option<String>,
}

impl NewUrl {
    pub fn new(long_url: impl Into<String>, owner_id: Option<String>) -> Self {
        Self {
            long_url: long_url.into(),
            owner_id,
        }
    }
}

/// The outcome of a successful allocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Allocation {
    /// The code was reserved by writing the record itself; nothing is left
    /// to insert.
    Bound(ShortCode),
    /// The code was reserved in the key pool; the record still has to be
    /// inserted under it.
    Reserved(ShortCode),
}

impl Allocation {
    pub fn code(&self) -> &ShortCode {
        match self {
            Allocation::Bound(code) | Allocation::Reserved(code) => code,
        }
    }

    pub fn into_code(self) -> ShortCode {
        match self {
            Allocation::Bound(code) | Allocation::Reserved(code) => code,
        }
    }
}

/// Produces short codes that the persistence layer has durably reserved.
///
/// A code returned by an allocator is never bound to a different long URL.
/// Retrying after conflicts is the allocator's job; callers never loop.
#[async_trait]
pub trait KeyAllocator: Send + Sync + 'static {
    /// Allocates a code for `url`, or fails with
    /// [`AllocatorError::ExhaustedKeySpace`] once the retry or pool budget is
    /// spent.
    async fn allocate(&self, url: &NewUrl) -> Result<Allocation>;
}
