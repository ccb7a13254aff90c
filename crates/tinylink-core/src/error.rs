use thiserror::Error;

/// Errors related to the core domain types of the URL resolution core.
pub type Result<T> = std::result::Result<T, CoreError>;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum CoreError {
    #[error("invalid short code: {0}")]
    InvalidShortCode(String),
    #[error("invalid url: {0}")]
    InvalidUrl(String),
}

/// Errors raised by a persistent store or key pool.
#[derive(Debug, Clone, Error)]
pub enum StorageError {
    #[error("short code already bound: {0}")]
    Conflict(String),
    #[error("storage backend unavailable: {0}")]
    Unavailable(String),
    #[error("storage operation timed out: {0}")]
    Timeout(String),
    #[error("storage query failed: {0}")]
    Query(String),
    #[error("stored data is invalid: {0}")]
    InvalidData(String),
}

impl StorageError {
    /// Whether the error means the store could not be reached within its
    /// connection or command budget.
    pub fn is_unavailable(&self) -> bool {
        matches!(self, Self::Unavailable(_) | Self::Timeout(_))
    }
}

/// Errors raised by a cache backend.
///
/// None of these ever reach a caller of the resolution service; they are
/// logged and downgraded to a miss (reads) or dropped (writes).
#[derive(Debug, Clone, Error)]
pub enum CacheError {
    #[error("cache backend unavailable: {0}")]
    Unavailable(String),
    #[error("cache operation timed out: {0}")]
    Timeout(String),
    #[error("cache value is invalid: {0}")]
    InvalidData(String),
    #[error("cache initialization failed: {0}")]
    Initialization(String),
    #[error("cache redirected {redirections} times for key '{key}', giving up")]
    RedirectionsExhausted { key: String, redirections: u32 },
    #[error("cache operation failed: {0}")]
    Operation(String),
}

impl CacheError {
    /// Whether the error means the node could not be reached within its
    /// connection or command budget.
    pub fn is_unavailable(&self) -> bool {
        matches!(self, Self::Unavailable(_) | Self::Timeout(_))
    }
}

/// Errors raised by a key allocator.
#[derive(Debug, Clone, Error)]
pub enum AllocatorError {
    #[error("no free short code available: {0}")]
    ExhaustedKeySpace(String),
    #[error("storage error during allocation: {0}")]
    Storage(#[from] StorageError),
}

/// Errors surfaced to callers of [`Shortener`](crate::Shortener).
#[derive(Debug, Clone, Error)]
pub enum ShortenerError {
    #[error("invalid url: {0}")]
    InvalidUrl(String),
    #[error("short code not found: {0}")]
    NotFound(String),
    #[error("no free short code available: {0}")]
    ExhaustedKeySpace(String),
    #[error("upstream unavailable: {0}")]
    UpstreamUnavailable(String),
    #[error("storage error: {0}")]
    Storage(String),
}

impl From<CoreError> for ShortenerError {
    fn from(value: CoreError) -> Self {
        match value {
            CoreError::InvalidUrl(message) => Self::InvalidUrl(message),
            CoreError::InvalidShortCode(message) => Self::NotFound(message),
        }
    }
}

impl From<StorageError> for ShortenerError {
    fn from(value: StorageError) -> Self {
        if value.is_unavailable() {
            return Self::UpstreamUnavailable(value.to_string());
        }
        match value {
            StorageError::Conflict(code) => {
                Self::ExhaustedKeySpace(format!("allocated code '{code}' was already bound"))
            }
            other => Self::Storage(other.to_string()),
        }
    }
}

impl From<AllocatorError> for ShortenerError {
    fn from(value: AllocatorError) -> Self {
        match value {
            AllocatorError::ExhaustedKeySpace(message) => Self::ExhaustedKeySpace(message),
            AllocatorError::Storage(err) => err.into(),
        }
    }
}
