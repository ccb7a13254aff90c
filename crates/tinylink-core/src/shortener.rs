use crate::shortcode::ShortCode;
use async_trait::async_trait;
use std::fmt::Display;

type Result<T> = std::result::Result<T, crate::error::ShortenerError>;

/// A freshly created short URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShortUrl {
    /// The code the long URL was bound to.
    pub code: ShortCode,
    /// The composed `{base_url}/{code}`.
    pub url: String,
}

impl Display for ShortUrl {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.url)
    }
}

#[async_trait]
pub trait Shortener: Send + Sync + 'static {
    /// Binds `long_url` to a new short code and returns the composed short URL.
    async fn create(&self, long_url: &str, owner_id: Option<&str>) -> Result<ShortUrl>;

    /// Resolves a short code to its original long URL.
    ///
    /// Fails with [`ShortenerError::NotFound`](crate::ShortenerError::NotFound)
    /// if the code is not bound.
    async fn resolve(&self, code: &str) -> Result<String>;
}
