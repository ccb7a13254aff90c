use std::time::Duration;
use tinylink_core::DEFAULT_CACHE_TTL;
use typed_builder::TypedBuilder;

#[derive(Debug, Clone, PartialEq, Eq, TypedBuilder)]
pub struct ServiceConfig {
    /// Prefix of every composed short URL, e.g. `https://tl.ink`.
    #[builder(setter(into))]
    pub base_url: String,
    /// Lifetime of cache entries written by the service.
    #[builder(default = DEFAULT_CACHE_TTL)]
    pub cache_ttl: Duration,
}
