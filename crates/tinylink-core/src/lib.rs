//! Core types and traits for the tinylink URL resolution core.
//!
//! This crate provides the domain types, the error taxonomy and the
//! capability traits shared by the storage, cache, allocator and service
//! crates.

pub mod allocator;
pub mod cache;
pub mod error;
pub mod repository;
pub mod retry;
pub mod shortcode;
pub mod shortener;

pub use allocator::{Allocation, KeyAllocator, NewUrl};
pub use cache::{UrlCache, DEFAULT_CACHE_TTL};
pub use error::{AllocatorError, CacheError, CoreError, ShortenerError, StorageError};
pub use repository::{KeyPool, Repository, UrlRecord};
pub use retry::RetryPolicy;
pub use shortcode::ShortCode;
pub use shortener::{ShortUrl, Shortener};
