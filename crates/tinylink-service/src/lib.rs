//! The URL resolution service.
//!
//! [`ResolutionService`] creates short URLs through a
//! [`KeyAllocator`](tinylink_core::KeyAllocator) and resolves them with a
//! cache-aside read: cache first, store on a miss, then repopulate the cache.
//! The store is authoritative; cache failures never reach the caller.

pub mod config;
pub mod service;

pub use config::ServiceConfig;
pub use service::ResolutionService;

pub use tinylink_core::{ShortUrl, Shortener, ShortenerError};
