//! Disposable PostgreSQL and Redis servers for integration tests.

pub mod error;
pub mod postgres;
pub mod redis;

pub use error::{Result, TestInfraError};
