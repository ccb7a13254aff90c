use thiserror::Error;

/// Failures while starting or probing a test server.
#[derive(Debug, Error)]
pub enum TestInfraError {
    #[error("container failed: {0}")]
    Container(#[from] testcontainers::TestcontainersError),

    #[error("redis probe failed: {0}")]
    Redis(#[from] redis::RedisError),

    #[error("{service} not ready after {attempts} probes")]
    NotReady { service: &'static str, attempts: u32 },
}

pub type Result<T> = std::result::Result<T, TestInfraError>;
