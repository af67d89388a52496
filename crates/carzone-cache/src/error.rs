//! Errors raised while building or probing a cache backend.
//!
//! Read and write paths never return these; see [`crate::CacheBackend`].

/// Cache backend errors.
#[derive(Debug, thiserror::Error)]
pub enum CacheError {
    /// The Redis pool could not be built from the configuration.
    #[error("Redis pool error: {0}")]
    Pool(#[from] deadpool_redis::CreatePoolError),

    /// No connection could be checked out of the pool.
    #[error("Redis connection error: {0}")]
    Connection(#[from] deadpool_redis::PoolError),

    /// Redis answered with an error.
    #[error("Redis command error: {0}")]
    Command(#[from] redis::RedisError),
}
