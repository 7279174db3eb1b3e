//! Error types for the store and the bus

use benchpool_common::Topic;
use thiserror::Error;

/// The shared store could not serve a request. A missing record is not an
/// error: lookups return `Ok(None)` for that.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("store unavailable: {0}")]
    Unavailable(String),

    #[error("corrupt record under {key}: {source}")]
    Corrupt {
        key: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("failed to encode record: {0}")]
    Encode(#[source] serde_json::Error),
}

impl From<redis::RedisError> for StoreError {
    fn from(e: redis::RedisError) -> Self {
        StoreError::Unavailable(e.to_string())
    }
}

/// Publish/subscribe transport failure
#[derive(Debug, Error)]
pub enum BusError {
    #[error("failed to publish to {topic}: {message}")]
    Publish { topic: Topic, message: String },

    #[error("failed to subscribe to {topic}: {message}")]
    Subscribe { topic: Topic, message: String },

    #[error("failed to encode message: {0}")]
    Encode(#[from] serde_json::Error),
}
