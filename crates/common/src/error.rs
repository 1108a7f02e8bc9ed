//! Error types for stream construction and evaluation

use thiserror::Error;

/// Result type for stream operations
pub type Result<T> = std::result::Result<T, StreamError>;

/// Errors that can surface while driving a stream
///
/// Worker errors are fatal for the stream that produced them: the scheduler
/// delivers the error to the consumer once, after any values that were
/// already buffered ahead of it, and cancels the remaining producers.
#[derive(Error, Debug, Clone)]
pub enum StreamError {
    /// A user-supplied step, transform, or fold failed.
    #[error("stream step failed: {0}")]
    User(String),

    /// A resource acquire or release action failed.
    #[error("resource action failed: {0}")]
    Resource(String),

    /// The consumer side of a stream variable is gone. Producers treat this
    /// as a shutdown signal; it is never delivered to a consumer.
    #[error("stream consumer abandoned")]
    Abandoned,
}

impl StreamError {
    /// Wrap an error raised by user code.
    pub fn user(err: impl std::fmt::Display) -> Self {
        StreamError::User(err.to_string())
    }

    /// Wrap an error raised while acquiring or releasing a resource.
    pub fn resource(err: impl std::fmt::Display) -> Self {
        StreamError::Resource(err.to_string())
    }
}
