//! Error types for provider operations.

use thiserror::Error;

/// Errors that can occur while resolving or listing buckets.
#[derive(Debug, Error)]
pub enum ProviderError {
    /// No enabled bucket with this name is configured.
    #[error("bucket not found: {0}")]
    BucketNotFound(String),

    /// The bucket's descriptor exists but cannot be read or parsed.
    #[error("corrupt policy for bucket {bucket}: {reason}")]
    Policy { bucket: String, reason: String },

    /// The policy directory itself is missing or unreadable.
    #[error("configuration error: {0}")]
    Config(String),
}

/// Convenience type alias for provider operations.
pub type ProviderResult<T> = std::result::Result<T, ProviderError>;
