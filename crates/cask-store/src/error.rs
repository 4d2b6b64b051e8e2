use cask_types::{ObjectKey, TypeError};

/// Errors from object store operations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// No committed object exists at this address.
    #[error("file not found: {bucket}/{key}")]
    FileNotFound { bucket: String, key: String },

    /// The key failed alphabet or path-segment validation.
    #[error("invalid key {key:?}: {reason}")]
    InvalidKey { key: String, reason: String },

    /// The bucket's policy forbids writes.
    #[error("bucket is read-only: {0}")]
    ReadOnly(String),

    /// The upload grew past the bucket's size limit and was aborted.
    #[error("object exceeds the size limit of {limit} bytes")]
    ObjectTooLarge { limit: u64 },

    /// A prefix of the key is a committed object, or the key itself names
    /// a directory of other objects.
    #[error("key conflicts with an existing object: {bucket}/{key}")]
    KeyConflict { bucket: String, key: String },

    /// The requested byte range lies outside the object.
    #[error("range {start}..{end} not satisfiable for an object of {size} bytes")]
    RangeNotSatisfiable { start: u64, end: u64, size: u64 },

    /// I/O error from the underlying storage backend or the inbound stream.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl StoreError {
    /// Returns `true` for read misses.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::FileNotFound { .. })
    }
}

/// Result alias for store operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// Validate a raw key, mapping failures into the store's taxonomy.
pub(crate) fn parse_key(key: &str) -> StoreResult<ObjectKey> {
    ObjectKey::parse(key).map_err(|e| match e {
        TypeError::InvalidKey { key, reason } => StoreError::InvalidKey { key, reason },
        other => StoreError::InvalidKey {
            key: key.to_string(),
            reason: other.to_string(),
        },
    })
}
