//! The [`Provider`] trait defining the bucket registry interface.

use async_trait::async_trait;
use cask_types::Bucket;

use crate::error::ProviderResult;

/// Source of bucket policy.
///
/// Implementations must be thread-safe (`Send + Sync`) and must not mutate
/// shared state while answering. Each call reflects the registry as it is
/// at the time of the call.
#[async_trait]
pub trait Provider: Send + Sync {
    /// Look up an enabled bucket by name.
    ///
    /// Returns `BucketNotFound` for unknown, disabled, or syntactically
    /// invalid names, and `Policy` when the bucket's descriptor is broken.
    async fn resolve(&self, name: &str) -> ProviderResult<Bucket>;

    /// Every enabled bucket, sorted by name.
    async fn list(&self) -> ProviderResult<Vec<Bucket>>;
}
