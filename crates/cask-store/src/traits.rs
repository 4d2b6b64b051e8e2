use async_trait::async_trait;
use cask_types::{Bucket, DigestAlgorithm};
use tokio::io::AsyncRead;

use crate::error::StoreResult;
use crate::object::{CreatedObject, OpenedObject};

/// Inbound object body. Usually a network stream; never assumed seekable.
pub trait BodyReader: AsyncRead + Send + Unpin {}

impl<T: AsyncRead + Send + Unpin + ?Sized> BodyReader for T {}

/// Object storage engine.
///
/// All implementations must satisfy these invariants:
/// - `create` reads `body` exactly once, hashing and storing in the same
///   pass, and the returned digest equals a hash of the committed bytes.
/// - An object is visible to `open` only once `create` has committed it.
///   An aborted `create` never exposes partial content and never disturbs
///   the object previously stored at that key.
/// - Keys are validated by the engine; `..` and `.` segments are rejected.
/// - Bucket existence is the caller's concern. Only the policy fields of
///   the bucket handed in are enforced.
#[async_trait]
pub trait FileSystem: Send + Sync {
    /// Store `body` at `(bucket, key)` and return the committed object.
    ///
    /// When `expected_len` is given, a body that ends early or runs long is
    /// treated as a broken stream and the write is aborted.
    async fn create(
        &self,
        bucket: &Bucket,
        key: &str,
        body: &mut dyn BodyReader,
        expected_len: Option<u64>,
    ) -> StoreResult<CreatedObject>;

    /// Open a committed object for (range) reading.
    ///
    /// Fails with `FileNotFound` when nothing is committed at the address.
    async fn open(&self, bucket: &Bucket, key: &str) -> StoreResult<OpenedObject>;

    /// The digest algorithm used for new objects.
    fn algorithm(&self) -> DigestAlgorithm;
}
