//! Content-hashing object storage for cask.
//!
//! Objects are addressed by `(bucket, key)`. Every write streams its body
//! through a [`ContentHasher`](cask_crypto::ContentHasher) exactly once and
//! hands back the resulting digest, so uploaders can verify what the store
//! persisted.
//!
//! # Storage Backends
//!
//! All backends implement the [`FileSystem`] trait:
//!
//! - [`DiskFileSystem`] -- durable store rooted at a local directory
//! - [`InMemoryFileSystem`] -- `HashMap`-based store for tests and embedding
//!
//! # Design Rules
//!
//! 1. A write is invisible until it commits. Bodies stream into a private
//!    staging file and an atomic rename publishes them.
//! 2. A failed or abandoned write removes its staging file and leaves any
//!    previously committed object at that key untouched.
//! 3. Concurrent writes to the same key are last-rename-wins.
//! 4. Memory use per write is one fixed-size copy buffer.
//! 5. Bucket existence is not checked here; callers pass resolved buckets.
//! 6. All I/O errors are propagated, never silently ignored.

pub mod disk;
pub mod error;
pub mod layout;
pub mod memory;
pub mod object;
pub mod stream;
pub mod traits;

#[cfg(test)]
pub(crate) mod testutil;

pub use disk::DiskFileSystem;
pub use error::{StoreError, StoreResult};
pub use memory::InMemoryFileSystem;
pub use object::{CreatedObject, ObjectInfo, ObjectRead, OpenedObject};
pub use traits::{BodyReader, FileSystem};
