//! Bucket registry for cask.
//!
//! A [`Provider`] turns a bucket name into a [`Bucket`](cask_types::Bucket)
//! carrying its policy, and enumerates every configured bucket. It knows
//! nothing about stored objects; the HTTP layer resolves a bucket here and
//! then hands it to the storage engine.
//!
//! # Descriptors
//!
//! [`DiskProvider`] reads one TOML descriptor per bucket from a policy
//! directory, `<dir>/<bucket>.toml`. Every field is optional, so an empty
//! file declares an open bucket:
//!
//! ```toml
//! enabled = true
//! read_only = false
//! max_object_size = 104857600
//!
//! [owner]
//! email = "media-team@example.com"
//! ```
//!
//! Descriptors are read on every call; edits take effect without a restart.
//!
//! # Modules
//!
//! - [`error`] -- Error types for provider operations
//! - [`descriptor`] -- Descriptor file naming and parsing
//! - [`traits`] -- The [`Provider`] trait
//! - [`disk`] -- Directory-backed [`DiskProvider`]
//! - [`memory`] -- In-memory [`InMemoryProvider`] for tests

pub mod descriptor;
pub mod disk;
pub mod error;
pub mod memory;
pub mod traits;

pub use disk::DiskProvider;
pub use error::{ProviderError, ProviderResult};
pub use memory::InMemoryProvider;
pub use traits::Provider;
