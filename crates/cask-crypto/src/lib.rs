//! Content hashing for cask.
//!
//! Objects are hashed while they stream to disk, so the hasher is
//! incremental: feed it chunks with [`ContentHasher::update`] and take the
//! [`Digest`](cask_types::Digest) with [`ContentHasher::finalize`].
//!
//! SHA-1 comes from the `sha1` crate and BLAKE3 from `blake3`.

pub mod hasher;

pub use hasher::ContentHasher;
