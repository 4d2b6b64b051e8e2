//! Foundation types for cask.
//!
//! This crate provides the identifiers every other cask crate agrees on.
//! Validation happens once, at construction: a value of one of these types
//! is always well-formed, so the storage engine and the policy layer never
//! re-check what they are handed.
//!
//! # Key Types
//!
//! - [`Bucket`] -- A bucket name with its [`BucketPolicy`]
//! - [`BucketName`] -- Name of a bucket namespace, also its directory on disk
//! - [`ObjectKey`] -- `/`-separated object address within a bucket
//! - [`Digest`] -- Fixed-length content hash tagged with its [`DigestAlgorithm`]

pub mod bucket;
pub mod digest;
pub mod error;
pub mod name;

pub use bucket::{Bucket, BucketPolicy, Owner};
pub use digest::{Digest, DigestAlgorithm};
pub use error::TypeError;
pub use name::{BucketName, ObjectKey};
