//! On-disk layout of a store root.
//!
//! ```text
//! <root>/
//!   .staging/<uuid>.part      in-flight writes, never addressable
//!   <bucket>/<seg>/<seg>/...  committed objects, one file per key
//! ```
//!
//! Bucket names cannot start with `.`, so `.staging` never collides with a
//! bucket. Keys are validated to have no empty, `.` or `..` segments, which
//! makes the key to path mapping injective.

use std::path::{Path, PathBuf};

use cask_types::{BucketName, ObjectKey};
use uuid::Uuid;

/// Directory under the root holding staging artifacts.
pub const STAGING_DIR: &str = ".staging";

/// Extension of staging artifacts.
pub const STAGING_EXTENSION: &str = "part";

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Layout {
    root: PathBuf,
}

impl Layout {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn bucket_dir(&self, bucket: &BucketName) -> PathBuf {
        self.root.join(bucket.as_str())
    }

    /// Final path of a committed object.
    pub fn object_path(&self, bucket: &BucketName, key: &ObjectKey) -> PathBuf {
        let mut path = self.bucket_dir(bucket);
        path.extend(key.segments());
        path
    }

    /// Directories strictly between the bucket directory and the object,
    /// outermost first. Empty for a flat key.
    pub fn intermediate_dirs(&self, bucket: &BucketName, key: &ObjectKey) -> Vec<PathBuf> {
        let mut dirs = Vec::with_capacity(key.depth().saturating_sub(1));
        let mut path = self.bucket_dir(bucket);
        let segments: Vec<&str> = key.segments().collect();
        for segment in &segments[..segments.len() - 1] {
            path.push(segment);
            dirs.push(path.clone());
        }
        dirs
    }

    pub fn staging_dir(&self) -> PathBuf {
        self.root.join(STAGING_DIR)
    }

    /// A fresh, unique staging path. Uniqueness comes from UUID v7.
    pub fn new_staging_path(&self) -> PathBuf {
        self.staging_dir()
            .join(format!("{}.{STAGING_EXTENSION}", Uuid::now_v7()))
    }

    /// Whether `path` looks like a file produced by [`Self::new_staging_path`].
    pub fn is_staging_artifact(path: &Path) -> bool {
        path.extension().is_some_and(|ext| ext == STAGING_EXTENSION)
    }
}
