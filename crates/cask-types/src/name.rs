//! Bucket name and object key validation.
//!
//! Object keys use the alphabet accepted by the HTTP route:
//! `[a-zA-Z0-9-_.~+/]`. On top of the alphabet:
//! - Must be non-empty
//! - `/`-separated segments must be non-empty (no leading, trailing or
//!   doubled `/`), so distinct keys never map to the same path
//! - No segment may be exactly `.` or `..`
//! - Segments are at most 255 bytes, the whole key at most 1024 bytes
//!
//! Bucket names are a single path segment from `[a-zA-Z0-9-_.]` that does
//! not start with `.` or `_`. Those prefixes are reserved for the staging
//! area on disk and for service routes.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::TypeError;

/// Longest single path segment most filesystems accept.
pub const MAX_SEGMENT_LEN: usize = 255;

/// Longest accepted object key.
pub const MAX_KEY_LEN: usize = 1024;

fn is_key_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.' | '~' | '+' | '/')
}

fn is_bucket_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.')
}

/// Name of a bucket namespace.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct BucketName(String);

impl BucketName {
    /// Validate and wrap a bucket name.
    ///
    /// ```
    /// use cask_types::BucketName;
    ///
    /// assert!(BucketName::parse("media").is_ok());
    /// assert!(BucketName::parse("media.v2").is_ok());
    /// assert!(BucketName::parse(".staging").is_err());
    /// assert!(BucketName::parse("a/b").is_err());
    /// ```
    pub fn parse(name: impl Into<String>) -> Result<Self, TypeError> {
        let name = name.into();
        let reject = |reason: &str| {
            Err(TypeError::InvalidBucketName {
                name: name.clone(),
                reason: reason.into(),
            })
        };

        if name.is_empty() {
            return reject("bucket name must not be empty");
        }
        if name.len() > MAX_SEGMENT_LEN {
            return reject("bucket name is too long");
        }
        if let Some(c) = name.chars().find(|c| !is_bucket_char(*c)) {
            return reject(&format!("contains forbidden character: {c:?}"));
        }
        if name.starts_with('.') || name.starts_with('_') {
            return reject("must not start with '.' or '_'");
        }

        Ok(Self(name))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for BucketName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "BucketName({:?})", self.0)
    }
}

impl fmt::Display for BucketName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for BucketName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for BucketName {
    type Error = TypeError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(value)
    }
}

impl TryFrom<&str> for BucketName {
    type Error = TypeError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        Self::parse(value)
    }
}

impl From<BucketName> for String {
    fn from(name: BucketName) -> Self {
        name.0
    }
}

/// Address of an object inside a bucket.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ObjectKey(String);

impl ObjectKey {
    /// Validate and wrap an object key.
    ///
    /// ```
    /// use cask_types::ObjectKey;
    ///
    /// assert!(ObjectKey::parse("clip1.mp3").is_ok());
    /// assert!(ObjectKey::parse("a/b/file.v2.txt").is_ok());
    /// assert!(ObjectKey::parse("a/../b").is_err());
    /// assert!(ObjectKey::parse("a//b").is_err());
    /// ```
    pub fn parse(key: impl Into<String>) -> Result<Self, TypeError> {
        let key = key.into();
        let reject = |reason: String| {
            Err(TypeError::InvalidKey {
                key: key.clone(),
                reason,
            })
        };

        if key.is_empty() {
            return reject("key must not be empty".into());
        }
        if key.len() > MAX_KEY_LEN {
            return reject(format!("key is longer than {MAX_KEY_LEN} bytes"));
        }
        if let Some(c) = key.chars().find(|c| !is_key_char(*c)) {
            return reject(format!("contains forbidden character: {c:?}"));
        }

        for segment in key.split('/') {
            if segment.is_empty() {
                return reject("path segments must not be empty".into());
            }
            if segment == "." || segment == ".." {
                return reject(format!("path segment {segment:?} is not allowed"));
            }
            if segment.len() > MAX_SEGMENT_LEN {
                return reject(format!("path segment is longer than {MAX_SEGMENT_LEN} bytes"));
            }
        }

        Ok(Self(key))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The `/`-separated segments, outermost first.
    pub fn segments(&self) -> impl Iterator<Item = &str> {
        self.0.split('/')
    }

    /// Number of segments; `1` for a flat key.
    pub fn depth(&self) -> usize {
        self.segments().count()
    }
}

impl fmt::Debug for ObjectKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ObjectKey({:?})", self.0)
    }
}

impl fmt::Display for ObjectKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for ObjectKey {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for ObjectKey {
    type Error = TypeError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(value)
    }
}

impl TryFrom<&str> for ObjectKey {
    type Error = TypeError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        Self::parse(value)
    }
}

impl From<ObjectKey> for String {
    fn from(key: ObjectKey) -> Self {
        key.0
    }
}
