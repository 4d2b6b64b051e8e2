//! Descriptor file naming and parsing.

use std::path::{Path, PathBuf};

use cask_types::{Bucket, BucketName, BucketPolicy};

use crate::error::{ProviderError, ProviderResult};

/// Extension of bucket descriptor files.
pub const DESCRIPTOR_EXTENSION: &str = "toml";

/// Path of the descriptor for `name` inside `dir`.
pub fn descriptor_path(dir: &Path, name: &BucketName) -> PathBuf {
    dir.join(format!("{name}.{DESCRIPTOR_EXTENSION}"))
}

/// The bucket a descriptor file describes, if `path` names one.
///
/// Files with another extension, or whose stem is not a valid bucket name,
/// are not descriptors.
pub fn bucket_name_for(path: &Path) -> Option<BucketName> {
    if path.extension()? != DESCRIPTOR_EXTENSION {
        return None;
    }
    BucketName::parse(path.file_stem()?.to_str()?).ok()
}

/// Parse descriptor text into a bucket.
pub fn parse_descriptor(name: BucketName, text: &str) -> ProviderResult<Bucket> {
    let policy: BucketPolicy = toml::from_str(text).map_err(|e| ProviderError::Policy {
        bucket: name.to_string(),
        reason: e.message().to_string(),
    })?;
    Ok(Bucket::new(name, policy))
}
