use std::io;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use cask_types::{Bucket, BucketName};
use tokio::fs;
use tracing::{debug, warn};

use crate::descriptor::{bucket_name_for, descriptor_path, parse_descriptor};
use crate::error::{ProviderError, ProviderResult};
use crate::traits::Provider;

/// Provider backed by a directory of `<bucket>.toml` descriptors.
///
/// Nothing is cached: `resolve` and `list` read the directory as it is when
/// called, so descriptors can be added, edited or disabled while the
/// service runs.
#[derive(Clone, Debug)]
pub struct DiskProvider {
    dir: PathBuf,
}

impl DiskProvider {
    /// Use `dir` as the policy directory. Fails if it is not a directory.
    pub fn new(dir: impl Into<PathBuf>) -> ProviderResult<Self> {
        let dir = dir.into();
        match std::fs::metadata(&dir) {
            Ok(meta) if meta.is_dir() => Ok(Self { dir }),
            Ok(_) => Err(ProviderError::Config(format!(
                "policy directory {} is not a directory",
                dir.display()
            ))),
            Err(e) => Err(ProviderError::Config(format!(
                "cannot open policy directory {}: {e}",
                dir.display()
            ))),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Read and parse one descriptor. `Ok(None)` when the file is absent.
    async fn load(&self, name: BucketName, path: &Path) -> ProviderResult<Option<Bucket>> {
        let text = match fs::read_to_string(path).await {
            Ok(text) => text,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(e) => {
                return Err(ProviderError::Policy {
                    bucket: name.to_string(),
                    reason: e.to_string(),
                })
            }
        };
        parse_descriptor(name, &text).map(Some)
    }
}

#[async_trait]
impl Provider for DiskProvider {
    async fn resolve(&self, name: &str) -> ProviderResult<Bucket> {
        let not_found = || ProviderError::BucketNotFound(name.to_string());
        let Ok(bucket_name) = BucketName::parse(name) else {
            return Err(not_found());
        };

        let path = descriptor_path(&self.dir, &bucket_name);
        match self.load(bucket_name, &path).await? {
            Some(bucket) if bucket.is_enabled() => Ok(bucket),
            Some(_) => {
                debug!(bucket = name, "bucket is disabled");
                Err(not_found())
            }
            None => Err(not_found()),
        }
    }

    async fn list(&self) -> ProviderResult<Vec<Bucket>> {
        let unreadable = |e: io::Error| {
            ProviderError::Config(format!(
                "cannot read policy directory {}: {e}",
                self.dir.display()
            ))
        };

        let mut entries = fs::read_dir(&self.dir).await.map_err(unreadable)?;
        let mut buckets = Vec::new();
        while let Some(entry) = entries.next_entry().await.map_err(unreadable)? {
            let path = entry.path();
            let Some(name) = bucket_name_for(&path) else {
                continue;
            };
            match self.load(name, &path).await {
                Ok(Some(bucket)) if bucket.is_enabled() => buckets.push(bucket),
                Ok(_) => {}
                Err(e) => warn!(path = %path.display(), error = %e, "skipping bucket descriptor"),
            }
        }

        buckets.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(buckets)
    }
}
