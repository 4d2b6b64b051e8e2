use std::collections::HashMap;
use std::io::Cursor;
use std::sync::RwLock;

use async_trait::async_trait;
use bytes::Bytes;
use cask_crypto::ContentHasher;
use cask_types::{Bucket, BucketName, DigestAlgorithm, ObjectKey};
use chrono::{DateTime, Utc};

use crate::error::{parse_key, StoreError, StoreResult};
use crate::object::{CreatedObject, ObjectInfo, OpenedObject};
use crate::stream::{copy_hashed, CopyLimits};
use crate::traits::{BodyReader, FileSystem};

#[derive(Clone)]
struct MemoryObject {
    data: Bytes,
    last_modified: DateTime<Utc>,
}

/// In-memory, HashMap-based object store.
///
/// Intended for tests and embedding. Enforces the same key validation,
/// bucket policy and key-conflict rules as [`DiskFileSystem`](crate::DiskFileSystem),
/// so callers tested against it behave the same in production. A body is
/// buffered before it is published, which keeps aborted writes invisible.
pub struct InMemoryFileSystem {
    algorithm: DigestAlgorithm,
    objects: RwLock<HashMap<(BucketName, ObjectKey), MemoryObject>>,
}

impl InMemoryFileSystem {
    /// Create a new empty in-memory store.
    pub fn new(algorithm: DigestAlgorithm) -> Self {
        Self {
            algorithm,
            objects: RwLock::new(HashMap::new()),
        }
    }

    /// Number of objects currently stored.
    pub fn len(&self) -> usize {
        self.objects.read().expect("lock poisoned").len()
    }

    /// Returns `true` if the store is empty.
    pub fn is_empty(&self) -> bool {
        self.objects.read().expect("lock poisoned").is_empty()
    }

    /// Total bytes across all stored objects.
    pub fn total_bytes(&self) -> u64 {
        self.objects
            .read()
            .expect("lock poisoned")
            .values()
            .map(|obj| obj.data.len() as u64)
            .sum()
    }

    /// Remove all objects from the store.
    pub fn clear(&self) {
        self.objects.write().expect("lock poisoned").clear();
    }
}

impl Default for InMemoryFileSystem {
    fn default() -> Self {
        Self::new(DigestAlgorithm::default())
    }
}

/// `a` and `a/b` cannot both exist; on disk one would need to be a file and
/// a directory at once.
fn keys_conflict(a: &ObjectKey, b: &ObjectKey) -> bool {
    let (a, b) = (a.as_str(), b.as_str());
    let nested = |outer: &str, inner: &str| {
        inner.len() > outer.len() && inner.starts_with(outer) && inner.as_bytes()[outer.len()] == b'/'
    };
    nested(a, b) || nested(b, a)
}

#[async_trait]
impl FileSystem for InMemoryFileSystem {
    async fn create(
        &self,
        bucket: &Bucket,
        key: &str,
        body: &mut dyn BodyReader,
        expected_len: Option<u64>,
    ) -> StoreResult<CreatedObject> {
        let key = parse_key(key)?;
        if bucket.policy.read_only {
            return Err(StoreError::ReadOnly(bucket.name.to_string()));
        }
        let limits = CopyLimits {
            max_size: bucket.policy.max_object_size,
            expected_len,
        };

        let mut data = Vec::new();
        let mut hasher = ContentHasher::new(self.algorithm);
        let size = copy_hashed(body, &mut data, &mut hasher, limits).await?;
        let digest = hasher.finalize();
        let last_modified = Utc::now();

        let mut map = self.objects.write().expect("lock poisoned");
        let conflict = map
            .keys()
            .any(|(b, k)| *b == bucket.name && keys_conflict(k, &key));
        if conflict {
            return Err(StoreError::KeyConflict {
                bucket: bucket.name.to_string(),
                key: key.to_string(),
            });
        }
        map.insert(
            (bucket.name.clone(), key.clone()),
            MemoryObject {
                data: Bytes::from(data),
                last_modified,
            },
        );

        Ok(CreatedObject {
            info: ObjectInfo {
                bucket: bucket.name.clone(),
                key,
                size,
                last_modified,
            },
            digest,
        })
    }

    async fn open(&self, bucket: &Bucket, key: &str) -> StoreResult<OpenedObject> {
        let key = parse_key(key)?;
        let map = self.objects.read().expect("lock poisoned");
        let Some(obj) = map.get(&(bucket.name.clone(), key.clone())).cloned() else {
            return Err(StoreError::FileNotFound {
                bucket: bucket.name.to_string(),
                key: key.to_string(),
            });
        };
        drop(map);

        let info = ObjectInfo {
            bucket: bucket.name.clone(),
            key,
            size: obj.data.len() as u64,
            last_modified: obj.last_modified,
        };
        Ok(OpenedObject::new(info, Box::new(Cursor::new(obj.data))))
    }

    fn algorithm(&self) -> DigestAlgorithm {
        self.algorithm
    }
}

impl std::fmt::Debug for InMemoryFileSystem {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let count = self.len();
        f.debug_struct("InMemoryFileSystem")
            .field("algorithm", &self.algorithm)
            .field("object_count", &count)
            .finish()
    }
}
