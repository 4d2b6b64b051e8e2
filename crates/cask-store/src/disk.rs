use std::fs::Metadata;
use std::io;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};

use async_trait::async_trait;
use cask_crypto::ContentHasher;
use cask_types::{Bucket, BucketName, DigestAlgorithm, ObjectKey};
use chrono::{DateTime, Utc};
use tokio::fs::{self, OpenOptions};
use tracing::{debug, info, warn};

use crate::error::{parse_key, StoreError, StoreResult};
use crate::layout::Layout;
use crate::object::{CreatedObject, ObjectInfo, OpenedObject};
use crate::stream::{copy_hashed, CopyLimits};
use crate::traits::{BodyReader, FileSystem};

/// Staging files untouched for this long are treated as orphans of a
/// crashed writer. Live uploads rewrite their file's mtime with every chunk.
pub const STALE_STAGING_AGE: Duration = Duration::from_secs(24 * 60 * 60);

/// Durable object store rooted at a local directory.
///
/// Writes land in `<root>/.staging` under a unique name, are fsynced, and
/// are then renamed into `<root>/<bucket>/<key>`. The rename is the commit
/// point: readers see either the previous object or the new one in full.
/// No lock is held across operations; concurrent writers to one key race
/// and the last rename wins.
#[derive(Debug)]
pub struct DiskFileSystem {
    layout: Layout,
    algorithm: DigestAlgorithm,
}

impl DiskFileSystem {
    /// Open (or create) a store at `root`.
    ///
    /// Staging artifacts older than [`STALE_STAGING_AGE`] are removed. Newer
    /// ones may belong to an upload in another handle on the same root and
    /// are left alone.
    pub async fn open(root: impl Into<PathBuf>, algorithm: DigestAlgorithm) -> StoreResult<Self> {
        Self::open_with_staging_age(root, algorithm, STALE_STAGING_AGE).await
    }

    /// [`Self::open`] with an explicit age after which staging files are swept.
    pub async fn open_with_staging_age(
        root: impl Into<PathBuf>,
        algorithm: DigestAlgorithm,
        stale_after: Duration,
    ) -> StoreResult<Self> {
        let layout = Layout::new(root);
        fs::create_dir_all(layout.staging_dir()).await?;

        let store = Self { layout, algorithm };
        let swept = store.sweep_staging(stale_after).await?;
        info!(
            root = %store.root().display(),
            %algorithm,
            swept,
            "opened disk store"
        );
        Ok(store)
    }

    pub fn root(&self) -> &Path {
        self.layout.root()
    }

    pub fn layout(&self) -> &Layout {
        &self.layout
    }

    /// Remove staging artifacts last modified at least `stale_after` ago.
    /// Returns how many were removed.
    async fn sweep_staging(&self, stale_after: Duration) -> StoreResult<usize> {
        let mut entries = fs::read_dir(self.layout.staging_dir()).await?;
        let mut removed = 0;
        let now = SystemTime::now();
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if !Layout::is_staging_artifact(&path) {
                continue;
            }
            let stale = match entry.metadata().await.and_then(|meta| meta.modified()) {
                Ok(modified) => now.duration_since(modified).unwrap_or_default() >= stale_after,
                // Already committed or removed by its writer.
                Err(e) if e.kind() == io::ErrorKind::NotFound => continue,
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "cannot stat staging file");
                    continue;
                }
            };
            if !stale {
                continue;
            }
            match fs::remove_file(&path).await {
                Ok(()) => removed += 1,
                Err(e) => warn!(path = %path.display(), error = %e, "cannot remove orphaned staging file"),
            }
        }
        Ok(removed)
    }

    /// Whether a directory the key needs is occupied by a non-directory.
    async fn has_file_ancestor(&self, bucket: &BucketName, key: &ObjectKey) -> bool {
        for dir in self.layout.intermediate_dirs(bucket, key) {
            match fs::metadata(&dir).await {
                Ok(meta) if meta.is_dir() => continue,
                Ok(_) => return true,
                Err(_) => return false,
            }
        }
        false
    }

    async fn stage_and_commit(
        &self,
        bucket: &Bucket,
        key: &ObjectKey,
        staged: &mut StagedFile,
        body: &mut dyn BodyReader,
        limits: CopyLimits,
    ) -> StoreResult<CreatedObject> {
        let conflict = || StoreError::KeyConflict {
            bucket: bucket.name.to_string(),
            key: key.to_string(),
        };

        // Streaming
        let mut file = OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(staged.path())
            .await?;
        let mut hasher = ContentHasher::new(self.algorithm);
        let size = copy_hashed(body, &mut file, &mut hasher, limits).await?;
        file.sync_all().await?;
        let last_modified = modified_time(&file.metadata().await?)?;
        drop(file);
        let digest = hasher.finalize();

        // Commit
        if self.has_file_ancestor(&bucket.name, key).await {
            return Err(conflict());
        }
        let target = self.layout.object_path(&bucket.name, key);
        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent).await?;
        }
        if fs::metadata(&target).await.is_ok_and(|meta| meta.is_dir()) {
            return Err(conflict());
        }
        fs::rename(staged.path(), &target).await?;
        staged.disarm();

        if let Some(parent) = target.parent() {
            if let Err(e) = sync_dir(parent).await {
                warn!(path = %parent.display(), error = %e, "directory sync after commit failed");
            }
        }

        Ok(CreatedObject {
            info: ObjectInfo {
                bucket: bucket.name.clone(),
                key: key.clone(),
                size,
                last_modified,
            },
            digest,
        })
    }
}

#[async_trait]
impl FileSystem for DiskFileSystem {
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

        let mut staged = StagedFile::new(self.layout.new_staging_path());
        match self.stage_and_commit(bucket, &key, &mut staged, body, limits).await {
            Ok(created) => {
                debug!(
                    bucket = %bucket.name,
                    key = %key,
                    size = created.info.size,
                    digest = %created.digest,
                    "object committed"
                );
                Ok(created)
            }
            Err(e) => {
                warn!(bucket = %bucket.name, key = %key, error = %e, "write aborted");
                Err(e)
            }
        }
    }

    async fn open(&self, bucket: &Bucket, key: &str) -> StoreResult<OpenedObject> {
        let key = parse_key(key)?;
        let path = self.layout.object_path(&bucket.name, &key);
        let not_found = || StoreError::FileNotFound {
            bucket: bucket.name.to_string(),
            key: key.to_string(),
        };

        let file = match fs::File::open(&path).await {
            Ok(file) => file,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Err(not_found()),
            Err(e) => {
                if self.has_file_ancestor(&bucket.name, &key).await {
                    return Err(not_found());
                }
                return Err(e.into());
            }
        };

        let meta = file.metadata().await?;
        if !meta.is_file() {
            return Err(not_found());
        }

        let info = ObjectInfo {
            bucket: bucket.name.clone(),
            key: key.clone(),
            size: meta.len(),
            last_modified: modified_time(&meta)?,
        };
        debug!(bucket = %bucket.name, key = %key, size = info.size, "object opened");
        Ok(OpenedObject::new(info, Box::new(file)))
    }

    fn algorithm(&self) -> DigestAlgorithm {
        self.algorithm
    }
}

/// Staging file that deletes itself unless committed.
///
/// Dropping the guard covers every abort path, including the create future
/// being dropped mid-stream when a client disconnects.
struct StagedFile {
    path: PathBuf,
    armed: bool,
}

impl StagedFile {
    fn new(path: PathBuf) -> Self {
        Self { path, armed: true }
    }

    fn path(&self) -> &Path {
        &self.path
    }

    /// The file was renamed into place; nothing to clean up.
    fn disarm(&mut self) {
        self.armed = false;
    }
}

impl Drop for StagedFile {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }
        match std::fs::remove_file(&self.path) {
            Ok(()) => debug!(path = %self.path.display(), "staging file removed"),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => warn!(path = %self.path.display(), error = %e, "cannot remove staging file"),
        }
    }
}

fn modified_time(meta: &Metadata) -> io::Result<DateTime<Utc>> {
    meta.modified().map(DateTime::<Utc>::from)
}

#[cfg(unix)]
async fn sync_dir(path: &Path) -> io::Result<()> {
    fs::File::open(path).await?.sync_all().await
}

#[cfg(not(unix))]
async fn sync_dir(_path: &Path) -> io::Result<()> {
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::{bucket, bucket_with, random_bytes, FailingReader, StalledReader};
    use cask_types::BucketPolicy;
    use std::sync::Arc;
    use std::time::Duration;
    use tempfile::TempDir;
    use tokio::io::AsyncReadExt;

    async fn temp_store() -> (TempDir, DiskFileSystem) {
        let dir = tempfile::tempdir().unwrap();
        let store = DiskFileSystem::open(dir.path(), DigestAlgorithm::Sha1).await.unwrap();
        (dir, store)
    }

    async fn put(store: &DiskFileSystem, b: &Bucket, key: &str, data: &[u8]) -> CreatedObject {
        let mut body = data;
        store.create(b, key, &mut body, None).await.unwrap()
    }

    async fn get(store: &DiskFileSystem, b: &Bucket, key: &str) -> Vec<u8> {
        store.open(b, key).await.unwrap().read_to_end().await.unwrap()
    }

    fn staging_entries(store: &DiskFileSystem) -> usize {
        std::fs::read_dir(store.layout().staging_dir()).unwrap().count()
    }

    // -----------------------------------------------------------------------
    // Read-after-write and digests
    // -----------------------------------------------------------------------

    #[tokio::test]
    async fn media_clip_scenario() {
        let (_dir, store) = temp_store().await;
        let media = bucket("media");
        let data = random_bytes(1024);

        let created = put(&store, &media, "clip1.mp3", &data).await;
        assert_eq!(created.hash().len(), 20);
        assert_eq!(created.size(), 1024);

        assert_eq!(get(&store, &media, "clip1.mp3").await, data);

        let err = store.open(&media, "missing.mp3").await.unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn digest_matches_rehash_of_committed_bytes() {
        for algorithm in [DigestAlgorithm::Sha1, DigestAlgorithm::Blake3] {
            let dir = tempfile::tempdir().unwrap();
            let store = DiskFileSystem::open(dir.path(), algorithm).await.unwrap();
            let b = bucket("b");
            for len in [0usize, 1, 65_535, 65_536, 65_537, 300_000] {
                let data = random_bytes(len);
                let created = put(&store, &b, "obj", &data).await;
                let stored = get(&store, &b, "obj").await;
                assert_eq!(*created.hash(), ContentHasher::hash(algorithm, &stored));
                assert_eq!(created.size(), len as u64);
            }
        }
    }

    #[tokio::test]
    async fn zero_length_object() {
        let (_dir, store) = temp_store().await;
        let b = bucket("b");
        let created = put(&store, &b, "empty", b"").await;
        assert_eq!(created.size(), 0);
        let opened = store.open(&b, "empty").await.unwrap();
        assert_eq!(opened.size(), 0);
        assert!(opened.read_to_end().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn nested_keys_create_directories() {
        let (dir, store) = temp_store().await;
        let b = bucket("b");
        put(&store, &b, "a/b/c", b"deep").await;
        assert_eq!(get(&store, &b, "a/b/c").await, b"deep");
        assert!(dir.path().join("b/a/b/c").is_file());
    }

    #[tokio::test]
    async fn interior_dots_are_fine() {
        let (_dir, store) = temp_store().await;
        let b = bucket("b");
        put(&store, &b, "file.v2.txt", b"v2").await;
        assert_eq!(get(&store, &b, "file.v2.txt").await, b"v2");
    }

    #[tokio::test]
    async fn second_write_overwrites() {
        let (_dir, store) = temp_store().await;
        let b = bucket("b");
        put(&store, &b, "k", b"first").await;
        let second = put(&store, &b, "k", b"second").await;
        assert_eq!(get(&store, &b, "k").await, b"second");
        assert_eq!(*second.hash(), ContentHasher::hash(DigestAlgorithm::Sha1, b"second"));
    }

    #[tokio::test]
    async fn buckets_are_separate_namespaces() {
        let (_dir, store) = temp_store().await;
        put(&store, &bucket("one"), "k", b"1").await;
        put(&store, &bucket("two"), "k", b"2").await;
        assert_eq!(get(&store, &bucket("one"), "k").await, b"1");
        assert_eq!(get(&store, &bucket("two"), "k").await, b"2");
    }

    #[tokio::test]
    async fn range_read_from_disk() {
        let (_dir, store) = temp_store().await;
        let b = bucket("b");
        put(&store, &b, "k", b"0123456789").await;
        let mut out = Vec::new();
        store
            .open(&b, "k")
            .await
            .unwrap()
            .read_range(2..5)
            .await
            .unwrap()
            .read_to_end(&mut out)
            .await
            .unwrap();
        assert_eq!(out, b"234");
    }

    #[tokio::test]
    async fn last_modified_is_reported() {
        let (_dir, store) = temp_store().await;
        let b = bucket("b");
        let before = Utc::now() - chrono::Duration::seconds(5);
        let created = put(&store, &b, "k", b"x").await;
        assert!(created.info.last_modified >= before);
        let opened = store.open(&b, "k").await.unwrap();
        assert_eq!(opened.last_modified(), created.info.last_modified);
    }

    // -----------------------------------------------------------------------
    // Atomicity
    // -----------------------------------------------------------------------

    #[tokio::test]
    async fn failed_stream_leaves_nothing_behind() {
        let (_dir, store) = temp_store().await;
        let b = bucket("b");
        let mut body = FailingReader::new(random_bytes(100_000), 70_000);
        let err = store.create(&b, "k", &mut body, None).await.unwrap_err();
        assert!(matches!(err, StoreError::Io(_)));

        assert!(store.open(&b, "k").await.unwrap_err().is_not_found());
        assert_eq!(staging_entries(&store), 0);
    }

    #[tokio::test]
    async fn failed_stream_keeps_previous_object() {
        let (_dir, store) = temp_store().await;
        let b = bucket("b");
        let original = random_bytes(4096);
        put(&store, &b, "k", &original).await;

        let mut body = FailingReader::new(random_bytes(100_000), 10);
        assert!(store.create(&b, "k", &mut body, None).await.is_err());

        assert_eq!(get(&store, &b, "k").await, original);
        assert_eq!(staging_entries(&store), 0);
    }

    #[tokio::test]
    async fn short_body_is_not_committed() {
        let (_dir, store) = temp_store().await;
        let b = bucket("b");
        let mut body: &[u8] = b"only five";
        let err = store.create(&b, "k", &mut body, Some(100)).await.unwrap_err();
        assert!(matches!(err, StoreError::Io(ref e) if e.kind() == io::ErrorKind::UnexpectedEof));
        assert!(store.open(&b, "k").await.unwrap_err().is_not_found());
    }

    #[tokio::test]
    async fn dropped_upload_cleans_staging() {
        let (_dir, store) = temp_store().await;
        let b = bucket("b");
        let mut body = StalledReader::new(random_bytes(1000));
        let result =
            tokio::time::timeout(Duration::from_millis(50), store.create(&b, "k", &mut body, None))
                .await;
        assert!(result.is_err(), "create should still be waiting for the body");
        assert_eq!(staging_entries(&store), 0);
        assert!(store.open(&b, "k").await.unwrap_err().is_not_found());
    }

    fn backdate(path: &Path, age: Duration) {
        let file = std::fs::File::options().write(true).open(path).unwrap();
        file.set_modified(SystemTime::now() - age).unwrap();
    }

    #[tokio::test]
    async fn open_sweeps_stale_staging_only() {
        let dir = tempfile::tempdir().unwrap();
        let staging = dir.path().join(crate::layout::STAGING_DIR);
        std::fs::create_dir_all(&staging).unwrap();
        std::fs::write(staging.join("0190-orphan.part"), b"torn").unwrap();
        backdate(&staging.join("0190-orphan.part"), STALE_STAGING_AGE + Duration::from_secs(60));
        std::fs::write(staging.join("0191-recent.part"), b"in flight").unwrap();
        std::fs::write(staging.join("keep.txt"), b"not ours").unwrap();
        backdate(&staging.join("keep.txt"), STALE_STAGING_AGE * 2);

        let store = DiskFileSystem::open(dir.path(), DigestAlgorithm::Sha1).await.unwrap();
        assert!(!staging.join("0190-orphan.part").exists());
        assert!(staging.join("0191-recent.part").exists());
        assert!(staging.join("keep.txt").exists());
        assert_eq!(staging_entries(&store), 2);

        DiskFileSystem::open_with_staging_age(dir.path(), DigestAlgorithm::Sha1, Duration::ZERO)
            .await
            .unwrap();
        assert!(!staging.join("0191-recent.part").exists());
    }

    #[tokio::test]
    async fn second_open_leaves_live_upload_intact() {
        use tokio::io::AsyncWriteExt;

        let (dir, store) = temp_store().await;
        let b = bucket("media");
        let data = random_bytes(256 * 1024);
        let (mut client, mut server) = tokio::io::duplex(16 * 1024);

        let upload = {
            let b = b.clone();
            async move { store.create(&b, "live.bin", &mut server, None).await.map(|c| (c, store)) }
        };
        let feed = async {
            let half = data.len() / 2;
            client.write_all(&data[..half]).await.unwrap();
            // Give the upload time to stage what it has.
            tokio::time::sleep(Duration::from_millis(20)).await;
            let other = DiskFileSystem::open(dir.path(), DigestAlgorithm::Sha1).await.unwrap();
            client.write_all(&data[half..]).await.unwrap();
            client.shutdown().await.unwrap();
            drop(client);
            other
        };

        let (result, other) = tokio::join!(upload, feed);
        let (created, store) = result.unwrap();
        assert_eq!(created.size(), data.len() as u64);
        assert_eq!(get(&store, &b, "live.bin").await, data);
        assert_eq!(get(&other, &b, "live.bin").await, data);
        assert_eq!(staging_entries(&store), 0);
    }

    // -----------------------------------------------------------------------
    // Policy and validation
    // -----------------------------------------------------------------------

    #[tokio::test]
    async fn read_only_bucket_rejects_writes() {
        let (_dir, store) = temp_store().await;
        let b = bucket_with("ro", BucketPolicy { read_only: true, ..Default::default() });
        let mut body: &[u8] = b"data";
        let err = store.create(&b, "k", &mut body, None).await.unwrap_err();
        assert!(matches!(err, StoreError::ReadOnly(ref name) if name == "ro"));
    }

    #[tokio::test]
    async fn oversized_object_is_aborted() {
        let (_dir, store) = temp_store().await;
        let b = bucket_with("small", BucketPolicy { max_object_size: Some(100), ..Default::default() });
        put(&store, &b, "k", &[1u8; 100]).await;

        let mut body: &[u8] = &[2u8; 101];
        let err = store.create(&b, "k", &mut body, None).await.unwrap_err();
        assert!(matches!(err, StoreError::ObjectTooLarge { limit: 100 }));
        assert_eq!(get(&store, &b, "k").await, vec![1u8; 100]);
        assert_eq!(staging_entries(&store), 0);
    }

    #[tokio::test]
    async fn traversal_keys_are_invalid() {
        let (_dir, store) = temp_store().await;
        let b = bucket("b");
        for key in ["..", "../escape", "a/../../b", "a/./b", "", "a//b", "bad key"] {
            let mut body: &[u8] = b"x";
            let err = store.create(&b, key, &mut body, None).await.unwrap_err();
            assert!(matches!(err, StoreError::InvalidKey { .. }), "create {key:?}: {err:?}");
            let err = store.open(&b, key).await.unwrap_err();
            assert!(matches!(err, StoreError::InvalidKey { .. }), "open {key:?}: {err:?}");
        }
    }

    #[tokio::test]
    async fn key_under_existing_object_conflicts() {
        let (_dir, store) = temp_store().await;
        let b = bucket("b");
        put(&store, &b, "a", b"file").await;

        let mut body: &[u8] = b"nested";
        let err = store.create(&b, "a/b", &mut body, None).await.unwrap_err();
        assert!(matches!(err, StoreError::KeyConflict { .. }));
        assert_eq!(get(&store, &b, "a").await, b"file");
        assert_eq!(staging_entries(&store), 0);

        assert!(store.open(&b, "a/b").await.unwrap_err().is_not_found());
    }

    #[tokio::test]
    async fn key_naming_a_directory_conflicts() {
        let (_dir, store) = temp_store().await;
        let b = bucket("b");
        put(&store, &b, "a/b", b"nested").await;

        let mut body: &[u8] = b"flat";
        let err = store.create(&b, "a", &mut body, None).await.unwrap_err();
        assert!(matches!(err, StoreError::KeyConflict { .. }));
        assert!(store.open(&b, "a").await.unwrap_err().is_not_found());
        assert_eq!(get(&store, &b, "a/b").await, b"nested");
    }

    // -----------------------------------------------------------------------
    // Concurrency
    // -----------------------------------------------------------------------

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn parallel_writes_to_distinct_keys() {
        let (_dir, store) = temp_store().await;
        let store = Arc::new(store);
        let b = bucket("b");

        let mut tasks = Vec::new();
        for i in 0..16 {
            let store = Arc::clone(&store);
            let b = b.clone();
            tasks.push(tokio::spawn(async move {
                let data = vec![i as u8; 10_000 + i];
                let mut body = &data[..];
                store.create(&b, &format!("k{i}"), &mut body, None).await.unwrap();
                data
            }));
        }
        for (i, task) in tasks.into_iter().enumerate() {
            let data = task.await.unwrap();
            assert_eq!(get(&store, &b, &format!("k{i}")).await, data);
        }
        assert_eq!(staging_entries(&store), 0);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn racing_writes_to_one_key_leave_one_whole_object() {
        let (_dir, store) = temp_store().await;
        let store = Arc::new(store);
        let b = bucket("b");

        let payloads: Vec<Vec<u8>> = (0..8u8).map(|i| vec![i; 200_000]).collect();
        let mut tasks = Vec::new();
        for data in payloads.clone() {
            let store = Arc::clone(&store);
            let b = b.clone();
            tasks.push(tokio::spawn(async move {
                let mut body = &data[..];
                store.create(&b, "shared", &mut body, None).await.unwrap()
            }));
        }
        for task in tasks {
            task.await.unwrap();
        }

        let stored = get(&store, &b, "shared").await;
        assert!(payloads.contains(&stored), "stored object must be one complete upload");
    }

    #[tokio::test]
    async fn reader_keeps_old_bytes_across_overwrite() {
        let (_dir, store) = temp_store().await;
        let b = bucket("b");
        put(&store, &b, "k", b"old contents").await;

        let opened = store.open(&b, "k").await.unwrap();
        put(&store, &b, "k", b"new").await;

        assert_eq!(opened.read_to_end().await.unwrap(), b"old contents");
        assert_eq!(get(&store, &b, "k").await, b"new");
    }
}
