use std::collections::BTreeMap;
use std::sync::RwLock;

use async_trait::async_trait;
use cask_types::{Bucket, BucketName};

use crate::error::{ProviderError, ProviderResult};
use crate::traits::Provider;

/// In-memory bucket registry.
///
/// Intended for tests and embedding. Buckets are kept in a `BTreeMap`, which
/// gives `list` its name ordering for free.
#[derive(Default)]
pub struct InMemoryProvider {
    buckets: RwLock<BTreeMap<BucketName, Bucket>>,
}

impl InMemoryProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// A provider pre-populated with `buckets`.
    pub fn with_buckets(buckets: impl IntoIterator<Item = Bucket>) -> Self {
        let provider = Self::new();
        for bucket in buckets {
            provider.insert(bucket);
        }
        provider
    }

    /// Add or replace a bucket.
    pub fn insert(&self, bucket: Bucket) {
        self.buckets
            .write()
            .expect("lock poisoned")
            .insert(bucket.name.clone(), bucket);
    }

    /// Remove a bucket. Returns `true` if it existed.
    pub fn remove(&self, name: &BucketName) -> bool {
        self.buckets.write().expect("lock poisoned").remove(name).is_some()
    }
}

#[async_trait]
impl Provider for InMemoryProvider {
    async fn resolve(&self, name: &str) -> ProviderResult<Bucket> {
        let not_found = || ProviderError::BucketNotFound(name.to_string());
        let Ok(bucket_name) = BucketName::parse(name) else {
            return Err(not_found());
        };
        let buckets = self.buckets.read().expect("lock poisoned");
        match buckets.get(&bucket_name) {
            Some(bucket) if bucket.is_enabled() => Ok(bucket.clone()),
            _ => Err(not_found()),
        }
    }

    async fn list(&self) -> ProviderResult<Vec<Bucket>> {
        let buckets = self.buckets.read().expect("lock poisoned");
        Ok(buckets.values().filter(|b| b.is_enabled()).cloned().collect())
    }
}

impl std::fmt::Debug for InMemoryProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let count = self.buckets.read().expect("lock poisoned").len();
        f.debug_struct("InMemoryProvider")
            .field("bucket_count", &count)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cask_types::BucketPolicy;

    fn bucket(name: &str) -> Bucket {
        Bucket::open(BucketName::parse(name).unwrap())
    }

    #[tokio::test]
    async fn resolve_and_miss() {
        let provider = InMemoryProvider::with_buckets([bucket("media")]);
        assert_eq!(provider.resolve("media").await.unwrap(), bucket("media"));
        assert!(matches!(
            provider.resolve("nosuch").await,
            Err(ProviderError::BucketNotFound(_))
        ));
        assert!(matches!(
            provider.resolve("../media").await,
            Err(ProviderError::BucketNotFound(_))
        ));
    }

    #[tokio::test]
    async fn disabled_buckets_are_hidden() {
        let mut off = bucket("off");
        off.policy = BucketPolicy { enabled: false, ..Default::default() };
        let provider = InMemoryProvider::with_buckets([bucket("on"), off]);

        assert!(provider.resolve("off").await.is_err());
        let listed = provider.list().await.unwrap();
        assert_eq!(listed, vec![bucket("on")]);
    }

    #[tokio::test]
    async fn list_is_ordered_by_name() {
        let provider = InMemoryProvider::with_buckets([bucket("c"), bucket("a"), bucket("b")]);
        let names: Vec<String> = provider
            .list()
            .await
            .unwrap()
            .into_iter()
            .map(|b| b.name.to_string())
            .collect();
        assert_eq!(names, vec!["a", "b", "c"]);
    }

    #[tokio::test]
    async fn insert_and_remove_take_effect() {
        let provider = InMemoryProvider::new();
        provider.insert(bucket("late"));
        assert!(provider.resolve("late").await.is_ok());
        assert!(provider.remove(&BucketName::parse("late").unwrap()));
        assert!(provider.resolve("late").await.is_err());
        assert!(format!("{provider:?}").contains("bucket_count: 0"));
    }
}
