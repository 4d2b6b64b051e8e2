use serde::{Deserialize, Serialize};

use crate::name::BucketName;

/// A named namespace and the policy that governs writes into it.
///
/// Buckets are immutable values. The policy layer materializes them from
/// descriptors; the storage engine only reads them.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Bucket {
    pub name: BucketName,
    #[serde(default)]
    pub policy: BucketPolicy,
}

impl Bucket {
    pub fn new(name: BucketName, policy: BucketPolicy) -> Self {
        Self { name, policy }
    }

    /// A bucket with the default (open) policy.
    pub fn open(name: BucketName) -> Self {
        Self::new(name, BucketPolicy::default())
    }

    pub fn is_enabled(&self) -> bool {
        self.policy.enabled
    }
}

/// Per-bucket access policy.
///
/// Every field has a default, so an empty descriptor describes an enabled,
/// writable bucket with no size limit.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct BucketPolicy {
    /// Disabled buckets do not resolve and are left out of listings.
    pub enabled: bool,
    /// Reject every write into this bucket.
    pub read_only: bool,
    /// Largest object, in bytes, a single upload may store.
    pub max_object_size: Option<u64>,
    /// Contact for the bucket, reported in listings.
    pub owner: Option<Owner>,
}

impl Default for BucketPolicy {
    fn default() -> Self {
        Self {
            enabled: true,
            read_only: false,
            max_object_size: None,
            owner: None,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Owner {
    pub email: String,
}
