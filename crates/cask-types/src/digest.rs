use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::TypeError;

/// Hash function used to compute object digests.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DigestAlgorithm {
    /// SHA-1, 20-byte output. The wire-compatible default.
    #[default]
    Sha1,
    /// BLAKE3, 32-byte output.
    Blake3,
}

impl DigestAlgorithm {
    /// Length in bytes of a digest produced by this algorithm.
    pub const fn output_len(self) -> usize {
        match self {
            Self::Sha1 => 20,
            Self::Blake3 => 32,
        }
    }

    /// Lowercase name as used in configuration and JSON.
    pub const fn name(self) -> &'static str {
        match self {
            Self::Sha1 => "sha1",
            Self::Blake3 => "blake3",
        }
    }
}

impl fmt::Display for DigestAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for DigestAlgorithm {
    type Err = TypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "sha1" | "sha-1" => Ok(Self::Sha1),
            "blake3" => Ok(Self::Blake3),
            other => Err(TypeError::UnknownAlgorithm(other.to_string())),
        }
    }
}

/// Content digest of a stored object.
///
/// A `Digest` is always exactly [`DigestAlgorithm::output_len`] bytes long
/// for its algorithm. Identical content hashed with the same algorithm
/// always produces the same digest, which makes it usable as an integrity
/// token handed back to uploaders.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct Digest {
    algorithm: DigestAlgorithm,
    bytes: Vec<u8>,
}

impl Digest {
    /// Build a digest from raw output bytes, checking the length.
    pub fn new(algorithm: DigestAlgorithm, bytes: impl Into<Vec<u8>>) -> Result<Self, TypeError> {
        let bytes = bytes.into();
        if bytes.len() != algorithm.output_len() {
            return Err(TypeError::InvalidLength {
                expected: algorithm.output_len(),
                actual: bytes.len(),
            });
        }
        Ok(Self { algorithm, bytes })
    }

    /// Parse from a hex string.
    pub fn from_hex(algorithm: DigestAlgorithm, s: &str) -> Result<Self, TypeError> {
        let bytes = hex::decode(s).map_err(|e| TypeError::InvalidHex(e.to_string()))?;
        Self::new(algorithm, bytes)
    }

    pub fn algorithm(&self) -> DigestAlgorithm {
        self.algorithm
    }

    /// The raw digest bytes.
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    /// Always `false`; every algorithm has a non-zero output length.
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Hex-encoded string representation.
    pub fn to_hex(&self) -> String {
        hex::encode(&self.bytes)
    }

    /// Short hex representation (first 8 characters).
    pub fn short_hex(&self) -> String {
        hex::encode(&self.bytes[..4])
    }
}

impl fmt::Debug for Digest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Digest({}:{})", self.algorithm, self.short_hex())
    }
}

impl fmt::Display for Digest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

impl AsRef<[u8]> for Digest {
    fn as_ref(&self) -> &[u8] {
        &self.bytes
    }
}
