use cask_types::{Digest, DigestAlgorithm};
use sha1::Digest as _;

/// Incremental content hasher.
///
/// Wraps one of the supported hash functions behind a single type so the
/// storage engine can be configured with either without being generic over
/// it. The byte count of everything fed in is tracked alongside the hash.
#[derive(Clone)]
pub struct ContentHasher {
    state: HasherState,
    bytes_hashed: u64,
}

#[derive(Clone)]
enum HasherState {
    Sha1(sha1::Sha1),
    Blake3(Box<blake3::Hasher>),
}

impl ContentHasher {
    /// Start a new hash computation.
    pub fn new(algorithm: DigestAlgorithm) -> Self {
        let state = match algorithm {
            DigestAlgorithm::Sha1 => HasherState::Sha1(sha1::Sha1::new()),
            DigestAlgorithm::Blake3 => HasherState::Blake3(Box::new(blake3::Hasher::new())),
        };
        Self {
            state,
            bytes_hashed: 0,
        }
    }

    /// Hash a complete byte slice in one call.
    pub fn hash(algorithm: DigestAlgorithm, data: &[u8]) -> Digest {
        let mut hasher = Self::new(algorithm);
        hasher.update(data);
        hasher.finalize()
    }

    /// Verify that data produces the expected digest.
    pub fn verify(data: &[u8], expected: &Digest) -> bool {
        Self::hash(expected.algorithm(), data) == *expected
    }

    /// Feed the next chunk of content.
    pub fn update(&mut self, chunk: &[u8]) {
        match &mut self.state {
            HasherState::Sha1(h) => h.update(chunk),
            HasherState::Blake3(h) => {
                h.update(chunk);
            }
        }
        self.bytes_hashed += chunk.len() as u64;
    }

    /// Number of bytes fed so far.
    pub fn bytes_hashed(&self) -> u64 {
        self.bytes_hashed
    }

    pub fn algorithm(&self) -> DigestAlgorithm {
        match self.state {
            HasherState::Sha1(_) => DigestAlgorithm::Sha1,
            HasherState::Blake3(_) => DigestAlgorithm::Blake3,
        }
    }

    /// Consume the hasher and produce the digest.
    pub fn finalize(self) -> Digest {
        let (algorithm, bytes) = match self.state {
            HasherState::Sha1(h) => (DigestAlgorithm::Sha1, h.finalize().to_vec()),
            HasherState::Blake3(h) => (DigestAlgorithm::Blake3, h.finalize().as_bytes().to_vec()),
        };
        Digest::new(algorithm, bytes).expect("hash output length matches its algorithm")
    }
}

impl std::fmt::Debug for ContentHasher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ContentHasher")
            .field("algorithm", &self.algorithm())
            .field("bytes_hashed", &self.bytes_hashed)
            .finish()
    }
}
