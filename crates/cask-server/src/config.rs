use std::net::SocketAddr;
use std::path::{Path, PathBuf};

use cask_types::DigestAlgorithm;
use serde::{Deserialize, Serialize};

use crate::error::{ServerError, ServerResult};

/// Process configuration for a cask instance.
///
/// Every field has a default, so a config file only needs the values it
/// changes.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ServerConfig {
    pub bind_addr: SocketAddr,
    /// Root of the object store.
    pub fs_root: PathBuf,
    /// Directory holding `<bucket>.toml` policy descriptors.
    pub provider_dir: PathBuf,
    /// Digest computed for every upload.
    pub digest: DigestAlgorithm,
    /// Requests served concurrently; further requests wait.
    pub max_connections: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([127, 0, 0, 1], 5555)),
            fs_root: PathBuf::from("/tmp"),
            provider_dir: PathBuf::from("/tmp"),
            digest: DigestAlgorithm::Sha1,
            max_connections: 1024,
        }
    }
}

impl ServerConfig {
    /// Read a TOML config file.
    pub fn load(path: impl AsRef<Path>) -> ServerResult<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .map_err(|e| ServerError::Config(format!("cannot read {}: {e}", path.display())))?;
        Self::from_toml(&text)
            .map_err(|e| ServerError::Config(format!("{}: {e}", path.display())))
    }

    pub fn from_toml(text: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(text)
    }
}
