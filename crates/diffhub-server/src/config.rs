use std::net::{Ipv4Addr, SocketAddr};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use diffhub_diff::DiffConfig;
use diffhub_notify::NotifyConfig;
use diffhub_processor::ProcessorConfig;

use crate::error::{ServerError, ServerResult};

/// Complete service configuration, read from TOML. Every field has a
/// default, so an empty file is valid.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceConfig {
    pub server: ServerConfig,
    pub processor: ProcessorConfig,
    pub diff: DiffSection,
    pub notify: NotifyConfig,
}

impl ServiceConfig {
    /// Load from `path`; a missing file yields the defaults.
    pub fn load(path: &Path) -> ServerResult<Self> {
        match std::fs::read_to_string(path) {
            Ok(text) => Self::from_toml(&text)
                .map_err(|e| ServerError::Config(format!("{}: {e}", path.display()))),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!(path = %path.display(), "config file not found, using defaults");
                Ok(Self::default())
            }
            Err(e) => Err(e.into()),
        }
    }

    pub fn from_toml(text: &str) -> ServerResult<Self> {
        toml::from_str(text).map_err(|e| ServerError::Config(e.to_string()))
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub bind_addr: SocketAddr,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from((Ipv4Addr::LOCALHOST, 8088)),
        }
    }
}

/// Diff settings plus the repository backend's `git` executable.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DiffSection {
    #[serde(flatten)]
    pub config: DiffConfig,
    pub git_binary: PathBuf,
}

impl Default for DiffSection {
    fn default() -> Self {
        Self {
            config: DiffConfig::default(),
            git_binary: PathBuf::from("git"),
        }
    }
}
