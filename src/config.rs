//! Configuration loading.
//!
//! Settings live in a YAML file whose path comes from `FROG_CONFIG`,
//! falling back to `conf/frog.yaml`. Every field has a default, so a
//! missing file or a partial file is fine.

use std::path::{Path, PathBuf};

use anyhow::Context;
use serde::{Deserialize, Serialize};

pub const CONFIG_ENV: &str = "FROG_CONFIG";
pub const DEFAULT_CONFIG_PATH: &str = "conf/frog.yaml";

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct Config {
    pub server: ServerConfig,
    /// Directory served by the default GET handler of the demo server.
    pub document_root: PathBuf,
}

/// Listener and connection settings.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct ServerConfig {
    /// IPv4 dotted or IPv6 address to bind; empty means any IPv4 address.
    pub address: String,
    pub port: u16,
    /// Worker threads driving the reactor.
    pub threads: usize,
    /// Allow binding an address still in TIME_WAIT.
    pub reuse_address: bool,
    /// Seconds allowed for a request head; 0 disables.
    pub timeout_request: u64,
    /// Seconds allowed for a body or a response; 0 disables.
    pub timeout_content: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            address: String::new(),
            port: 8080,
            threads: 1,
            reuse_address: true,
            timeout_request: 5,
            timeout_content: 300,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server: ServerConfig::default(),
            document_root: PathBuf::from("www"),
        }
    }
}

impl Config {
    /// Loads from `FROG_CONFIG`, else `conf/frog.yaml` when present, else
    /// defaults.
    pub fn load() -> anyhow::Result<Self> {
        if let Ok(path) = std::env::var(CONFIG_ENV) {
            return Self::from_file(path);
        }

        let fallback = Path::new(DEFAULT_CONFIG_PATH);
        if fallback.exists() {
            return Self::from_file(fallback);
        }

        tracing::debug!("No configuration file found, using defaults");
        Ok(Self::default())
    }

    pub fn from_file(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("reading config {}", path.display()))?;
        Self::from_yaml_str(&text).with_context(|| format!("parsing config {}", path.display()))
    }

    pub fn from_yaml_str(text: &str) -> anyhow::Result<Self> {
        // An empty document deserializes to unit, not to a mapping.
        if text.trim().is_empty() {
            return Ok(Self::default());
        }
        Ok(serde_yaml::from_str(text)?)
    }

    /// Document root made absolute against the current directory.
    pub fn document_root(&self) -> anyhow::Result<PathBuf> {
        if self.document_root.is_absolute() {
            return Ok(self.document_root.clone());
        }
        let cwd = std::env::current_dir().context("resolving current directory")?;
        Ok(cwd.join(&self.document_root))
    }
}
