//! File configuration for the POSIX mover and its merge with the agent's
//! environment.
//!
//! The file is TOML:
//!
//! ```toml
//! num-threads = 8
//!
//! [checksums]
//! disabled = false
//! disable-compare-on-restore = false
//!
//! [[archive]]
//! name = "primary"
//! id = 1
//! root = "/srv/archives/1"
//!
//! [archive.checksums]
//! disabled = true
//! ```
//!
//! The agent address and client mountpoint come only from the environment.

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::archive::ArchiveSet;
use crate::checksums::ChecksumConfig;
use crate::error::{Error, Result};
use crate::logging::sanitize_field;

mod env;

pub use env::{AGENT_CONN_ENV_VAR, CLIENT_MOUNTPOINT_ENV_VAR, CONFIG_DIR_ENV_VAR, EnvSnapshot};

/// File looked up when `load` is given a directory.
pub const CONFIG_FILE_NAME: &str = "hsm-posix-mover.toml";

#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(default, deny_unknown_fields, rename_all = "kebab-case")]
pub struct PosixConfig {
    #[serde(skip)]
    pub agent_address: Option<String>,
    #[serde(skip)]
    pub client_root: Option<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub num_threads: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub checksums: Option<ChecksumConfig>,
    #[serde(rename = "archive", skip_serializing_if = "ArchiveSet::is_empty")]
    pub archives: ArchiveSet,
}

impl PosixConfig {
    /// Fills the runtime fields from `env` and pins the global checksum
    /// policy, so movers always have a concrete fallback.
    pub fn merge(self, env: &EnvSnapshot) -> Self {
        let merged = Self {
            agent_address: env.agent_address().map(ToOwned::to_owned),
            client_root: env.client_mountpoint().map(Path::to_path_buf),
            checksums: Some(self.checksums.unwrap_or_default()),
            ..self
        };
        let client_root = merged
            .client_root
            .as_deref()
            .map(|p| p.display().to_string());
        info!(
            agent_address = %log_value(merged.agent_address.as_deref()),
            client_root = %log_value(client_root.as_deref()),
            archives = merged.archives.len(),
            "merged mover configuration"
        );
        merged
    }

    pub fn agent_address(&self) -> Result<&str> {
        self.agent_address
            .as_deref()
            .ok_or(Error::MissingEnvironment {
                var: AGENT_CONN_ENV_VAR,
            })
    }

    pub fn client_root(&self) -> Result<&Path> {
        self.client_root
            .as_deref()
            .ok_or(Error::MissingEnvironment {
                var: CLIENT_MOUNTPOINT_ENV_VAR,
            })
    }

    /// Global policy, or "everything enabled" for an unmerged config that
    /// had no `[checksums]` block.
    pub fn global_checksums(&self) -> ChecksumConfig {
        self.checksums.unwrap_or_default()
    }

    /// Worker count for the transfer pool (0 or unset = use CPU count).
    pub fn worker_threads(&self) -> usize {
        match self.num_threads {
            Some(n) if n > 0 => n,
            _ => num_cpus::get().max(1),
        }
    }

    /// File-sourced settings rendered back to TOML.
    pub fn to_toml(&self) -> String {
        toml::to_string_pretty(self).unwrap_or_else(|_| format!("{self:?}"))
    }
}

/// Reads a config file, or `CONFIG_FILE_NAME` inside a directory.
pub fn load(path: &Path) -> Result<PosixConfig> {
    let file = resolve_file(path)?;
    let data = fs::read_to_string(&file).map_err(|e| match e.kind() {
        ErrorKind::NotFound => Error::ConfigNotFound { path: file.clone() },
        _ => Error::parse(&file, e),
    })?;
    let cfg: PosixConfig = toml::from_str(&data).map_err(|e| Error::parse(&file, e))?;
    debug!(
        path = %sanitize_field(&file.display().to_string()),
        archives = cfg.archives.len(),
        num_threads = ?cfg.num_threads,
        "loaded mover config"
    );
    Ok(cfg)
}

/// Loads from the directory named by the environment and merges.
pub fn load_merged(env: &EnvSnapshot) -> Result<PosixConfig> {
    let dir = env.require_config_dir()?;
    Ok(load(dir)?.merge(env))
}

fn log_value(value: Option<&str>) -> String {
    value.map_or_else(|| "<unset>".into(), sanitize_field)
}

fn resolve_file(path: &Path) -> Result<PathBuf> {
    if path.is_dir() {
        let file = path.join(CONFIG_FILE_NAME);
        if !file.is_file() {
            return Err(Error::ConfigNotFound { path: file });
        }
        return Ok(file);
    }
    if !path.exists() {
        return Err(Error::ConfigNotFound {
            path: path.to_path_buf(),
        });
    }
    Ok(path.to_path_buf())
}
