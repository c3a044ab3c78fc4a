use std::path::{Path, PathBuf};

use crate::error::{Error, Result};

pub const AGENT_CONN_ENV_VAR: &str = "LHSMD_AGENT_CONNECTION";
pub const CLIENT_MOUNTPOINT_ENV_VAR: &str = "LHSMD_CLIENT_MOUNTPOINT";
pub const CONFIG_DIR_ENV_VAR: &str = "LHSMD_CONFIG_DIR";

/// The runtime parameters handed to the mover by the agent, read once.
///
/// Empty variables count as unset.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EnvSnapshot {
    agent_address: Option<String>,
    client_mountpoint: Option<PathBuf>,
    config_dir: Option<PathBuf>,
}

impl EnvSnapshot {
    pub fn capture() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(mut lookup: impl FnMut(&str) -> Option<String>) -> Self {
        let mut get = |key: &str| lookup(key).filter(|v| !v.is_empty());
        Self {
            agent_address: get(AGENT_CONN_ENV_VAR),
            client_mountpoint: get(CLIENT_MOUNTPOINT_ENV_VAR).map(PathBuf::from),
            config_dir: get(CONFIG_DIR_ENV_VAR).map(PathBuf::from),
        }
    }

    pub fn agent_address(&self) -> Option<&str> {
        self.agent_address.as_deref()
    }

    pub fn client_mountpoint(&self) -> Option<&Path> {
        self.client_mountpoint.as_deref()
    }

    pub fn config_dir(&self) -> Option<&Path> {
        self.config_dir.as_deref()
    }

    pub fn require_config_dir(&self) -> Result<&Path> {
        self.config_dir().ok_or(Error::MissingEnvironment {
            var: CONFIG_DIR_ENV_VAR,
        })
    }
}
