use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use tracing::{debug, info};

use crate::checksums;
use crate::config::{self, EnvSnapshot, PosixConfig};
use crate::error::{Error, Result};
use crate::logging::sanitize_field;

/// Movers keyed by archive id.
pub type MoverSet = BTreeMap<u32, PosixMover>;

/// Checksum settings as the POSIX backend consumes them.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MoverChecksums {
    pub disabled: bool,
    pub disable_compare_on_restore: bool,
}

impl MoverChecksums {
    pub fn enabled(&self) -> bool {
        !self.disabled
    }

    /// Restores can only be compared when checksums are computed at all.
    pub fn compare_on_restore(&self) -> bool {
        !self.disabled && !self.disable_compare_on_restore
    }
}

/// Access to the primary filesystem mount the agent runs against.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientRoot {
    mountpoint: PathBuf,
}

impl ClientRoot {
    /// Requires `mountpoint` to be an existing directory.
    pub fn new(mountpoint: impl Into<PathBuf>) -> Result<Self> {
        let mountpoint = mountpoint.into();
        ensure_dir(&mountpoint).map_err(|source| Error::MoverCreation {
            archive_id: 0,
            source,
        })?;
        Ok(Self { mountpoint })
    }

    /// A root that is not checked against the filesystem.
    pub fn test(mountpoint: impl Into<PathBuf>) -> Self {
        Self {
            mountpoint: mountpoint.into(),
        }
    }

    pub fn from_config(cfg: &PosixConfig) -> Result<Self> {
        Self::new(cfg.client_root()?)
    }

    pub fn mountpoint(&self) -> &Path {
        &self.mountpoint
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MoverConfig {
    pub name: String,
    pub archive_dir: PathBuf,
    pub checksums: MoverChecksums,
}

/// Data mover bound to a single archive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PosixMover {
    archive_id: u32,
    name: String,
    archive_root: PathBuf,
    client_root: PathBuf,
    checksums: MoverChecksums,
}

impl PosixMover {
    pub fn new(client: &ClientRoot, archive_id: u32, cfg: MoverConfig) -> Result<Self> {
        ensure_dir(&cfg.archive_dir)
            .map_err(|source| Error::MoverCreation { archive_id, source })?;
        Ok(Self {
            archive_id,
            name: cfg.name,
            archive_root: cfg.archive_dir,
            client_root: client.mountpoint().to_path_buf(),
            checksums: cfg.checksums,
        })
    }

    pub fn archive_id(&self) -> u32 {
        self.archive_id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn archive_root(&self) -> &Path {
        &self.archive_root
    }

    pub fn client_root(&self) -> &Path {
        &self.client_root
    }

    pub fn checksum_config(&self) -> MoverChecksums {
        self.checksums
    }
}

fn ensure_dir(path: &Path) -> io::Result<()> {
    let meta = fs::metadata(path)?;
    if !meta.is_dir() {
        return Err(io::Error::other(format!(
            "{} is not a directory",
            path.display()
        )));
    }
    Ok(())
}

/// Builds one mover per configured archive.
///
/// The archive set is validated first. Nothing is returned unless every
/// mover could be created.
pub fn create_movers(client: &ClientRoot, cfg: &PosixConfig) -> Result<MoverSet> {
    cfg.archives.check_valid()?;

    let global = cfg.global_checksums();
    let mut movers = MoverSet::new();
    for archive in &cfg.archives {
        let resolved = checksums::resolve(archive.checksums, global);
        let mover = PosixMover::new(
            client,
            archive.id,
            MoverConfig {
                name: archive.name.clone(),
                archive_dir: archive.root.clone(),
                checksums: resolved.to_mover(),
            },
        )?;
        debug!(
            archive_id = archive.id,
            name = %sanitize_field(&archive.name),
            root = %sanitize_field(&archive.root.display().to_string()),
            inherited = archive.checksums.is_none(),
            checksums_disabled = resolved.disabled,
            compare_on_restore_disabled = resolved.disable_compare_on_restore,
            "created mover"
        );
        movers.insert(archive.id, mover);
    }

    info!(movers = movers.len(), "movers ready");
    Ok(movers)
}

/// Loads the merged configuration named by `env` and creates its movers.
pub fn provision(env: &EnvSnapshot) -> Result<(PosixConfig, MoverSet)> {
    let cfg = config::load_merged(env)?;
    let client = ClientRoot::from_config(&cfg)?;
    let movers = create_movers(&client, &cfg)?;
    Ok((cfg, movers))
}
