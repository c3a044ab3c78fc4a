use std::collections::BTreeSet;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::checksums::ChecksumConfig;
use crate::error::{Error, InvalidArchive, Result};
use crate::logging::sanitize_field;

/// One `[[archive]]` block.
///
/// Missing keys deserialize to empty values so that `check_valid` reports
/// them, rather than the parser.
#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(default, deny_unknown_fields)]
pub struct ArchiveConfig {
    pub name: String,
    pub id: u32,
    pub root: PathBuf,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub checksums: Option<ChecksumConfig>,
}

impl ArchiveConfig {
    pub fn new(name: impl Into<String>, id: u32, root: impl Into<PathBuf>) -> Self {
        Self {
            name: name.into(),
            id,
            root: root.into(),
            checksums: None,
        }
    }

    pub fn with_checksums(mut self, checksums: ChecksumConfig) -> Self {
        self.checksums = Some(checksums);
        self
    }

    /// Checks this entry on its own. Id uniqueness is the set's concern.
    pub fn check_valid(&self) -> Result<()> {
        if self.name.trim().is_empty() {
            return Err(self.invalid(InvalidArchive::EmptyName));
        }
        if self.id == 0 {
            return Err(self.invalid(InvalidArchive::ZeroId));
        }
        if self.root.as_os_str().is_empty() {
            return Err(self.invalid(InvalidArchive::EmptyRoot));
        }
        check_root(&self.root)
            .map_err(|detail| self.invalid(InvalidArchive::RootInaccessible(detail)))
    }

    fn invalid(&self, reason: InvalidArchive) -> Error {
        Error::Validation {
            id: self.id,
            name: self.name.clone(),
            reason,
        }
    }
}

impl fmt::Display for ArchiveConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}", self.id, self.name, self.root.display())
    }
}

fn check_root(root: &Path) -> std::result::Result<(), String> {
    let meta = fs::metadata(root).map_err(|e| e.to_string())?;
    if !meta.is_dir() {
        return Err("not a directory".into());
    }
    fs::read_dir(root).map_err(|e| e.to_string())?;
    Ok(())
}

/// Archives in file order.
#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(transparent)]
pub struct ArchiveSet(Vec<ArchiveConfig>);

impl ArchiveSet {
    pub fn new(archives: Vec<ArchiveConfig>) -> Self {
        Self(archives)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, ArchiveConfig> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn get(&self, id: u32) -> Option<&ArchiveConfig> {
        self.0.iter().find(|a| a.id == id)
    }

    pub fn ids(&self) -> impl Iterator<Item = u32> + '_ {
        self.0.iter().map(|a| a.id)
    }

    /// Validates every entry and rejects repeated ids. The first failure is
    /// returned.
    pub fn check_valid(&self) -> Result<()> {
        let mut seen = BTreeSet::<u32>::new();
        for archive in &self.0 {
            let res = archive.check_valid().and_then(|()| {
                if seen.insert(archive.id) {
                    Ok(())
                } else {
                    Err(archive.invalid(InvalidArchive::DuplicateId))
                }
            });
            if let Err(err) = res {
                warn!(
                    archive_id = archive.id,
                    name = %sanitize_field(&archive.name),
                    "archive failed validation: {err}"
                );
                return Err(err);
            }
        }
        if self.0.is_empty() {
            warn!("no archives configured");
        }
        Ok(())
    }
}

impl<'a> IntoIterator for &'a ArchiveSet {
    type Item = &'a ArchiveConfig;
    type IntoIter = std::slice::Iter<'a, ArchiveConfig>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

impl From<Vec<ArchiveConfig>> for ArchiveSet {
    fn from(archives: Vec<ArchiveConfig>) -> Self {
        Self(archives)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn reason(err: Error) -> InvalidArchive {
        match err {
            Error::Validation { reason, .. } => reason,
            other => panic!("expected validation error, got {other}"),
        }
    }

    #[test]
    fn accepts_existing_root() {
        let tmp = tempfile::tempdir().expect("tempdir");
        ArchiveConfig::new("1", 1, tmp.path())
            .check_valid()
            .expect("valid archive");
    }

    #[test]
    fn rejects_each_broken_field() {
        let tmp = tempfile::tempdir().expect("tempdir");

        let err = ArchiveConfig::new("  ", 1, tmp.path()).check_valid().unwrap_err();
        assert_eq!(reason(err), InvalidArchive::EmptyName);

        let err = ArchiveConfig::new("a", 0, tmp.path()).check_valid().unwrap_err();
        assert_eq!(reason(err), InvalidArchive::ZeroId);

        let err = ArchiveConfig::new("a", 1, "").check_valid().unwrap_err();
        assert_eq!(reason(err), InvalidArchive::EmptyRoot);

        let missing = tmp.path().join("missing");
        let err = ArchiveConfig::new("a", 1, &missing).check_valid().unwrap_err();
        assert!(matches!(reason(err), InvalidArchive::RootInaccessible(_)));
    }

    #[test]
    fn file_root_is_not_accessible_as_archive() {
        let tmp = tempfile::tempdir().expect("tempdir");
        let file = tmp.path().join("plain");
        fs::write(&file, "x").expect("write");
        let err = ArchiveConfig::new("a", 1, &file).check_valid().unwrap_err();
        assert_eq!(
            reason(err),
            InvalidArchive::RootInaccessible("not a directory".into())
        );
    }

    #[test]
    fn set_rejects_duplicate_ids() {
        let tmp = tempfile::tempdir().expect("tempdir");
        let set = ArchiveSet::new(vec![
            ArchiveConfig::new("a", 7, tmp.path()),
            ArchiveConfig::new("b", 7, tmp.path()),
        ]);
        let err = set.check_valid().unwrap_err();
        assert!(err.to_string().contains("duplicate archive id"), "unexpected err: {err}");
        assert_eq!(reason(err), InvalidArchive::DuplicateId);
    }

    #[test]
    fn set_accepts_unique_ids_and_empty_set() {
        let tmp = tempfile::tempdir().expect("tempdir");
        let set = ArchiveSet::new(vec![
            ArchiveConfig::new("a", 1, tmp.path()),
            ArchiveConfig::new("b", 2, tmp.path()),
        ]);
        set.check_valid().expect("unique ids");
        assert_eq!(set.ids().collect::<Vec<_>>(), vec![1, 2]);
        assert_eq!(set.get(2).map(|a| a.name.as_str()), Some("b"));

        ArchiveSet::default().check_valid().expect("empty set");
    }

    #[test]
    fn display_is_id_name_root() {
        let a = ArchiveConfig::new("tape", 3, "/srv/tape");
        assert_eq!(a.to_string(), "3:tape:/srv/tape");
    }
}
