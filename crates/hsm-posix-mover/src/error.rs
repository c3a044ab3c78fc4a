use std::fmt;
use std::io;
use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("config not found: {}", path.display())]
    ConfigNotFound { path: PathBuf },

    #[error("failed to parse config {}: {reason}", path.display())]
    ConfigParse { path: PathBuf, reason: String },

    #[error("archive {id} ('{name}') is invalid: {reason}")]
    Validation {
        id: u32,
        name: String,
        reason: InvalidArchive,
    },

    #[error("environment variable {var} is not set")]
    MissingEnvironment { var: &'static str },

    #[error("unable to create mover for archive {archive_id}: {source}")]
    MoverCreation {
        archive_id: u32,
        #[source]
        source: io::Error,
    },
}

impl Error {
    pub(crate) fn parse(path: impl Into<PathBuf>, reason: impl fmt::Display) -> Self {
        Self::ConfigParse {
            path: path.into(),
            reason: reason.to_string(),
        }
    }
}

/// Which archive constraint failed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InvalidArchive {
    EmptyName,
    ZeroId,
    DuplicateId,
    EmptyRoot,
    RootInaccessible(String),
}

impl fmt::Display for InvalidArchive {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::EmptyName => write!(f, "name is empty"),
            Self::ZeroId => write!(f, "id 0 is reserved"),
            Self::DuplicateId => write!(f, "duplicate archive id"),
            Self::EmptyRoot => write!(f, "root is empty"),
            Self::RootInaccessible(detail) => write!(f, "root is not accessible: {detail}"),
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
