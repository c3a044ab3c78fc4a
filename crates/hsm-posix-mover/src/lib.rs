pub mod archive;
pub mod checksums;
pub mod config;
pub mod error;
pub mod logging;
pub mod mover;

pub use archive::{ArchiveConfig, ArchiveSet};
pub use checksums::ChecksumConfig;
pub use config::{EnvSnapshot, PosixConfig};
pub use error::{Error, InvalidArchive, Result};
pub use mover::{ClientRoot, MoverChecksums, MoverSet, PosixMover, create_movers, provision};
