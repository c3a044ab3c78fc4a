use serde::{Deserialize, Serialize};

use crate::mover::MoverChecksums;

/// Checksum policy as written in a `[checksums]` block.
///
/// Whether a block was written at all is tracked by wrapping this in an
/// `Option`; an omitted boolean inside a block means `false`.
#[derive(Debug, Clone, Copy, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(default, deny_unknown_fields, rename_all = "kebab-case")]
pub struct ChecksumConfig {
    pub disabled: bool,
    pub disable_compare_on_restore: bool,
}

impl ChecksumConfig {
    pub fn to_mover(self) -> MoverChecksums {
        MoverChecksums {
            disabled: self.disabled,
            disable_compare_on_restore: self.disable_compare_on_restore,
        }
    }
}

/// Picks the archive override when present, otherwise the global policy.
///
/// The override replaces the global policy as a whole; fields are never
/// mixed between the two.
pub fn resolve(archive: Option<ChecksumConfig>, global: ChecksumConfig) -> ChecksumConfig {
    archive.unwrap_or(global)
}
