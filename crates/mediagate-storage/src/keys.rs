//! Naming of transient artifacts.
//!
//! Staged content lives at `replace.{name}` and backups at `backup.{key}`;
//! neither prefix may start the name of an uploaded file.

use mediagate_core::constants::{BACKUP_PREFIX, RESERVED_PREFIXES, STAGING_PREFIX};

/// Key of the staged replacement for `file_name`.
pub fn staging_key(file_name: &str) -> String {
    format!("{}{}", STAGING_PREFIX, file_name)
}

/// Key of the backup taken for `key` while it is being swapped or removed.
pub fn backup_key(key: &str) -> String {
    format!("{}{}", BACKUP_PREFIX, key)
}

/// The reserved prefix `file_name` starts with, if any.
pub fn reserved_prefix(file_name: &str) -> Option<&'static str> {
    RESERVED_PREFIXES
        .iter()
        .copied()
        .find(|prefix| file_name.starts_with(prefix))
}
