//! Constants shared across crates.

/// Prefix of staged replacement content waiting for approval or for a swap.
pub const STAGING_PREFIX: &str = "replace.";

/// Prefix of transient copies of original content held during a swap or removal.
pub const BACKUP_PREFIX: &str = "backup.";

/// Prefixes an uploaded file name may never start with.
pub const RESERVED_PREFIXES: [&str; 2] = [STAGING_PREFIX, BACKUP_PREFIX];

/// Upper bound for a single uploaded stream (50 MiB).
pub const MAX_UPLOAD_BYTES: u64 = 52_428_800;

/// Directory name under which stored files are published.
pub const DEFAULT_PUBLIC_PREFIX: &str = "Videos";

/// Longest file name the store's filesystem accepts, in bytes.
pub const MAX_FILE_NAME_BYTES: usize = 255;
