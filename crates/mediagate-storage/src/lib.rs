//! Mediagate Storage Library
//!
//! File-store abstraction used by the workflow engine and its local
//! filesystem implementation.
//!
//! # Key format
//!
//! The store is a flat directory: a key is a plain file name. Keys must not be
//! empty, contain path separators, or be `.`/`..`. Names of transient
//! artifacts (staged and backup files) are built in the [`keys`] module.

pub mod keys;
pub mod local;
pub mod traits;

// Re-export commonly used types
pub use local::LocalFileStore;
pub use traits::{FileStore, StorageError, StorageResult, UploadReader};
