//! Mediagate Core Library
//!
//! Domain models, error types, configuration and naming rules shared by every
//! mediagate component.

pub mod config;
pub mod constants;
pub mod error;
pub mod models;
pub mod public_url;

// Re-export commonly used types
pub use config::Config;
pub use error::{AppError, ErrorMetadata, LogLevel};
pub use models::{Identity, MediaAttributes, Record, RecordRow, RecordState, Role, StateKind};
pub use public_url::public_path;
