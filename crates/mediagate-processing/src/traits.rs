use async_trait::async_trait;
use mediagate_core::{AppError, MediaAttributes};
use std::path::Path;

/// Reads the attribute set of a stored media file.
///
/// Failures are reported as [`AppError::Metadata`] so the caller can roll
/// back whatever it already wrote.
#[async_trait]
pub trait MetadataExtractor: Send + Sync {
    async fn extract(&self, path: &Path) -> Result<MediaAttributes, AppError>;
}
