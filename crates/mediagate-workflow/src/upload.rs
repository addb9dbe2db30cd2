use mediagate_core::AppError;
use mediagate_storage::UploadReader;
use std::io::Cursor;
use std::path::Path;
use tokio::io::AsyncRead;

/// A named byte stream offered to `add` or `replace`.
///
/// Only the final component of the supplied name is kept, so a client path
/// such as `C:\clips\movie.mp4` becomes `movie.mp4`.
pub struct Upload {
    name: String,
    reader: UploadReader,
}

fn file_name_only(name: &str) -> String {
    name.rsplit(['/', '\\']).next().unwrap_or_default().trim().to_string()
}

impl Upload {
    pub fn new(name: impl AsRef<str>, reader: impl AsyncRead + Send + Unpin + 'static) -> Self {
        Self {
            name: file_name_only(name.as_ref()),
            reader: Box::pin(reader),
        }
    }

    pub fn from_bytes(name: impl AsRef<str>, bytes: impl Into<Vec<u8>>) -> Self {
        Self::new(name, Cursor::new(bytes.into()))
    }

    /// Stream a local file, named after its file name.
    pub async fn from_path(path: &Path) -> Result<Self, AppError> {
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .ok_or_else(|| AppError::InvalidInput(format!("{} has no file name", path.display())))?;
        let file = tokio::fs::File::open(path).await?;
        Ok(Self::new(name, file))
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub(crate) fn into_parts(self) -> (String, UploadReader) {
        (self.name, self.reader)
    }
}

impl std::fmt::Debug for Upload {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Upload").field("name", &self.name).finish()
    }
}
