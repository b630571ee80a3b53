//! Attachment storage for forms items.
//!
//! The content store only talks to the [`FileStore`] trait; the disk-backed
//! implementation keeps files under the configured upload directory.

use std::path::PathBuf;

use async_trait::async_trait;
use chrono::Utc;

use crate::errors::AppError;

/// Storage backend for uploaded attachments.
#[async_trait]
pub trait FileStore: Send + Sync {
    fn backend_tag(&self) -> &'static str;

    /// Persist the bytes under a freshly generated name and return that name.
    async fn save(&self, original_name: &str, bytes: &[u8]) -> Result<String, AppError>;

    /// Read a stored file; `None` when it does not exist.
    async fn read(&self, filename: &str) -> Result<Option<Vec<u8>>, AppError>;

    /// Remove a stored file. Removing a missing file succeeds.
    async fn remove(&self, filename: &str) -> Result<(), AppError>;
}

/// Files on local disk, one flat directory.
pub struct DiskFileStore {
    root: PathBuf,
}

impl DiskFileStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn path_for(&self, filename: &str) -> Result<PathBuf, AppError> {
        if !is_safe_filename(filename) {
            return Err(AppError::BadRequest(format!(
                "Invalid attachment name: {}",
                filename
            )));
        }
        Ok(self.root.join(filename))
    }
}

#[async_trait]
impl FileStore for DiskFileStore {
    fn backend_tag(&self) -> &'static str {
        "disk"
    }

    async fn save(&self, original_name: &str, bytes: &[u8]) -> Result<String, AppError> {
        tokio::fs::create_dir_all(&self.root).await?;

        let filename = generate_stored_filename(original_name);
        let path = self.path_for(&filename)?;
        tokio::fs::write(&path, bytes).await?;

        tracing::info!("Attachment stored: {} ({} bytes)", filename, bytes.len());
        Ok(filename)
    }

    async fn read(&self, filename: &str) -> Result<Option<Vec<u8>>, AppError> {
        let path = self.path_for(filename)?;
        match tokio::fs::read(&path).await {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    async fn remove(&self, filename: &str) -> Result<(), AppError> {
        let path = self.path_for(filename)?;
        match tokio::fs::remove_file(&path).await {
            Ok(()) => {
                tracing::info!("Attachment removed: {}", filename);
                Ok(())
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!("Attachment {} already absent", filename);
                Ok(())
            }
            Err(e) => Err(e.into()),
        }
    }
}

/// Build a unique stored name: millisecond timestamp, random suffix, original extension.
pub fn generate_stored_filename(original_name: &str) -> String {
    let suffix = uuid::Uuid::new_v4().simple().to_string();
    let stamp = Utc::now().timestamp_millis();
    match attachment_extension(original_name) {
        Some(ext) => format!("{}-{}.{}", stamp, &suffix[..8], ext),
        None => format!("{}-{}", stamp, &suffix[..8]),
    }
}

/// Lowercased extension of an uploaded file, if it looks like one.
pub fn attachment_extension(original_name: &str) -> Option<String> {
    let (stem, ext) = original_name.rsplit_once('.')?;
    if stem.is_empty() || ext.is_empty() || ext.len() > 8 {
        return None;
    }
    if !ext.chars().all(|c| c.is_ascii_alphanumeric()) {
        return None;
    }
    Some(ext.to_ascii_lowercase())
}

/// Reject path traversal and special characters.
fn is_safe_filename(filename: &str) -> bool {
    !filename.is_empty()
        && !filename.contains("..")
        && !filename.contains('/')
        && !filename.contains('\\')
        && !filename.contains('\0')
}
