//! Scratch storage for uploaded images.

use crate::errors::ApiError;
use anyhow::Context;
use std::{
    fs,
    path::{Path, PathBuf},
};
use uuid::Uuid;

pub const ALLOWED_EXTENSIONS: [&str; 3] = ["png", "jpg", "jpeg"];

/// Validate a client file name and return its lowercased extension.
pub fn validate_filename(filename: &str) -> Result<String, ApiError> {
    if filename.is_empty() {
        return Err(ApiError::InvalidInput("No file selected".to_string()));
    }

    allowed_extension(filename).ok_or_else(|| {
        ApiError::InvalidInput("Invalid file type. Please upload PNG or JPG".to_string())
    })
}

fn allowed_extension(filename: &str) -> Option<String> {
    let (_, ext) = filename.rsplit_once('.')?;
    let ext = ext.to_lowercase();
    ALLOWED_EXTENSIONS.contains(&ext.as_str()).then_some(ext)
}

/// Reduce a client supplied name to `[A-Za-z0-9_.-]`, with no path
/// separators and no leading or trailing dots and underscores.
///
/// Only used for logging; stored files are named by a fresh id.
pub fn secure_filename(filename: &str) -> String {
    let flattened: String = filename
        .chars()
        .filter(char::is_ascii)
        .map(|c| if c == '/' || c == '\\' { ' ' } else { c })
        .collect();

    flattened
        .split_whitespace()
        .collect::<Vec<_>>()
        .join("_")
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '.' | '-'))
        .collect::<String>()
        .trim_matches(|c| c == '.' || c == '_')
        .to_string()
}

/// An uploaded image stored as `<upload_dir>/<uuid>.<ext>`.
///
/// The file is removed when the value is dropped, on every exit path of
/// the request. Removal errors are logged and otherwise ignored.
#[derive(Debug)]
pub struct ScratchUpload {
    id: Uuid,
    extension: String,
    path: PathBuf,
}

impl ScratchUpload {
    pub async fn persist(upload_dir: &Path, extension: &str, bytes: &[u8]) -> anyhow::Result<Self> {
        let id = Uuid::new_v4();
        let path = upload_dir.join(format!("{}.{}", id, extension));

        tokio::fs::write(&path, bytes)
            .await
            .with_context(|| format!("failed to save upload to {}", path.display()))?;

        Ok(Self {
            id,
            extension: extension.to_string(),
            path,
        })
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn extension(&self) -> &str {
        &self.extension
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// `<uuid>.<ext>`, also the name of the annotated artifact.
    pub fn file_name(&self) -> String {
        format!("{}.{}", self.id, self.extension)
    }
}

impl Drop for ScratchUpload {
    fn drop(&mut self) {
        // Sync unlink of one small file; fine on a runtime worker.
        if let Err(e) = fs::remove_file(&self.path) {
            tracing::warn!(path = %self.path.display(), error = %e, "Failed to remove upload");
        }
    }
}
