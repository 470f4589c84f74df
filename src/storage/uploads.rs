use crate::config::Config;
use crate::error::{AppError, AppResult};
use uuid::Uuid;

/// Upload acceptance rules: size ceiling plus image/file extension
/// allowlists. Size is checked before extension, so an oversized file is
/// reported as oversized even when its extension is also disallowed.
#[derive(Debug, Clone)]
pub struct AttachmentPolicy {
    pub max_upload_bytes: u64,
    pub allowed_images: Vec<String>,
    pub allowed_files: Vec<String>,
}

impl AttachmentPolicy {
    pub fn from_config(config: &Config) -> Self {
        Self {
            max_upload_bytes: config.max_upload_mb * 1_048_576,
            allowed_images: config.allowed_images.clone(),
            allowed_files: config.allowed_files.clone(),
        }
    }

    fn extension(name: &str) -> Option<String> {
        name.rsplit_once('.')
            .map(|(_, ext)| ext.to_ascii_lowercase())
            .filter(|ext| !ext.is_empty())
    }

    pub fn is_image(&self, name: &str) -> bool {
        Self::extension(name)
            .map(|ext| self.allowed_images.contains(&ext))
            .unwrap_or(false)
    }

    /// Validate an upload and mint its stored name (`{uuid}.{ext}`).
    pub fn validate(&self, original_name: &str, size_bytes: u64) -> AppResult<String> {
        if size_bytes >= self.max_upload_bytes {
            return Err(AppError::BadRequest(
                "File size you are trying to upload is too large!".into(),
            ));
        }

        let ext = Self::extension(original_name).ok_or_else(|| {
            AppError::BadRequest("File extension not allowed!".into())
        })?;
        if !self.allowed_images.contains(&ext) && !self.allowed_files.contains(&ext) {
            return Err(AppError::BadRequest("File extension not allowed!".into()));
        }

        Ok(format!("{}.{}", Uuid::new_v4(), ext))
    }
}
