//! Image upload checks
//!
//! Records only carry images. Every file in a request must be an `image/*`
//! type within the configured size limit, and a request may carry at most
//! the configured number of files.

use bytes::Bytes;
use sd_core::config::StorageConfig;
use sd_core::error::{SdError, ValidationErrors};
use sd_core::result::SdResult;

use crate::storage::{FileStorage, StoredFile};

/// A file received with a request, before it is stored
#[derive(Debug, Clone)]
pub struct Upload {
    pub file_name: String,
    /// As declared by the client; may be empty
    pub content_type: String,
    pub data: Bytes,
}

impl Upload {
    pub fn new(file_name: impl Into<String>, content_type: impl Into<String>, data: Bytes) -> Self {
        Self {
            file_name: file_name.into(),
            content_type: content_type.into(),
            data,
        }
    }

    /// Declared type, or one guessed from the file name when the client sent none
    pub fn effective_content_type(&self) -> String {
        let declared = self.content_type.trim();
        if declared.is_empty() || declared == "application/octet-stream" {
            mime_guess::from_path(&self.file_name)
                .first_or_octet_stream()
                .essence_str()
                .to_string()
        } else {
            declared.to_ascii_lowercase()
        }
    }

    pub fn is_image(&self) -> bool {
        self.effective_content_type().starts_with("image/")
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UploadPolicy {
    pub max_file_size: usize,
    pub max_files: usize,
}

impl UploadPolicy {
    pub fn from_config(config: &StorageConfig) -> Self {
        Self {
            max_file_size: config.max_file_size_bytes,
            max_files: config.max_files_per_request,
        }
    }

    pub fn check(&self, uploads: &[Upload]) -> SdResult<()> {
        let mut errors = ValidationErrors::new();

        if uploads.len() > self.max_files {
            errors.add("images", format!("at most {} files are allowed", self.max_files));
        }
        for upload in uploads {
            if !upload.is_image() {
                errors.add("images", format!("{} is not an image", upload.file_name));
            }
            if upload.data.len() > self.max_file_size {
                errors.add(
                    "images",
                    format!(
                        "{} exceeds the {} byte limit",
                        upload.file_name, self.max_file_size
                    ),
                );
            }
        }

        errors.into_result().map_err(SdError::Validation)
    }
}

impl Default for UploadPolicy {
    fn default() -> Self {
        Self::from_config(&StorageConfig::default())
    }
}

/// Images written for a request whose record is not saved yet
#[derive(Debug, Default)]
pub struct StoredImages {
    files: Vec<StoredFile>,
}

impl StoredImages {
    /// Public URLs in upload order
    pub fn urls(&self) -> Vec<String> {
        self.files.iter().map(|f| f.url.clone()).collect()
    }

    pub fn files(&self) -> &[StoredFile] {
        &self.files
    }

    /// Keep the images when `result` saved their record, remove them otherwise
    pub async fn settle<T>(self, storage: &dyn FileStorage, result: SdResult<T>) -> SdResult<T> {
        if result.is_err() {
            remove_all(storage, &self.files).await;
        }
        result
    }
}

async fn remove_all(storage: &dyn FileStorage, files: &[StoredFile]) {
    for file in files {
        if let Err(e) = storage.delete(&file.key).await {
            tracing::warn!(key = %file.key, error = %e, "Failed to remove unused upload");
        }
    }
}

/// Check and store every upload.
///
/// Nothing is written unless the whole set passes the policy. Files already
/// written are removed again when a later one fails.
pub async fn store_images(
    storage: &dyn FileStorage,
    policy: &UploadPolicy,
    uploads: Vec<Upload>,
) -> SdResult<StoredImages> {
    policy.check(&uploads)?;

    let mut stored = Vec::with_capacity(uploads.len());
    for upload in uploads {
        let content_type = upload.effective_content_type();
        match storage
            .store(&upload.file_name, &content_type, upload.data)
            .await
        {
            Ok(file) => stored.push(file),
            Err(e) => {
                remove_all(storage, &stored).await;
                return Err(e.into());
            }
        }
    }

    tracing::debug!(count = stored.len(), storage = storage.name(), "Stored uploads");
    Ok(StoredImages { files: stored })
}
