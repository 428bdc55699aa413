//! # sd-attachments
//!
//! Storage for images attached to applications, completion reports and
//! inventory records. Records keep only the URL a [`FileStorage`] returns.

pub mod storage;
pub mod upload;

pub use storage::{FileStorage, LocalStorage, MemoryStorage, StorageError, StorageResult, StoredFile};
pub use upload::{store_images, StoredImages, Upload, UploadPolicy};
