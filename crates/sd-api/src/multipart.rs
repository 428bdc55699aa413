//! Multipart forms carrying a JSON `data` part and `images` files

use axum::extract::Multipart;
use sd_attachments::{store_images, StoredImages, Upload};
use serde::de::DeserializeOwned;

use crate::error::{ApiError, ApiResult};
use crate::extractors::AppState;

pub const DATA_FIELD: &str = "data";
pub const IMAGES_FIELD: &str = "images";

/// Parsed form, images not yet stored
pub struct Form<T> {
    pub data: T,
    pub images: Vec<Upload>,
}

impl<T> Form<T> {
    /// Store the images and hand back the data with them.
    ///
    /// The caller settles the images with the result of saving their record.
    pub async fn store(self, state: &AppState) -> ApiResult<(T, StoredImages)> {
        let images = store_images(state.storage.as_ref(), &state.uploads, self.images).await?;
        Ok((self.data, images))
    }
}

fn multipart_error(e: axum::extract::multipart::MultipartError) -> ApiError {
    tracing::warn!(error = %e, "Multipart parsing error");
    ApiError::bad_request(format!("Failed to read upload: {}", e))
}

pub async fn read_form<T: DeserializeOwned>(mut multipart: Multipart) -> ApiResult<Form<T>> {
    let mut data = None;
    let mut images = Vec::new();

    while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
        let name = field.name().map(str::to_string);
        match name.as_deref() {
            Some(DATA_FIELD) => {
                let text = field.text().await.map_err(multipart_error)?;
                let parsed = serde_json::from_str(&text)
                    .map_err(|e| ApiError::bad_request(format!("Invalid data part: {}", e)))?;
                data = Some(parsed);
            }
            Some(IMAGES_FIELD) => {
                let file_name = field.file_name().unwrap_or("image").to_string();
                let content_type = field.content_type().unwrap_or_default().to_string();
                let bytes = field.bytes().await.map_err(multipart_error)?;
                images.push(Upload::new(file_name, content_type, bytes));
            }
            other => {
                tracing::debug!(field = ?other, "Ignoring unknown multipart field");
            }
        }
    }

    let data = data.ok_or_else(|| ApiError::bad_request("Missing data part"))?;
    Ok(Form { data, images })
}
