use crate::config::Config;
use crate::errors::AppError;
use crate::models::UploadedImage;
use reqwest::Client;
use serde::Deserialize;
use sha2::{Digest, Sha256};
use std::time::Duration;

#[derive(Debug, Deserialize)]
struct UploadResponse {
    name: Option<String>,
}

/// Client for the blob-storage provider (optional pipeline path).
///
/// Uploads the original image bytes via a media-upload REST contract and
/// returns a public reference path. Used only for display/reference in the
/// verification response; storage failures are infrastructure failures, not
/// verification outcomes.
#[derive(Clone)]
pub struct StorageClient {
    client: Client,
    base_url: String,
    bucket: String,
    public_base_url: String,
}

impl StorageClient {
    /// Creates a `StorageClient` when blob storage is configured, `None`
    /// otherwise.
    pub fn from_config(config: &Config) -> Result<Option<Self>, AppError> {
        let (base_url, bucket) = match (&config.storage_base_url, &config.storage_bucket) {
            (Some(base), Some(bucket)) => (base.clone(), bucket.clone()),
            _ => return Ok(None),
        };

        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| {
                AppError::ExternalApiError(format!("Failed to create storage client: {}", e))
            })?;

        let public_base_url = config
            .storage_public_base_url
            .clone()
            .unwrap_or_else(|| base_url.clone());

        Ok(Some(Self {
            client,
            base_url,
            bucket,
            public_base_url,
        }))
    }

    /// Stores the uploaded image and returns its public path.
    ///
    /// Object names are content-addressed (SHA-256 of the bytes) with the
    /// original file extension preserved, so re-uploads of the same image are
    /// harmless overwrites of the same object.
    pub async fn store_image(&self, image: &UploadedImage) -> Result<String, AppError> {
        let object_name = object_name_for(image);

        let url = reqwest::Url::parse_with_params(
            &format!(
                "{}/upload/storage/v1/b/{}/o",
                self.base_url, self.bucket
            ),
            &[("uploadType", "media"), ("name", object_name.as_str())],
        )
        .map_err(|e| AppError::ExternalApiError(format!("Failed to build storage URL: {}", e)))?;

        tracing::info!(
            "Storing image '{}' as object '{}' ({} bytes)",
            image.filename,
            object_name,
            image.bytes.len()
        );

        let response = self
            .client
            .post(url)
            .header("Content-Type", "application/octet-stream")
            .body(image.bytes.clone())
            .send()
            .await
            .map_err(|e| AppError::ExternalApiError(format!("Storage upload failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            tracing::error!("Storage returned error {}: {}", status, error_text);
            return Err(AppError::ExternalApiError(format!(
                "Storage upload returned status {}",
                status
            )));
        }

        let stored: UploadResponse = response.json().await.map_err(|e| {
            AppError::ExternalApiError(format!("Failed to parse storage response: {}", e))
        })?;

        let name = stored.name.unwrap_or(object_name);
        Ok(format!("{}/{}/{}", self.public_base_url, self.bucket, name))
    }
}

/// Content-addressed object name: SHA-256 hex of the bytes plus the original
/// file extension.
fn object_name_for(image: &UploadedImage) -> String {
    let digest = Sha256::digest(&image.bytes);
    let hash = hex::encode(digest);

    match image.filename.rsplit_once('.') {
        Some((_, ext)) if !ext.is_empty() && ext.len() <= 5 => format!("{}.{}", hash, ext),
        _ => hash,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn object_name_is_content_addressed() {
        let a = UploadedImage {
            bytes: vec![1, 2, 3],
            filename: "card.jpg".to_string(),
        };
        let b = UploadedImage {
            bytes: vec![1, 2, 3],
            filename: "other-name.jpg".to_string(),
        };
        // Same bytes, same object regardless of declared filename
        assert_eq!(object_name_for(&a), object_name_for(&b));
        assert!(object_name_for(&a).ends_with(".jpg"));
    }

    #[test]
    fn object_name_without_extension() {
        let image = UploadedImage {
            bytes: vec![9, 9],
            filename: "upload".to_string(),
        };
        assert!(!object_name_for(&image).contains('.'));
    }
}
