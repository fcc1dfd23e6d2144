use crate::config::Config;
use crate::errors::AppError;
use crate::models::{UploadedImage, VerificationResult};
use crate::verification::VerificationService;
use axum::{
    extract::{Multipart, State},
    http::StatusCode,
    Json,
};
use serde_json::json;
use std::sync::Arc;

/// Shared application state injected into handlers.
pub struct AppState {
    /// Application configuration.
    pub config: Config,
    /// Verification pipeline, constructed once at startup.
    pub verifier: VerificationService,
}

/// Health check endpoint.
///
/// Returns the service status, version, and health information.
///
/// # Returns
///
/// * `(StatusCode, Json<serde_json::Value>)` - HTTP 200 OK with health status JSON.
pub async fn health() -> (StatusCode, Json<serde_json::Value>) {
    (
        StatusCode::OK,
        Json(json!({
            "status": "healthy",
            "service": "licence-verify-api",
            "version": "0.1.0"
        })),
    )
}

/// POST /upload
///
/// Accepts a multipart form carrying a licence card image (field name `image`
/// or `file`, both variants are in the wild) and runs the verification
/// pipeline over it.
///
/// Absence of a match or a failed register lookup is reported as a structured
/// not-found / invalid result with HTTP 200; 400 is reserved for a missing or
/// empty file, 500-class for infrastructure failures.
///
/// # Arguments
///
/// * `state` - The application state.
/// * `multipart` - The multipart form body.
///
/// # Returns
///
/// * `Result<Json<VerificationResult>, AppError>` - The verification result or an error.
pub async fn upload(
    State(state): State<Arc<AppState>>,
    multipart: Multipart,
) -> Result<Json<VerificationResult>, AppError> {
    let image = read_image_part(multipart).await?;

    tracing::info!(
        "POST /upload - file '{}' ({} bytes)",
        image.filename,
        image.bytes.len()
    );

    let result = state.verifier.verify(image).await?;

    Ok(Json(result))
}

/// Pulls the image part out of the multipart body.
///
/// Accepts either `image` or `file` as the field name; a body without one of
/// those, or with an empty payload, is a 400-class input error.
async fn read_image_part(mut multipart: Multipart) -> Result<UploadedImage, AppError> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::BadRequest(format!("Malformed multipart body: {}", e)))?
    {
        let name = field.name().unwrap_or_default().to_string();
        if name != "image" && name != "file" {
            continue;
        }

        let filename = field
            .file_name()
            .map(|s| s.to_string())
            .unwrap_or_else(|| "upload".to_string());

        let bytes = field
            .bytes()
            .await
            .map_err(|e| AppError::BadRequest(format!("Failed to read uploaded file: {}", e)))?;

        if bytes.is_empty() {
            return Err(AppError::BadRequest("Uploaded file is empty".to_string()));
        }

        return Ok(UploadedImage {
            bytes: bytes.to_vec(),
            filename,
        });
    }

    Err(AppError::BadRequest("No image uploaded".to_string()))
}
