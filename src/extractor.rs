use crate::config::Config;
use crate::errors::AppError;
use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

// ============ OCR Wire Contract ============
// Vision-style images:annotate request/response. Only the fields this
// pipeline reads are modeled.

#[derive(Debug, Serialize)]
struct AnnotateRequest {
    requests: Vec<AnnotateImageRequest>,
}

#[derive(Debug, Serialize)]
struct AnnotateImageRequest {
    image: ImageContent,
    features: Vec<Feature>,
}

#[derive(Debug, Serialize)]
struct ImageContent {
    content: String,
}

#[derive(Debug, Serialize)]
struct Feature {
    #[serde(rename = "type")]
    feature_type: String,
}

#[derive(Debug, Deserialize)]
struct AnnotateResponse {
    #[serde(default)]
    responses: Vec<AnnotateImageResponse>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AnnotateImageResponse {
    #[serde(default)]
    text_annotations: Vec<TextAnnotation>,
    error: Option<ProviderError>,
}

#[derive(Debug, Deserialize)]
struct TextAnnotation {
    description: String,
}

#[derive(Debug, Deserialize)]
struct ProviderError {
    message: Option<String>,
}

/// Client for the OCR provider's text-detection capability.
///
/// The provider is consumed via its request/response contract only; the first
/// text annotation in the response is treated as the full-page transcription.
#[derive(Clone)]
pub struct OcrClient {
    client: Client,
    base_url: String,
    api_key: String,
}

impl OcrClient {
    /// Creates a new `OcrClient` from configuration.
    ///
    /// The underlying HTTP client carries a bounded timeout so an
    /// unresponsive provider cannot block a request indefinitely.
    pub fn new(config: &Config) -> Result<Self, AppError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.ocr_timeout_secs))
            .build()
            .map_err(|e| {
                AppError::ExternalApiError(format!("Failed to create OCR client: {}", e))
            })?;

        Ok(Self {
            client,
            base_url: config.ocr_base_url.clone(),
            api_key: config.ocr_api_key.clone(),
        })
    }

    /// Runs text detection over the image bytes and returns the best-guess
    /// transcription.
    ///
    /// Guarantees are best effort only: an image with no detections yields an
    /// empty string, not an error. Underlying service failures (network,
    /// quota, malformed image) surface as a generic "text detection failed"
    /// condition; there is no retry.
    pub async fn detect_text(&self, image: &[u8]) -> Result<String, AppError> {
        let url = reqwest::Url::parse_with_params(
            &format!("{}/v1/images:annotate", self.base_url),
            &[("key", self.api_key.as_str())],
        )
        .map_err(|e| AppError::ExternalApiError(format!("Failed to build OCR URL: {}", e)))?;

        let body = AnnotateRequest {
            requests: vec![AnnotateImageRequest {
                image: ImageContent {
                    content: BASE64.encode(image),
                },
                features: vec![Feature {
                    feature_type: "TEXT_DETECTION".to_string(),
                }],
            }],
        };

        tracing::info!("Running text detection over {} image bytes", image.len());
        // Redact key from logs to prevent credential exposure
        tracing::debug!("OCR URL: {}/v1/images:annotate?key=[REDACTED]", self.base_url);

        let response = self.client.post(url).json(&body).send().await.map_err(|e| {
            AppError::ExternalApiError(format!("text detection failed: {}", e))
        })?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            tracing::error!("OCR provider returned error {}: {}", status, error_text);
            return Err(AppError::ExternalApiError(format!(
                "text detection failed: provider returned status {}",
                status
            )));
        }

        let result: AnnotateResponse = response.json().await.map_err(|e| {
            AppError::ExternalApiError(format!("text detection failed: bad response: {}", e))
        })?;

        let annotated = match result.responses.into_iter().next() {
            Some(r) => r,
            None => {
                tracing::warn!("OCR provider returned no annotation responses");
                return Ok(String::new());
            }
        };

        if let Some(err) = annotated.error {
            return Err(AppError::ExternalApiError(format!(
                "text detection failed: {}",
                err.message.unwrap_or_else(|| "provider error".to_string())
            )));
        }

        // First annotation is the aggregate full-page transcription
        let text = annotated
            .text_annotations
            .into_iter()
            .next()
            .map(|a| a.description)
            .unwrap_or_default();

        if text.is_empty() {
            tracing::info!("No text detected in image");
        } else {
            tracing::debug!("Detected {} characters of text", text.len());
        }

        Ok(text)
    }
}
