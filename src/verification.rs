use crate::config::Config;
use crate::errors::{AppError, ResultExt};
use crate::extractor::OcrClient;
use crate::models::{ParsedFields, UploadedImage, VerificationResult};
use crate::parser::{parse_expiry_date, FieldExtraction, RegexFieldExtractor};
use crate::register::RegisterClient;
use crate::storage::StorageClient;

/// Orchestrates the verification pipeline for one uploaded image:
/// extract → parse → (short-circuit | register lookup) → assemble.
///
/// Strictly sequential per request; all working state is request-local. The
/// clients are constructed once at startup and are safe for concurrent use.
pub struct VerificationService {
    extractor: Box<dyn FieldExtraction>,
    ocr: OcrClient,
    register: RegisterClient,
    storage: Option<StorageClient>,
}

impl VerificationService {
    /// Creates a `VerificationService` with the default regex extraction
    /// strategy.
    pub fn new(
        config: &Config,
        ocr: OcrClient,
        register: RegisterClient,
    ) -> Result<Self, AppError> {
        Ok(Self {
            extractor: Box::new(RegexFieldExtractor::new()),
            ocr,
            register,
            storage: StorageClient::from_config(config)?,
        })
    }

    /// Replaces the field-extraction strategy.
    #[allow(dead_code)]
    pub fn with_extractor(mut self, extractor: Box<dyn FieldExtraction>) -> Self {
        self.extractor = extractor;
        self
    }

    /// Runs the full verification pipeline for an uploaded licence image.
    ///
    /// Extraction and lookup failures are recovered locally into structured
    /// not-found / invalid results; only infrastructure failures (blob
    /// storage unreachable) surface as errors.
    pub async fn verify(&self, image: UploadedImage) -> Result<VerificationResult, AppError> {
        // Optional durable copy of the upload; its failure is a true
        // infrastructure failure, not a verification outcome.
        let image_path = match &self.storage {
            Some(storage) => Some(
                storage
                    .store_image(&image)
                    .await
                    .context("Failed to store uploaded image")?,
            ),
            None => None,
        };

        let text = match self.ocr.detect_text(&image.bytes).await {
            Ok(text) => text,
            Err(e) => {
                // Extraction errors are data, not failures: recover locally
                // and short-circuit without querying the register.
                tracing::warn!("Text detection failed, returning not-found: {}", e);
                let mut result =
                    VerificationResult::not_found(&ParsedFields::default(), "text detection failed");
                result.image_path = image_path;
                return Ok(result);
            }
        };

        let fields = self.extractor.extract(&text);
        tracing::debug!(
            "Parsed fields: licence={:?} expiry={:?} name={:?}",
            fields.license_number,
            fields.expiry_date_raw,
            fields.name_raw
        );

        let Some(ref licence_no) = fields.license_number else {
            // Short-circuit: without a licence number the register lookup
            // would be a pointless network call.
            tracing::info!("No licence number found in image '{}'", image.filename);
            let mut result =
                VerificationResult::not_found(&fields, "License number not found in image");
            result.image_path = image_path;
            return Ok(result);
        };

        if let Some(raw) = fields.expiry_date_raw.as_deref() {
            if let Some(date) = parse_expiry_date(raw) {
                tracing::debug!("Card prints expiry date {}", date);
            }
        }

        let record = self.register.lookup(licence_no).await;
        if !record.valid {
            let mut result = VerificationResult::not_found(&fields, "Invalid license data");
            // Keep the OCR-derived licence number: it was well-formed, the
            // register simply has no visible record for it.
            result.license_number = licence_no.clone();
            result.image_path = image_path;
            return Ok(result);
        }

        // Register-derived values are authoritative over the OCR-derived ones.
        let mut result = VerificationResult::from_record(&record);
        result.image_path = image_path;

        tracing::info!(
            "Verified licence {}: holder='{}', valid={}",
            result.license_number,
            result.name,
            result.is_valid_licence
        );

        Ok(result)
    }
}
