use serde::{Deserialize, Serialize};

/// Boundary sentinel used in responses when a field could not be determined.
pub const NOT_FOUND: &str = "Not Found";

// ============ Request-scoped Models ============

/// An uploaded licence card image, owned by the request handler.
///
/// Ephemeral: created from the multipart body and discarded once the request
/// has been answered (optionally after a copy is pushed to blob storage).
#[derive(Debug, Clone)]
pub struct UploadedImage {
    /// Raw image bytes as received.
    pub bytes: Vec<u8>,
    /// Declared filename from the multipart part.
    pub filename: String,
}

/// Fields pulled out of the OCR transcription by pattern matching.
///
/// Absence of any field is a valid terminal state, not an error. The
/// "Not Found" sentinel exists only at the response boundary; internally
/// absent fields stay `None`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParsedFields {
    /// Candidate licence number: exactly 16 ASCII digits when present.
    pub license_number: Option<String>,
    /// Raw expiry date token as printed on the card (e.g. "05 JUN 2025").
    pub expiry_date_raw: Option<String>,
    /// Best-effort holder name from the card.
    pub name_raw: Option<String>,
}

// ============ Register Models ============

/// Structured result of scraping the public register for a licence number.
///
/// Either all fields are populated (`valid == true`) or the record collapses
/// to invalid with empty fields. Partial records are never surfaced: a missing
/// field models "licence not found or not visible on the register", which is
/// indistinguishable from a scraping break.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RegisterRecord {
    pub valid: bool,
    pub first_name: String,
    pub surname: String,
    pub licence_number: String,
    pub role: String,
    pub expiry_date: String,
    pub status: String,
}

impl RegisterRecord {
    /// The invalid record: licence not found, register unreachable, or the
    /// page markup no longer matches the scrape schema.
    pub fn invalid() -> Self {
        Self::default()
    }

    /// Full holder name as displayed to the caller.
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.surname)
    }

    /// Whether the register reports this licence as active.
    ///
    /// Comparison is case-insensitive: the register's casing of the status
    /// string is treated as a presentation detail.
    pub fn is_active(&self) -> bool {
        self.valid && self.status.trim().eq_ignore_ascii_case("active")
    }
}

// ============ Response Models ============

/// The normalized verification response returned by `POST /upload`.
///
/// Invariant: `is_valid_licence` is true iff a register record was found and
/// its status is "Active" (case-insensitive).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct VerificationResult {
    /// Holder name, register-derived when available.
    pub name: String,
    /// Licence number, register-derived when available (authoritative over
    /// the OCR-derived candidate).
    pub license_number: String,
    /// Expiry date, register-derived when available.
    pub expiry_date: String,
    /// Whether the register reports the licence as active.
    pub is_valid_licence: bool,
    /// Explanatory message for not-found / invalid outcomes.
    pub error: Option<String>,
    /// Public path of the stored image copy, when blob storage is configured.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_path: Option<String>,
}

impl VerificationResult {
    /// Builds the not-found / invalid result from whatever the parser managed
    /// to extract, applying the "Not Found" boundary sentinels.
    pub fn not_found(fields: &ParsedFields, error: impl Into<String>) -> Self {
        Self {
            name: fields.name_raw.clone().unwrap_or_else(|| NOT_FOUND.to_string()),
            license_number: fields
                .license_number
                .clone()
                .unwrap_or_else(|| NOT_FOUND.to_string()),
            expiry_date: fields
                .expiry_date_raw
                .clone()
                .unwrap_or_else(|| NOT_FOUND.to_string()),
            is_valid_licence: false,
            error: Some(error.into()),
            image_path: None,
        }
    }

    /// Builds the result for a valid register record. Register-derived values
    /// are authoritative over the OCR-derived ones.
    pub fn from_record(record: &RegisterRecord) -> Self {
        Self {
            name: record.full_name(),
            license_number: record.licence_number.clone(),
            expiry_date: record.expiry_date.clone(),
            is_valid_licence: record.is_active(),
            error: None,
            image_path: None,
        }
    }
}
