use crate::models::ParsedFields;
use chrono::NaiveDate;
use regex::Regex;

/// Strategy interface for pulling licence fields out of an OCR transcription.
///
/// The default implementation is regex-based; alternate strategies
/// (layout-aware OCR, ML field detection) can be substituted without touching
/// the pipeline.
pub trait FieldExtraction: Send + Sync {
    /// Extracts candidate fields from the transcribed text.
    ///
    /// Infallible: absence of a match is data, not a failure.
    fn extract(&self, text: &str) -> ParsedFields;
}

/// Regex-based field extractor matching the layout printed on licence cards.
///
/// - Licence number: 16 digits, commonly grouped as four groups of four with
///   optional internal whitespace.
/// - Expiry date: anchored on a literal "EXPIRES" marker followed by
///   day / month-abbreviation / year.
/// - Name: best effort, the first non-empty line following the expiry marker.
pub struct RegexFieldExtractor {
    licence_re: Regex,
    expiry_re: Regex,
    name_re: Regex,
}

impl RegexFieldExtractor {
    pub fn new() -> Self {
        // Constant patterns, compile failure is a programming error
        Self {
            licence_re: Regex::new(r"\b\d{4}[ ]?\d{4}[ ]?\d{4}[ ]?\d{4}\b").unwrap(),
            expiry_re: Regex::new(r"EXPIRES\s+(\d{2}\s\w{3}\s\d{4})").unwrap(),
            name_re: Regex::new(r"EXPIRES\s+\d{2}\s\w{3}\s\d{4}\s+([^\r\n]+)").unwrap(),
        }
    }
}

impl Default for RegexFieldExtractor {
    fn default() -> Self {
        Self::new()
    }
}

impl FieldExtraction for RegexFieldExtractor {
    fn extract(&self, text: &str) -> ParsedFields {
        let license_number = self.licence_re.find(text).map(|m| {
            // Strip grouping whitespace down to the 16 raw digits
            m.as_str().chars().filter(|c| c.is_ascii_digit()).collect()
        });

        let expiry_date_raw = self
            .expiry_re
            .captures(text)
            .and_then(|c| c.get(1))
            .map(|m| m.as_str().to_string());

        if let Some(ref raw) = expiry_date_raw {
            if parse_expiry_date(raw).is_none() {
                tracing::debug!("Expiry token '{}' does not parse as a calendar date", raw);
            }
        }

        let name_raw = self
            .name_re
            .captures(text)
            .and_then(|c| c.get(1))
            .map(|m| m.as_str().trim().to_string())
            .filter(|s| !s.is_empty());

        ParsedFields {
            license_number,
            expiry_date_raw,
            name_raw,
        }
    }
}

/// Parses a raw card expiry token ("05 JUN 2025") into a calendar date.
pub fn parse_expiry_date(raw: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(raw.trim(), "%d %b %Y").ok()
}
