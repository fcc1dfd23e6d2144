use crate::circuit_breaker::RegisterCircuitBreaker;
use crate::config::Config;
use crate::errors::AppError;
use crate::models::RegisterRecord;
use failsafe::futures::CircuitBreaker;
use moka::future::Cache;
use reqwest::Client;
use scraper::{ElementRef, Html, Selector};
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;

/// Bounded retry budget for the register POST.
const MAX_ATTEMPTS: u32 = 3;

/// Base delay between retry attempts, doubled per attempt.
const RETRY_BASE_DELAY_MS: u64 = 200;

/// One entry of the declarative scrape schema: a label matched by its text
/// content and the selector for the value inside the label's next sibling
/// element.
///
/// Matching by label text everywhere (never by ordinal position) keeps the
/// scrape working when unrelated fields on the page are reordered.
struct FieldRule {
    label: &'static str,
    value_selector: &'static str,
}

/// Scrape schema for the register's licence detail page.
///
/// This is a fragile, version-pinned contract with the register's markup: any
/// drift degrades to an invalid record, never a crash.
const SCRAPE_SCHEMA: [FieldRule; 6] = [
    FieldRule { label: "First name", value_selector: ".ax_h5" },
    FieldRule { label: "Surname", value_selector: ".ax_h5" },
    FieldRule { label: "Licence number", value_selector: ".ax_h4" },
    FieldRule { label: "Role", value_selector: ".ax_h4" },
    FieldRule { label: "Expiry date", value_selector: ".ax_h4" },
    FieldRule { label: "Status", value_selector: ".ax_h4_green" },
];

/// Parses the register's HTML search response into a structured record.
///
/// All six fields must be non-empty after trimming; otherwise the whole
/// record collapses to invalid. A missing field models "licence not found or
/// not visible on the register", indistinguishable from a scraping break.
pub fn scrape_register_page(html: &str) -> RegisterRecord {
    let document = Html::parse_document(html);

    let mut values = SCRAPE_SCHEMA
        .iter()
        .map(|rule| field_value(&document, rule));

    // Schema order: first name, surname, licence number, role, expiry, status
    let first_name = values.next().unwrap_or_default();
    let surname = values.next().unwrap_or_default();
    let licence_number = values.next().unwrap_or_default();
    let role = values.next().unwrap_or_default();
    let expiry_date = values.next().unwrap_or_default();
    let status = values.next().unwrap_or_default();

    if first_name.is_empty()
        || surname.is_empty()
        || licence_number.is_empty()
        || role.is_empty()
        || expiry_date.is_empty()
        || status.is_empty()
    {
        tracing::debug!("Register page missing one or more required fields");
        return RegisterRecord::invalid();
    }

    RegisterRecord {
        valid: true,
        first_name,
        surname,
        licence_number,
        role,
        expiry_date,
        status,
    }
}

/// Finds the label paragraph whose text contains the rule's label, then
/// extracts the value from the label's next sibling element.
fn field_value(document: &Html, rule: &FieldRule) -> String {
    // Constant selectors, compile failure is a programming error
    let label_sel = Selector::parse(".ax_paragraph").unwrap();
    let value_sel = Selector::parse(rule.value_selector).unwrap();

    for paragraph in document.select(&label_sel) {
        let label_text: String = paragraph.text().collect();
        if !label_text.contains(rule.label) {
            continue;
        }

        let value = paragraph
            .next_siblings()
            .filter_map(ElementRef::wrap)
            .next()
            .and_then(|sibling| sibling.select(&value_sel).next())
            .map(|el| el.text().collect::<String>().trim().to_string())
            .unwrap_or_default();

        if !value.is_empty() {
            return value;
        }
    }

    String::new()
}

/// Client for the public register's licence search endpoint.
///
/// The lookup never returns an error to the caller: network failure, non-200
/// responses, and selector mismatches all degrade to an invalid record.
#[derive(Clone)]
pub struct RegisterClient {
    client: Client,
    search_url: String,
    /// Memoizes valid records per licence number to spare the register
    /// repeated identical scrapes. Invalid lookups are never cached so a
    /// freshly registered licence is not masked.
    cache: Cache<String, RegisterRecord>,
    breaker: Arc<RegisterCircuitBreaker>,
}

impl RegisterClient {
    /// Creates a new `RegisterClient` from configuration.
    ///
    /// # Arguments
    ///
    /// * `config` - Application configuration (search URL, timeout).
    /// * `cache` - Register record cache, shared across clones.
    /// * `breaker` - Circuit breaker guarding the register endpoint.
    pub fn new(
        config: &Config,
        cache: Cache<String, RegisterRecord>,
        breaker: Arc<RegisterCircuitBreaker>,
    ) -> Result<Self, AppError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.register_timeout_secs))
            .build()
            .map_err(|e| {
                AppError::ExternalApiError(format!("Failed to create register client: {}", e))
            })?;

        Ok(Self {
            client,
            search_url: config.register_search_url.clone(),
            cache,
            breaker,
        })
    }

    /// Looks up a licence number on the public register.
    ///
    /// The input is stripped to digits before the POST. Retries a bounded
    /// number of times with backoff on transport-level failures; a scrape
    /// that parses but yields no record is terminal (retrying would return
    /// the same page).
    pub async fn lookup(&self, licence_no: &str) -> RegisterRecord {
        let digits: String = licence_no.chars().filter(|c| c.is_ascii_digit()).collect();
        if digits.is_empty() {
            return RegisterRecord::invalid();
        }

        if let Some(hit) = self.cache.get(&digits).await {
            tracing::debug!("Register cache hit for licence {}", digits);
            return hit;
        }

        for attempt in 1..=MAX_ATTEMPTS {
            match self.breaker.call(self.fetch_search_page(&digits)).await {
                Ok(body) => {
                    let record = scrape_register_page(&body);
                    if record.valid {
                        tracing::info!(
                            "Register reports licence {} with status '{}'",
                            digits,
                            record.status
                        );
                        self.cache.insert(digits, record.clone()).await;
                    } else {
                        tracing::info!("Licence {} not found on register", digits);
                    }
                    return record;
                }
                Err(failsafe::Error::Rejected) => {
                    tracing::warn!("Register circuit open, failing fast for {}", digits);
                    return RegisterRecord::invalid();
                }
                Err(failsafe::Error::Inner(e)) => {
                    tracing::warn!(
                        "Register lookup attempt {}/{} failed: {}",
                        attempt,
                        MAX_ATTEMPTS,
                        e
                    );
                    if attempt < MAX_ATTEMPTS {
                        let delay = RETRY_BASE_DELAY_MS * 2u64.pow(attempt - 1);
                        tokio::time::sleep(Duration::from_millis(delay)).await;
                    }
                }
            }
        }

        tracing::error!("Register lookup exhausted retries for {}", digits);
        RegisterRecord::invalid()
    }

    /// Issues the search POST and returns the raw HTML body.
    async fn fetch_search_page(&self, licence_no: &str) -> Result<String, AppError> {
        let response = self
            .client
            .post(&self.search_url)
            .json(&json!({ "licenseNo": licence_no }))
            .send()
            .await
            .map_err(|e| {
                AppError::ExternalApiError(format!("Register request failed: {}", e))
            })?;

        if !response.status().is_success() {
            return Err(AppError::ExternalApiError(format!(
                "Register returned status {}",
                response.status()
            )));
        }

        response
            .text()
            .await
            .map_err(|e| AppError::ExternalApiError(format!("Register body read failed: {}", e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Builds a register detail page in the pinned markup layout.
    fn register_page(
        first_name: &str,
        surname: &str,
        licence: &str,
        role: &str,
        expiry: &str,
        status: &str,
    ) -> String {
        format!(
            r#"<html><body>
            <div class="ax_paragraph">First name</div>
            <div class="ax_box"><span class="ax_h5">{first_name}</span></div>
            <div class="ax_paragraph">Surname</div>
            <div class="ax_box"><span class="ax_h5">{surname}</span></div>
            <div class="ax_paragraph">Licence number</div>
            <div class="ax_box"><span class="ax_h4">{licence}</span></div>
            <div class="ax_paragraph">Role</div>
            <div class="ax_box"><span class="ax_h4">{role}</span></div>
            <div class="ax_paragraph">Expiry date</div>
            <div class="ax_box"><span class="ax_h4">{expiry}</span></div>
            <div class="ax_paragraph">Status</div>
            <div class="ax_box"><span class="ax_h4_green">{status}</span></div>
            </body></html>"#
        )
    }

    #[test]
    fn scrapes_full_record() {
        let html = register_page(
            "John",
            "Smith",
            "1234567890123456",
            "Door Supervisor",
            "05 JUN 2025",
            "Active",
        );
        let record = scrape_register_page(&html);
        assert!(record.valid);
        assert_eq!(record.first_name, "John");
        assert_eq!(record.surname, "Smith");
        assert_eq!(record.licence_number, "1234567890123456");
        assert_eq!(record.role, "Door Supervisor");
        assert_eq!(record.expiry_date, "05 JUN 2025");
        assert_eq!(record.status, "Active");
    }

    #[test]
    fn reordered_fields_still_scrape() {
        // Label-text matching must not depend on field order
        let html = r#"<html><body>
            <div class="ax_paragraph">Status</div>
            <div><span class="ax_h4_green">Active</span></div>
            <div class="ax_paragraph">Surname</div>
            <div><span class="ax_h5">Smith</span></div>
            <div class="ax_paragraph">First name</div>
            <div><span class="ax_h5">John</span></div>
            <div class="ax_paragraph">Expiry date</div>
            <div><span class="ax_h4">05 JUN 2025</span></div>
            <div class="ax_paragraph">Licence number</div>
            <div><span class="ax_h4">1234567890123456</span></div>
            <div class="ax_paragraph">Role</div>
            <div><span class="ax_h4">Door Supervisor</span></div>
            </body></html>"#;
        let record = scrape_register_page(html);
        assert!(record.valid);
        assert_eq!(record.first_name, "John");
        assert_eq!(record.status, "Active");
    }

    #[test]
    fn empty_field_collapses_record() {
        let html = register_page("John", "", "1234567890123456", "Role", "05 JUN 2025", "Active");
        let record = scrape_register_page(&html);
        assert_eq!(record, RegisterRecord::invalid());
    }

    #[test]
    fn unrelated_page_yields_invalid_record() {
        let record = scrape_register_page("<html><body><p>No results</p></body></html>");
        assert!(!record.valid);
    }

    #[test]
    fn whitespace_around_values_is_trimmed() {
        let html = register_page(
            "  John  ",
            " Smith ",
            " 1234567890123456 ",
            " Door Supervisor ",
            " 05 JUN 2025 ",
            " Active ",
        );
        let record = scrape_register_page(&html);
        assert!(record.valid);
        assert_eq!(record.first_name, "John");
        assert_eq!(record.status, "Active");
    }
}
