use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub port: u16,
    pub ocr_base_url: String,
    pub ocr_api_key: String,
    pub ocr_timeout_secs: u64,
    pub register_search_url: String,
    pub register_timeout_secs: u64,
    pub storage_base_url: Option<String>, // Optional: blob storage is an optional path
    pub storage_bucket: Option<String>,
    pub storage_public_base_url: Option<String>,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        let config = Self {
            port: std::env::var("PORT")
                .unwrap_or_else(|_| "3000".to_string())
                .parse()
                .map_err(|_| anyhow::anyhow!("PORT must be a valid number between 1-65535"))?,
            ocr_base_url: std::env::var("OCR_BASE_URL")
                .unwrap_or_else(|_| "https://vision.googleapis.com".to_string())
                .trim()
                .to_string(),
            ocr_api_key: std::env::var("OCR_API_KEY")
                .map_err(|_| anyhow::anyhow!("OCR_API_KEY environment variable required"))
                .and_then(|key| {
                    if key.trim().is_empty() {
                        anyhow::bail!("OCR_API_KEY cannot be empty");
                    }
                    Ok(key)
                })?,
            ocr_timeout_secs: std::env::var("OCR_TIMEOUT_SECS")
                .unwrap_or_else(|_| "10".to_string())
                .parse()
                .map_err(|_| anyhow::anyhow!("OCR_TIMEOUT_SECS must be a valid number"))?,
            register_search_url: std::env::var("REGISTER_SEARCH_URL")
                .unwrap_or_else(|_| {
                    "https://services.sia.homeoffice.gov.uk/PublicRegister/SearchPublicRegisterByLicence"
                        .to_string()
                })
                .trim()
                .to_string(),
            register_timeout_secs: std::env::var("REGISTER_TIMEOUT_SECS")
                .unwrap_or_else(|_| "10".to_string())
                .parse()
                .map_err(|_| anyhow::anyhow!("REGISTER_TIMEOUT_SECS must be a valid number"))?,
            storage_base_url: std::env::var("STORAGE_BASE_URL")
                .ok()
                .filter(|s| !s.trim().is_empty()),
            storage_bucket: std::env::var("STORAGE_BUCKET")
                .ok()
                .filter(|s| !s.trim().is_empty()),
            storage_public_base_url: std::env::var("STORAGE_PUBLIC_BASE_URL")
                .ok()
                .filter(|s| !s.trim().is_empty()),
        };

        if !config.ocr_base_url.starts_with("http://") && !config.ocr_base_url.starts_with("https://")
        {
            anyhow::bail!("OCR_BASE_URL must start with http:// or https://");
        }
        url::Url::parse(&config.ocr_base_url)
            .map_err(|e| anyhow::anyhow!("OCR_BASE_URL is not a valid URL: {}", e))?;
        if !config.register_search_url.starts_with("http://")
            && !config.register_search_url.starts_with("https://")
        {
            anyhow::bail!("REGISTER_SEARCH_URL must start with http:// or https://");
        }
        url::Url::parse(&config.register_search_url)
            .map_err(|e| anyhow::anyhow!("REGISTER_SEARCH_URL is not a valid URL: {}", e))?;
        if config.storage_base_url.is_some() && config.storage_bucket.is_none() {
            anyhow::bail!("STORAGE_BUCKET is required when STORAGE_BASE_URL is set");
        }

        // Log successful configuration load (without sensitive values)
        tracing::info!("Configuration loaded successfully");
        tracing::debug!("OCR Base URL: {}", config.ocr_base_url);
        tracing::debug!("Register Search URL: {}", config.register_search_url);
        if let Some(ref storage) = config.storage_base_url {
            tracing::info!("Blob storage configured: {}", storage);
        }
        tracing::debug!("Server Port: {}", config.port);

        Ok(config)
    }

    /// Whether a blob storage destination is configured for uploaded images.
    pub fn storage_enabled(&self) -> bool {
        self.storage_base_url.is_some() && self.storage_bucket.is_some()
    }
}
