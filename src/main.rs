mod circuit_breaker;
mod config;
mod errors;
mod extractor;
mod handlers;
mod models;
mod parser;
mod register;
mod storage;
mod verification;

use axum::{
    routing::{get, post},
    Router,
};
use moka::future::Cache;
use std::sync::Arc;
use std::time::Duration;
use tower::ServiceBuilder;
use tower_governor::{
    governor::GovernorConfigBuilder, key_extractor::SmartIpKeyExtractor, GovernorLayer,
};
use tower_http::{cors::CorsLayer, limit::RequestBodyLimitLayer, trace::TraceLayer};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::Config;
use crate::extractor::OcrClient;
use crate::register::RegisterClient;
use crate::verification::VerificationService;

/// Main entry point for the application.
///
/// This function initializes the application, including:
/// - Logging and tracing.
/// - Configuration loading.
/// - Register record cache and circuit breaker.
/// - External service clients (OCR, register, optional blob storage).
/// - HTTP routes and middleware (CORS, Rate Limiting, body size limit).
///
/// It then starts the Axum server.
///
/// # Returns
///
/// * `anyhow::Result<()>` - Ok if the server runs successfully, or an error if initialization fails.
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "licence_verify_api=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    let config = Config::from_env()?;
    tracing::info!("Configuration loaded successfully");

    // Create register record cache (10 minute TTL, 10k max entries)
    // Memoizes valid register records so repeated submissions of the same
    // licence do not re-scrape the register.
    let register_cache = Cache::builder()
        .time_to_live(Duration::from_secs(600))
        .max_capacity(10_000)
        .build();
    tracing::info!("Register record cache initialized");

    // Circuit breaker shared by all register lookups
    let register_breaker = Arc::new(circuit_breaker::create_register_circuit_breaker());

    // Initialize external service clients
    let ocr_client = OcrClient::new(&config)
        .map_err(|e| anyhow::anyhow!("Failed to initialize OCR client: {}", e))?;
    tracing::info!("✓ OCR client initialized: {}", config.ocr_base_url);

    let register_client = RegisterClient::new(&config, register_cache, register_breaker)
        .map_err(|e| anyhow::anyhow!("Failed to initialize register client: {}", e))?;
    tracing::info!("✓ Register client initialized: {}", config.register_search_url);

    let verifier = VerificationService::new(&config, ocr_client, register_client)
        .map_err(|e| anyhow::anyhow!("Failed to initialize verification service: {}", e))?;
    if config.storage_enabled() {
        tracing::info!("✓ Blob storage enabled for uploaded images");
    }

    // Build application state
    let app_state = Arc::new(handlers::AppState { config: config.clone(), verifier });

    // Configure rate limiter: 10 requests/second per IP, burst of 20
    let governor_conf = Arc::new(
        GovernorConfigBuilder::default()
            .per_second(10)
            .burst_size(20)
            .key_extractor(SmartIpKeyExtractor)
            .finish()
            .unwrap(),
    );

    // Build protected routes with security layers
    let protected_routes = Router::new()
        .route("/upload", post(handlers::upload))
        .layer(
            ServiceBuilder::new()
                // Request size limit: 10MB max payload (card photos)
                .layer(RequestBodyLimitLayer::new(10 * 1024 * 1024))
                // Rate limiting: 10 req/sec per IP, burst of 20
                .layer(GovernorLayer {
                    config: governor_conf,
                }),
        );

    // Build final app with health check (bypasses rate limiting)
    let app = Router::new()
        .route("/health", get(handlers::health))
        .merge(protected_routes)
        .with_state(app_state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive());

    // Start server
    let addr = format!("0.0.0.0:{}", config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Server listening on {}", addr);

    axum::serve(listener, app).await?;

    Ok(())
}
