//! Licence Verification API Library
//!
//! This library provides the core functionality for the licence verification
//! API: OCR text extraction, field parsing, public-register scraping, and
//! verification result assembly.
//!
//! # Modules
//!
//! - `circuit_breaker`: Circuit breaker guarding the register endpoint.
//! - `config`: Configuration management.
//! - `errors`: Error handling types.
//! - `extractor`: OCR provider client (Text Extractor).
//! - `handlers`: HTTP request handlers.
//! - `models`: Core data models.
//! - `parser`: Field extraction strategies (Field Parser).
//! - `register`: Public register lookup and HTML scraping.
//! - `storage`: Blob storage client for uploaded images.
//! - `verification`: Verification pipeline assembler.

// Re-export primary modules for shared use in tests and other binaries
pub mod circuit_breaker;
pub mod config;
pub mod errors;
pub mod extractor;
pub mod handlers;
pub mod models;
pub mod parser;
pub mod register;
pub mod storage;
pub mod verification;
