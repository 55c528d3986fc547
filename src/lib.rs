//! Crawlscribe: a recursive site crawler with content extraction and summarization
//!
//! This crate walks a website's link graph within a single origin, bounded by
//! depth and concurrency limits, and produces per-page artifacts: filtered raw
//! text, AI-processed text and a screenshot.

pub mod config;
pub mod crawler;
pub mod driver;
pub mod output;
pub mod policy;
pub mod state;
pub mod storage;
pub mod summarizer;
pub mod url;

use thiserror::Error;

/// Main error type for Crawlscribe operations
#[derive(Debug, Error)]
pub enum ScribeError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Invalid root URL {url}: {reason}")]
    InvalidRootUrl { url: String, reason: String },

    #[error("Browser could not be launched: {0}")]
    BrowserLaunch(String),

    #[error("Page driver error: {0}")]
    Driver(#[from] driver::DriverError),

    #[error("Summarizer error: {0}")]
    Summarizer(#[from] summarizer::SummarizerError),

    #[error("Storage error: {0}")]
    StorageError(#[from] storage::StorageError),

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("URL error: {0}")]
    UrlError(#[from] UrlError),

    #[error("HTTP client error: {0}")]
    Reqwest(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid URL in config: {0}")]
    InvalidUrl(String),

    #[error("Invalid domain pattern: {0}")]
    InvalidPattern(String),
}

/// URL-specific errors
#[derive(Debug, Error)]
pub enum UrlError {
    #[error("Failed to parse URL: {0}")]
    Parse(String),

    #[error("Invalid URL scheme: {0}")]
    InvalidScheme(String),

    #[error("Missing domain in URL")]
    MissingDomain,

    #[error("Malformed URL: {0}")]
    Malformed(String),
}

/// Result type alias for Crawlscribe operations
pub type Result<T> = std::result::Result<T, ScribeError>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

/// Result type alias for URL operations
pub type UrlResult<T> = std::result::Result<T, UrlError>;

// Re-export commonly used types
pub use config::Config;
pub use crawler::{build_orchestrator, FailureKind, Orchestrator, PageFailure, PageResult};
pub use state::VisitState;
pub use url::{normalize_url, CrawlTarget, Origin};
