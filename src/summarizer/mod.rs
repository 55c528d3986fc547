//! Summarizer
//!
//! Turns filtered page text into a structured summary. Summaries are a
//! best-effort enrichment: the crawl engine falls back to the filtered text
//! when the provider is out of quota, rate limited or not configured.

mod openai;

pub use openai::ChatSummarizer;

use crate::config::{RetryConfig, SummarizerConfig};
use async_trait::async_trait;
use std::sync::Arc;
use thiserror::Error;
use tracing::info;

/// Summarizer errors
#[derive(Debug, Error)]
pub enum SummarizerError {
    /// The account has no quota left
    #[error("Quota exhausted: {0}")]
    Quota(String),

    /// Still rate limited after all retries
    #[error("Rate limited: {0}")]
    RateLimited(String),

    /// No provider is configured or the provider is down
    #[error("Summarizer unavailable: {0}")]
    Unavailable(String),

    #[error("Nothing to summarize")]
    EmptyInput,

    #[error("API error ({status}): {message}")]
    Api { status: u16, message: String },

    #[error("Network error: {0}")]
    Network(String),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),
}

impl SummarizerError {
    /// Returns true if the page should keep its filtered text as the summary
    ///
    /// Other errors only fail a page when there is no text to fall back on.
    pub fn allows_fallback(&self) -> bool {
        matches!(
            self,
            Self::Quota(_) | Self::RateLimited(_) | Self::Unavailable(_) | Self::EmptyInput
        )
    }
}

/// LLM summarization capability consumed by the crawl engine
#[async_trait]
pub trait Summarizer: Send + Sync {
    /// Summarizes `text` taken from the page at `url_context`
    async fn summarize(&self, text: &str, url_context: &str) -> Result<String, SummarizerError>;
}

/// Stand-in used when no API key is configured
#[derive(Debug, Clone, Default)]
pub struct UnavailableSummarizer {
    reason: String,
}

impl UnavailableSummarizer {
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }
}

#[async_trait]
impl Summarizer for UnavailableSummarizer {
    async fn summarize(&self, _text: &str, _url_context: &str) -> Result<String, SummarizerError> {
        Err(SummarizerError::Unavailable(self.reason.clone()))
    }
}

/// Builds the configured summarizer
///
/// Reads the API key from the environment variable named by
/// `api-key-env`; without a key every page keeps its filtered text.
pub fn build_summarizer(
    config: &SummarizerConfig,
    retry: &RetryConfig,
) -> Result<Arc<dyn Summarizer>, SummarizerError> {
    match std::env::var(&config.api_key_env) {
        Ok(key) if !key.trim().is_empty() => {
            Ok(Arc::new(ChatSummarizer::new(config, retry, key.trim())?))
        }
        _ => {
            info!(
                "{} not set, pages will keep their filtered text as summary",
                config.api_key_env
            );
            Ok(Arc::new(UnavailableSummarizer::new(format!(
                "{} not set",
                config.api_key_env
            ))))
        }
    }
}
