//! Page drivers
//!
//! A [`PageDriver`] opens pages, navigates them and reads back links, text
//! and a screenshot. The crawl engine only talks to this trait; which
//! implementation backs it is chosen by `[browser] driver` in the config.

mod http;
mod parser;
mod webdriver;

pub use http::HttpPageDriver;
pub use parser::{parse_html, ParsedPage};
pub use webdriver::WebDriverPageDriver;

use crate::config::{BrowserConfig, DriverKind};
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use url::Url;

/// Errors raised by page drivers
#[derive(Debug, Error)]
pub enum DriverError {
    #[error("Browser launch failed: {0}")]
    Launch(String),

    #[error("Navigation to {url} failed: {message}")]
    Navigation { url: String, message: String },

    #[error("{operation} timed out after {ms}ms")]
    Timeout { operation: String, ms: u64 },

    #[error("Extraction failed: {0}")]
    Extraction(String),

    #[error("Screenshot failed: {0}")]
    Screenshot(String),

    #[error("Page {0} is not open")]
    PageClosed(u64),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("WebDriver error: {0}")]
    WebDriver(String),
}

/// Opaque handle to one open page
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PageHandle(u64);

impl PageHandle {
    pub fn new(id: u64) -> Self {
        Self(id)
    }

    pub fn id(&self) -> u64 {
        self.0
    }
}

/// Browser automation capability consumed by the crawl engine
///
/// Implementations must be safe to call from many tasks at once; each call
/// names the page it operates on.
#[async_trait]
pub trait PageDriver: Send + Sync {
    /// Starts the underlying browser
    async fn launch(&self) -> Result<(), DriverError> {
        Ok(())
    }

    /// Returns false if the browser must be torn down and relaunched
    async fn is_healthy(&self) -> bool {
        true
    }

    async fn open(&self) -> Result<PageHandle, DriverError>;

    async fn navigate(
        &self,
        page: PageHandle,
        url: &Url,
        timeout: Duration,
    ) -> Result<(), DriverError>;

    /// Raw `href` values of the loaded document, absolute where possible
    async fn extract_links(&self, page: PageHandle) -> Result<Vec<String>, DriverError>;

    /// Readable text blocks of the loaded document
    async fn extract_text(&self, page: PageHandle) -> Result<Vec<String>, DriverError>;

    /// Captures the page and returns where the capture was written
    ///
    /// The extension of `path` may be replaced to match the capture format.
    async fn screenshot(&self, page: PageHandle, path: &Path) -> Result<PathBuf, DriverError>;

    async fn close(&self, page: PageHandle);

    /// Releases the browser itself
    async fn shutdown(&self) {}
}

/// Builds the page driver selected by the configuration
pub fn build_driver(config: &BrowserConfig) -> Result<Arc<dyn PageDriver>, DriverError> {
    match config.driver {
        DriverKind::Http => Ok(Arc::new(HttpPageDriver::new(&config.user_agent)?)),
        DriverKind::Webdriver => Ok(Arc::new(WebDriverPageDriver::new(&config.webdriver_url)?)),
    }
}
