//! Per-URL crawl outcomes

use crate::driver::DriverError;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fmt;
use std::path::{Path, PathBuf};

/// Why a URL ended in the Failed state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    /// The crawl was shutting down
    Shutdown,
    /// The URL lies beyond the depth ceiling
    MaxDepth,
    /// The content policy rejected the URL
    Restricted,
    Navigation,
    Timeout,
    Extraction,
    Screenshot,
    /// The summarizer failed and no fallback text existed
    Summarizer,
    /// Artifacts could not be written
    Storage,
    /// The browser died and could not be relaunched
    Browser,
}

impl FailureKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Shutdown => "shutdown",
            Self::MaxDepth => "max_depth",
            Self::Restricted => "restricted",
            Self::Navigation => "navigation",
            Self::Timeout => "timeout",
            Self::Extraction => "extraction",
            Self::Screenshot => "screenshot",
            Self::Summarizer => "summarizer",
            Self::Storage => "storage",
            Self::Browser => "browser",
        }
    }

    /// Returns true for policy rejections rather than technical failures
    pub fn is_rejection(&self) -> bool {
        matches!(self, Self::Shutdown | Self::MaxDepth | Self::Restricted)
    }
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A terminal failure reason carried by a [`PageResult`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PageFailure {
    pub kind: FailureKind,
    pub message: String,
}

impl PageFailure {
    pub fn new(kind: FailureKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

impl From<DriverError> for PageFailure {
    fn from(error: DriverError) -> Self {
        let kind = match &error {
            DriverError::Navigation { .. } | DriverError::Http(_) => FailureKind::Navigation,
            DriverError::Timeout { .. } => FailureKind::Timeout,
            DriverError::Extraction(_) => FailureKind::Extraction,
            DriverError::Screenshot(_) => FailureKind::Screenshot,
            DriverError::Launch(_) | DriverError::PageClosed(_) | DriverError::WebDriver(_) => {
                FailureKind::Browser
            }
        };
        Self::new(kind, error.to_string())
    }
}

impl fmt::Display for PageFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.kind, self.message)
    }
}

/// The outcome of processing one URL
///
/// A completed result always carries its content paths; a failed one never
/// does. The two constructors are the only way to build a result, so the
/// invariant holds for every value.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PageResult {
    url: String,
    content_path: Option<PathBuf>,
    processed_content_path: Option<PathBuf>,
    screenshot_paths: Vec<PathBuf>,
    timestamp: DateTime<Utc>,
    error: Option<PageFailure>,
}

impl PageResult {
    pub fn completed(
        url: impl Into<String>,
        content_path: PathBuf,
        processed_content_path: PathBuf,
        screenshot_paths: Vec<PathBuf>,
        timestamp: DateTime<Utc>,
    ) -> Self {
        Self {
            url: url.into(),
            content_path: Some(content_path),
            processed_content_path: Some(processed_content_path),
            screenshot_paths,
            timestamp,
            error: None,
        }
    }

    pub fn failed(url: impl Into<String>, failure: PageFailure) -> Self {
        Self {
            url: url.into(),
            content_path: None,
            processed_content_path: None,
            screenshot_paths: Vec::new(),
            timestamp: Utc::now(),
            error: Some(failure),
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn content_path(&self) -> Option<&Path> {
        self.content_path.as_deref()
    }

    pub fn processed_content_path(&self) -> Option<&Path> {
        self.processed_content_path.as_deref()
    }

    pub fn screenshot_paths(&self) -> &[PathBuf] {
        &self.screenshot_paths
    }

    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    pub fn error(&self) -> Option<&PageFailure> {
        self.error.as_ref()
    }

    pub fn is_success(&self) -> bool {
        self.error.is_none()
    }
}
