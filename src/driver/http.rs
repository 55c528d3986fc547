//! Plain-HTTP page driver
//!
//! Each "page" is a slot holding the last document fetched into it. There
//! is no JavaScript execution; the screenshot is an HTML snapshot.

use crate::driver::{parse_html, DriverError, PageDriver, PageHandle, ParsedPage};
use async_trait::async_trait;
use reqwest::{header, Client};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tracing::debug;
use url::Url;

struct LoadedDocument {
    html: String,
    parsed: ParsedPage,
}

pub struct HttpPageDriver {
    client: Client,
    pages: Mutex<HashMap<u64, Option<LoadedDocument>>>,
    next_id: AtomicU64,
}

impl HttpPageDriver {
    /// Builds the driver's HTTP client
    ///
    /// # Arguments
    ///
    /// * `user_agent` - Sent with every request
    pub fn new(user_agent: &str) -> Result<Self, DriverError> {
        let client = Client::builder()
            .user_agent(user_agent)
            .connect_timeout(Duration::from_secs(10))
            .gzip(true)
            .brotli(true)
            .build()?;

        Ok(Self {
            client,
            pages: Mutex::new(HashMap::new()),
            next_id: AtomicU64::new(1),
        })
    }

    fn pages(&self) -> MutexGuard<'_, HashMap<u64, Option<LoadedDocument>>> {
        self.pages.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn with_document<T>(
        &self,
        page: PageHandle,
        read: impl FnOnce(&LoadedDocument) -> T,
    ) -> Result<T, DriverError> {
        match self.pages().get(&page.id()) {
            Some(Some(document)) => Ok(read(document)),
            Some(None) => Err(DriverError::Extraction(format!(
                "page {} has no document loaded",
                page.id()
            ))),
            None => Err(DriverError::PageClosed(page.id())),
        }
    }
}

#[async_trait]
impl PageDriver for HttpPageDriver {
    async fn open(&self) -> Result<PageHandle, DriverError> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        self.pages().insert(id, None);
        Ok(PageHandle::new(id))
    }

    async fn navigate(
        &self,
        page: PageHandle,
        url: &Url,
        timeout: Duration,
    ) -> Result<(), DriverError> {
        if !self.pages().contains_key(&page.id()) {
            return Err(DriverError::PageClosed(page.id()));
        }

        let navigation_error = |message: String| DriverError::Navigation {
            url: url.to_string(),
            message,
        };

        let response = self
            .client
            .get(url.as_str())
            .timeout(timeout)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    DriverError::Timeout {
                        operation: "navigation".to_string(),
                        ms: timeout.as_millis() as u64,
                    }
                } else {
                    navigation_error(e.to_string())
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(navigation_error(format!("HTTP {}", status.as_u16())));
        }

        let content_type = response
            .headers()
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("")
            .to_string();

        if !content_type.contains("text/html") {
            return Err(navigation_error(format!(
                "expected an HTML document, got '{}'",
                content_type
            )));
        }

        let final_url = response.url().clone();
        let html = response
            .text()
            .await
            .map_err(|e| navigation_error(e.to_string()))?;

        let parsed = parse_html(&html, &final_url);
        debug!(
            url = %final_url,
            links = parsed.links.len(),
            blocks = parsed.text.len(),
            "Loaded document"
        );

        match self.pages().get_mut(&page.id()) {
            Some(slot) => {
                *slot = Some(LoadedDocument { html, parsed });
                Ok(())
            }
            None => Err(DriverError::PageClosed(page.id())),
        }
    }

    async fn extract_links(&self, page: PageHandle) -> Result<Vec<String>, DriverError> {
        self.with_document(page, |document| document.parsed.links.clone())
    }

    async fn extract_text(&self, page: PageHandle) -> Result<Vec<String>, DriverError> {
        self.with_document(page, |document| document.parsed.text.clone())
    }

    async fn screenshot(&self, page: PageHandle, path: &Path) -> Result<PathBuf, DriverError> {
        let html = self.with_document(page, |document| document.html.clone())?;
        let target = path.with_extension("html");

        tokio::fs::write(&target, html)
            .await
            .map_err(|e| DriverError::Screenshot(format!("{}: {}", target.display(), e)))?;

        Ok(target)
    }

    async fn close(&self, page: PageHandle) {
        self.pages().remove(&page.id());
    }
}
