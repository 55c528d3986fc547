//! WebDriver-backed page driver
//!
//! Each page handle owns its own WebDriver session, so pages never share
//! navigation state. Links and text are read from the rendered DOM.

use crate::driver::{parse_html, DriverError, PageDriver, PageHandle, ParsedPage};
use async_trait::async_trait;
use fantoccini::{Client, ClientBuilder};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tracing::{debug, warn};
use url::Url;

struct Session {
    client: Client,
    parsed: Option<ParsedPage>,
}

pub struct WebDriverPageDriver {
    webdriver_url: String,
    http: reqwest::Client,
    sessions: Mutex<HashMap<u64, Session>>,
    next_id: AtomicU64,
}

impl WebDriverPageDriver {
    /// Creates a driver for the WebDriver server at `webdriver_url`
    ///
    /// No connection is made until [`PageDriver::launch`].
    pub fn new(webdriver_url: &str) -> Result<Self, DriverError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(5))
            .build()?;

        Ok(Self {
            webdriver_url: webdriver_url.trim_end_matches('/').to_string(),
            http,
            sessions: Mutex::new(HashMap::new()),
            next_id: AtomicU64::new(1),
        })
    }

    fn sessions(&self) -> MutexGuard<'_, HashMap<u64, Session>> {
        self.sessions.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn client(&self, page: PageHandle) -> Result<Client, DriverError> {
        self.sessions()
            .get(&page.id())
            .map(|session| session.client.clone())
            .ok_or(DriverError::PageClosed(page.id()))
    }

    fn with_parsed<T>(
        &self,
        page: PageHandle,
        read: impl FnOnce(&ParsedPage) -> T,
    ) -> Result<T, DriverError> {
        match self.sessions().get(&page.id()) {
            Some(Session {
                parsed: Some(parsed),
                ..
            }) => Ok(read(parsed)),
            Some(_) => Err(DriverError::Extraction(format!(
                "page {} has no document loaded",
                page.id()
            ))),
            None => Err(DriverError::PageClosed(page.id())),
        }
    }

    /// Queries the W3C `/status` endpoint
    async fn server_ready(&self) -> Result<bool, DriverError> {
        let status: serde_json::Value = self
            .http
            .get(format!("{}/status", self.webdriver_url))
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        Ok(status["value"]["ready"].as_bool().unwrap_or(true))
    }
}

#[async_trait]
impl PageDriver for WebDriverPageDriver {
    async fn launch(&self) -> Result<(), DriverError> {
        match self.server_ready().await {
            Ok(true) => {
                debug!(url = %self.webdriver_url, "WebDriver server ready");
                Ok(())
            }
            Ok(false) => Err(DriverError::Launch(format!(
                "WebDriver server at {} is not ready",
                self.webdriver_url
            ))),
            Err(e) => Err(DriverError::Launch(format!(
                "WebDriver server at {} unreachable: {}",
                self.webdriver_url, e
            ))),
        }
    }

    async fn is_healthy(&self) -> bool {
        matches!(self.server_ready().await, Ok(true))
    }

    async fn open(&self) -> Result<PageHandle, DriverError> {
        let client = ClientBuilder::native()
            .connect(&self.webdriver_url)
            .await
            .map_err(|e| DriverError::WebDriver(e.to_string()))?;

        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        self.sessions().insert(
            id,
            Session {
                client,
                parsed: None,
            },
        );
        Ok(PageHandle::new(id))
    }

    async fn navigate(
        &self,
        page: PageHandle,
        url: &Url,
        timeout: Duration,
    ) -> Result<(), DriverError> {
        let client = self.client(page)?;

        match tokio::time::timeout(timeout, client.goto(url.as_str())).await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => {
                return Err(DriverError::Navigation {
                    url: url.to_string(),
                    message: e.to_string(),
                })
            }
            Err(_) => {
                return Err(DriverError::Timeout {
                    operation: "navigation".to_string(),
                    ms: timeout.as_millis() as u64,
                })
            }
        }

        let base = client.current_url().await.unwrap_or_else(|_| url.clone());
        let html = client
            .source()
            .await
            .map_err(|e| DriverError::Extraction(e.to_string()))?;

        let parsed = parse_html(&html, &base);
        match self.sessions().get_mut(&page.id()) {
            Some(session) => {
                session.parsed = Some(parsed);
                Ok(())
            }
            None => Err(DriverError::PageClosed(page.id())),
        }
    }

    async fn extract_links(&self, page: PageHandle) -> Result<Vec<String>, DriverError> {
        self.with_parsed(page, |parsed| parsed.links.clone())
    }

    async fn extract_text(&self, page: PageHandle) -> Result<Vec<String>, DriverError> {
        self.with_parsed(page, |parsed| parsed.text.clone())
    }

    async fn screenshot(&self, page: PageHandle, path: &Path) -> Result<PathBuf, DriverError> {
        let client = self.client(page)?;
        let png = client
            .screenshot()
            .await
            .map_err(|e| DriverError::Screenshot(e.to_string()))?;

        let target = path.with_extension("png");
        tokio::fs::write(&target, png)
            .await
            .map_err(|e| DriverError::Screenshot(format!("{}: {}", target.display(), e)))?;

        Ok(target)
    }

    async fn close(&self, page: PageHandle) {
        let session = self.sessions().remove(&page.id());
        if let Some(session) = session {
            if let Err(e) = session.client.close().await {
                warn!(page = page.id(), "Failed to close WebDriver session: {}", e);
            }
        }
    }

    async fn shutdown(&self) {
        let sessions: Vec<(u64, Session)> = self.sessions().drain().collect();
        for (id, session) in sessions {
            if let Err(e) = session.client.close().await {
                warn!(page = id, "Failed to close WebDriver session: {}", e);
            }
        }
    }
}
