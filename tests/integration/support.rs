//! Instrumented collaborators shared by the integration tests

use async_trait::async_trait;
use crawlscribe::config::Config;
use crawlscribe::driver::{DriverError, PageDriver, PageHandle};
use crawlscribe::summarizer::{Summarizer, SummarizerError};
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU32, AtomicU64, AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;
use url::Url;

pub const ROOT: &str = "https://site.test/";

/// One page of the in-memory site
#[derive(Debug, Clone)]
pub struct MockPage {
    pub links: Vec<String>,
    pub text: Vec<String>,
}

/// Builds a site from `(path, links)` pairs; each page's text names its path
pub fn site(pages: &[(&str, &[&str])]) -> HashMap<String, MockPage> {
    pages
        .iter()
        .map(|(path, links)| {
            (
                path.to_string(),
                MockPage {
                    links: links.iter().map(|l| l.to_string()).collect(),
                    text: vec![format!("Welcome to {}", path), "Second block".to_string()],
                },
            )
        })
        .collect()
}

/// Page driver serving an in-memory site and counting everything it does
#[derive(Default)]
pub struct MockDriver {
    site: HashMap<String, MockPage>,
    delay: Duration,
    hanging: HashSet<String>,
    fail_launch: bool,
    pub launches: AtomicU32,
    next_id: AtomicU64,
    loaded: Mutex<HashMap<u64, String>>,
    navigations: Mutex<HashMap<String, usize>>,
    open: AtomicUsize,
    max_open: AtomicUsize,
}

impl MockDriver {
    pub fn new(site: HashMap<String, MockPage>) -> Self {
        Self {
            site,
            ..Default::default()
        }
    }

    /// Every navigation takes `delay`
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// Navigating to `path` never finishes
    pub fn hanging(mut self, path: &str) -> Self {
        self.hanging.insert(path.to_string());
        self
    }

    pub fn failing_launch(mut self) -> Self {
        self.fail_launch = true;
        self
    }

    /// Navigation count per path
    pub fn navigations(&self) -> HashMap<String, usize> {
        self.navigations.lock().unwrap().clone()
    }

    pub fn total_navigations(&self) -> usize {
        self.navigations.lock().unwrap().values().sum()
    }

    pub fn max_open(&self) -> usize {
        self.max_open.load(Ordering::SeqCst)
    }

    fn loaded_path(&self, page: PageHandle) -> Result<String, DriverError> {
        self.loaded
            .lock()
            .unwrap()
            .get(&page.id())
            .cloned()
            .ok_or(DriverError::PageClosed(page.id()))
    }
}

#[async_trait]
impl PageDriver for MockDriver {
    async fn launch(&self) -> Result<(), DriverError> {
        self.launches.fetch_add(1, Ordering::SeqCst);
        if self.fail_launch {
            return Err(DriverError::Launch("no browser installed".to_string()));
        }
        Ok(())
    }

    async fn open(&self) -> Result<PageHandle, DriverError> {
        let open = self.open.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_open.fetch_max(open, Ordering::SeqCst);
        Ok(PageHandle::new(self.next_id.fetch_add(1, Ordering::SeqCst)))
    }

    async fn navigate(&self, page: PageHandle, url: &Url, _: Duration) -> Result<(), DriverError> {
        let path = url.path().to_string();
        *self
            .navigations
            .lock()
            .unwrap()
            .entry(path.clone())
            .or_insert(0) += 1;

        if self.hanging.contains(&path) {
            tokio::time::sleep(Duration::from_secs(30)).await;
        }
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }

        if !self.site.contains_key(&path) {
            return Err(DriverError::Navigation {
                url: url.to_string(),
                message: "HTTP 404".to_string(),
            });
        }

        self.loaded.lock().unwrap().insert(page.id(), path);
        Ok(())
    }

    async fn extract_links(&self, page: PageHandle) -> Result<Vec<String>, DriverError> {
        let path = self.loaded_path(page)?;
        Ok(self.site[&path].links.clone())
    }

    async fn extract_text(&self, page: PageHandle) -> Result<Vec<String>, DriverError> {
        let path = self.loaded_path(page)?;
        Ok(self.site[&path].text.clone())
    }

    async fn screenshot(&self, page: PageHandle, path: &Path) -> Result<PathBuf, DriverError> {
        let loaded = self.loaded_path(page)?;
        std::fs::write(path, format!("capture of {}", loaded))
            .map_err(|e| DriverError::Screenshot(e.to_string()))?;
        Ok(path.to_path_buf())
    }

    async fn close(&self, page: PageHandle) {
        self.loaded.lock().unwrap().remove(&page.id());
        self.open.fetch_sub(1, Ordering::SeqCst);
    }
}

/// How the scripted summarizer answers
#[derive(Debug, Clone, Copy)]
pub enum Script {
    Summarize,
    Quota,
    /// Summarizes after sleeping for the given time
    Slow(Duration),
}

pub struct ScriptedSummarizer {
    script: Script,
    pub calls: AtomicU32,
}

impl ScriptedSummarizer {
    pub fn new(script: Script) -> Self {
        Self {
            script,
            calls: AtomicU32::new(0),
        }
    }
}

#[async_trait]
impl Summarizer for ScriptedSummarizer {
    async fn summarize(&self, text: &str, url_context: &str) -> Result<String, SummarizerError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match self.script {
            Script::Summarize => Ok(format!("# {}\n\n{} chars", url_context, text.len())),
            Script::Quota => Err(SummarizerError::Quota("insufficient_quota".to_string())),
            Script::Slow(delay) => {
                tokio::time::sleep(delay).await;
                Ok(format!("# {}", url_context))
            }
        }
    }
}

/// Configuration with generous rate limits and no batch pauses
pub fn test_config(output_dir: &Path) -> Config {
    let mut config = Config::default();
    config.output.output_dir = output_dir.to_path_buf();
    config.output.database_path = output_dir.join("crawlscribe.db");
    config.crawler.max_depth = 3;
    config.crawler.link_batch_delay_ms = 0;
    config.rate_limit.max_tokens = 1000;
    config.rate_limit.refill_rate = 1000.0;
    config.retry.retry_delay_ms = 1;
    config.browser.launch_attempts = 2;
    config.browser.launch_timeout_ms = 5_000;
    config
}
