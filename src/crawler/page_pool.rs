//! Reusable page handles and browser (re)launch

use crate::config::{BrowserConfig, RetryConfig};
use crate::driver::{DriverError, PageDriver, PageHandle};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tracing::{debug, info, warn};

/// Bounded retry schedule for launching the browser
#[derive(Debug, Clone)]
pub struct LaunchPolicy {
    pub attempts: u32,
    pub initial_delay: Duration,
    pub backoff_multiplier: f64,
    pub overall_timeout: Duration,
}

impl LaunchPolicy {
    pub fn from_config(browser: &BrowserConfig, retry: &RetryConfig) -> Self {
        Self {
            attempts: browser.launch_attempts,
            initial_delay: retry.retry_delay(),
            backoff_multiplier: browser.backoff_multiplier,
            overall_timeout: browser.launch_timeout(),
        }
    }
}

/// Launches the browser, retrying with exponential backoff
///
/// Gives up after `attempts` failures or once `overall_timeout` has passed,
/// whichever comes first.
pub async fn launch_with_retry(
    driver: &dyn PageDriver,
    policy: &LaunchPolicy,
) -> Result<(), DriverError> {
    let attempts = policy.attempts.max(1);

    let launch = async {
        let mut delay = policy.initial_delay;
        let mut last_error = None;

        for attempt in 1..=attempts {
            match driver.launch().await {
                Ok(()) => {
                    if attempt > 1 {
                        info!(attempt, "Browser launched after retry");
                    }
                    return Ok(());
                }
                Err(e) => {
                    warn!(attempt, attempts, "Browser launch failed: {}", e);
                    last_error = Some(e);
                }
            }

            if attempt < attempts {
                tokio::time::sleep(delay).await;
                delay = delay.mul_f64(policy.backoff_multiplier);
            }
        }

        Err(DriverError::Launch(format!(
            "gave up after {} attempts: {}",
            attempts,
            last_error.map(|e| e.to_string()).unwrap_or_default()
        )))
    };

    match tokio::time::timeout(policy.overall_timeout, launch).await {
        Ok(result) => result,
        Err(_) => Err(DriverError::Launch(format!(
            "launch did not succeed within {}ms",
            policy.overall_timeout.as_millis()
        ))),
    }
}

/// Pool of open page handles, bounded by the concurrency gate
///
/// A new page is only opened when no idle page exists. Callers are
/// expected to hold a gate slot while they hold a page, which keeps the
/// number of open pages at or below the gate's capacity.
///
/// Every handle is tagged with the browser generation it was opened in.
/// A relaunch starts a new generation, and handles from an older one are
/// dropped when they come back instead of being handed out again.
pub struct PagePool {
    driver: Arc<dyn PageDriver>,
    policy: LaunchPolicy,
    pages: Mutex<Pages>,
    open: AtomicUsize,
    relaunch: tokio::sync::Mutex<()>,
}

#[derive(Default)]
struct Pages {
    idle: Vec<PageHandle>,
    borrowed: HashMap<PageHandle, u64>,
    generation: u64,
}

impl PagePool {
    pub fn new(driver: Arc<dyn PageDriver>, policy: LaunchPolicy) -> Self {
        Self {
            driver,
            policy,
            pages: Mutex::new(Pages::default()),
            open: AtomicUsize::new(0),
            relaunch: tokio::sync::Mutex::new(()),
        }
    }

    fn pages(&self) -> MutexGuard<'_, Pages> {
        self.pages.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Borrows a page, relaunching the browser first if it is unhealthy
    ///
    /// An error here means the browser is gone for good.
    pub async fn acquire(&self) -> Result<PageHandle, DriverError> {
        if !self.driver.is_healthy().await {
            self.relaunch().await?;
        }

        let generation = {
            let mut pages = self.pages();
            if let Some(page) = pages.idle.pop() {
                let generation = pages.generation;
                pages.borrowed.insert(page, generation);
                return Ok(page);
            }
            pages.generation
        };

        let page = self.driver.open().await?;
        self.open.fetch_add(1, Ordering::SeqCst);
        self.pages().borrowed.insert(page, generation);
        Ok(page)
    }

    /// Returns a healthy page for reuse
    pub fn release(&self, page: PageHandle) {
        let mut pages = self.pages();
        match pages.borrowed.remove(&page) {
            Some(generation) if generation == pages.generation => pages.idle.push(page),
            _ => {
                // Opened by a browser that has since been relaunched
                debug!(page = page.id(), "Dropping page from a previous browser");
                self.open.fetch_sub(1, Ordering::SeqCst);
            }
        }
    }

    /// Closes a page that failed or timed out
    pub async fn discard(&self, page: PageHandle) {
        let current = {
            let mut pages = self.pages();
            let generation = pages.borrowed.remove(&page);
            generation.map_or(true, |g| g == pages.generation)
        };
        if current {
            self.driver.close(page).await;
        }
        self.open.fetch_sub(1, Ordering::SeqCst);
    }

    /// Closes every idle page
    pub async fn close_all(&self) {
        let idle: Vec<PageHandle> = self.pages().idle.drain(..).collect();
        for page in idle {
            self.driver.close(page).await;
            self.open.fetch_sub(1, Ordering::SeqCst);
        }
    }

    /// Number of pages opened and not yet closed
    pub fn open_pages(&self) -> usize {
        self.open.load(Ordering::SeqCst)
    }

    async fn relaunch(&self) -> Result<(), DriverError> {
        let _guard = self.relaunch.lock().await;

        // Another task may have relaunched while we waited
        if self.driver.is_healthy().await {
            return Ok(());
        }

        warn!("Browser health check failed, relaunching");
        self.close_all().await;
        self.pages().generation += 1;
        self.driver.shutdown().await;
        launch_with_retry(self.driver.as_ref(), &self.policy).await
    }
}
