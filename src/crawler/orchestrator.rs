//! Crawl orchestrator - recursive traversal of one origin
//!
//! Every URL goes through `visit`, which rejects it (shutdown, depth),
//! claims it in the run's [`VisitRegistry`] or attaches to whoever already
//! did, and finally fans out to the same-origin links the page yielded.
//!
//! The shared computation stored in the registry covers only the page
//! itself. Fan-out happens afterwards in the owner's task, so no visit ever
//! waits on a computation that is waiting on it.

use crate::config::{Config, CrawlerConfig, TimeoutConfig};
use crate::crawler::gate::ConcurrencyGate;
use crate::crawler::page_pool::{launch_with_retry, LaunchPolicy, PagePool};
use crate::crawler::page_result::{FailureKind, PageFailure, PageResult};
use crate::crawler::page_timeout::with_page_timeout;
use crate::crawler::rate_limiter::RateLimiter;
use crate::crawler::shutdown::ShutdownSignal;
use crate::driver::{DriverError, PageDriver, PageHandle};
use crate::policy::ContentPolicy;
use crate::state::{Claim, VisitRegistry, VisitState};
use crate::storage::{ArtifactStore, PagePaths, ResultStore, StoredPage};
use crate::summarizer::{Summarizer, SummarizerError};
use crate::url::{is_textual_link, CrawlTarget, Origin};
use crate::ScribeError;
use chrono::Utc;
use futures::future::{BoxFuture, FutureExt};
use std::collections::{BTreeMap, HashSet};
use std::path::PathBuf;
use std::sync::{Arc, Mutex, PoisonError};
use tokio::task::JoinSet;
use tokio::time::Instant;
use tracing::{debug, error, info, warn};
use url::Url;

/// Outcome stored in the registry: the page result plus the links to follow
#[derive(Debug, Clone)]
struct VisitOutcome {
    result: PageResult,
    links: Vec<CrawlTarget>,
}

impl VisitOutcome {
    fn leaf(result: PageResult) -> Self {
        Self {
            result,
            links: Vec::new(),
        }
    }

    fn state(&self) -> VisitState {
        if self.result.is_success() {
            VisitState::Completed
        } else {
            VisitState::Failed
        }
    }
}

/// What a page driver produced for one page
struct Capture {
    links: Vec<String>,
    text: Vec<String>,
    screenshot: PathBuf,
    /// End of the page's time budget, counted from when it got a gate slot
    deadline: Instant,
}

/// State shared by every run of one orchestrator
struct Shared {
    crawler: CrawlerConfig,
    timeouts: TimeoutConfig,
    launch_policy: LaunchPolicy,
    driver: Arc<dyn PageDriver>,
    policy: Arc<dyn ContentPolicy>,
    summarizer: Arc<dyn Summarizer>,
    limiter: RateLimiter,
    artifacts: ArtifactStore,
    results: ResultStore,
    shutdown: ShutdownSignal,
}

/// State of a single `scrape_website` call
struct CrawlRun {
    shared: Arc<Shared>,
    origin: Origin,
    registry: VisitRegistry<VisitOutcome>,
    gate: ConcurrencyGate,
    pool: PagePool,
    fatal: Mutex<Option<String>>,
}

impl CrawlRun {
    /// Records a browser failure that ends the whole crawl
    fn abort(&self, reason: String) {
        error!("Browser is gone, stopping the crawl: {}", reason);
        self.fatal
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get_or_insert(reason);
        self.gate.close();
    }

    fn fatal(&self) -> Option<String> {
        self.fatal
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

/// Recursive crawl engine
///
/// Cheap to clone; clones share the result store, rate limiter and
/// shutdown signal.
#[derive(Clone)]
pub struct Orchestrator {
    inner: Arc<Shared>,
}

impl Orchestrator {
    /// Creates an orchestrator from its collaborators
    ///
    /// # Arguments
    ///
    /// * `config` - Crawl limits, timeouts, cache bounds and output directory
    /// * `driver` - Browser automation backend
    /// * `policy` - Content policy shared by every visit
    /// * `summarizer` - Produces the processed text of each page
    pub fn new(
        config: &Config,
        driver: Arc<dyn PageDriver>,
        policy: Arc<dyn ContentPolicy>,
        summarizer: Arc<dyn Summarizer>,
    ) -> Self {
        Self {
            inner: Arc::new(Shared {
                crawler: config.crawler.clone(),
                timeouts: config.timeouts.clone(),
                launch_policy: LaunchPolicy::from_config(&config.browser, &config.retry),
                driver,
                policy,
                summarizer,
                limiter: RateLimiter::from_config(&config.rate_limit),
                artifacts: ArtifactStore::new(&config.output.output_dir),
                results: ResultStore::from_config(&config.cache),
                shutdown: ShutdownSignal::new(),
            }),
        }
    }

    /// Handle used to stop the crawl from outside
    pub fn shutdown_signal(&self) -> ShutdownSignal {
        self.inner.shutdown.clone()
    }

    /// Cached outcomes of every run made by this orchestrator
    pub fn result_store(&self) -> &ResultStore {
        &self.inner.results
    }

    /// Crawls `root_url` and every reachable same-origin page within depth
    ///
    /// # Returns
    ///
    /// * `Ok(map)` - One entry per URL claimed during this run, keyed by
    ///   normalized URL; failed pages are entries, not errors
    /// * `Err(ScribeError::InvalidRootUrl)` - The root is not an absolute
    ///   http(s) URL; nothing was attempted
    /// * `Err(ScribeError::BrowserLaunch)` - The browser could not be
    ///   (re)launched
    pub async fn scrape_website(
        &self,
        root_url: &str,
    ) -> crate::Result<BTreeMap<String, PageResult>> {
        let root = CrawlTarget::parse(root_url).map_err(|e| ScribeError::InvalidRootUrl {
            url: root_url.to_string(),
            reason: e.to_string(),
        })?;

        let shared = &self.inner;
        launch_with_retry(shared.driver.as_ref(), &shared.launch_policy)
            .await
            .map_err(|e| ScribeError::BrowserLaunch(e.to_string()))?;

        let capacity = shared.crawler.max_concurrent_pages.max(1) as usize;
        let run = Arc::new(CrawlRun {
            shared: Arc::clone(shared),
            origin: root.origin(),
            registry: VisitRegistry::new(),
            gate: ConcurrencyGate::new(capacity),
            pool: PagePool::new(Arc::clone(&shared.driver), shared.launch_policy.clone()),
            fatal: Mutex::new(None),
        });

        info!(
            root = %root,
            max_depth = shared.crawler.max_depth,
            max_concurrent_pages = capacity,
            "Starting crawl"
        );

        let root_key = root.key().to_string();
        let root_result = visit(Arc::clone(&run), root, 0).await;

        let mut results: BTreeMap<String, PageResult> = run
            .registry
            .settled()
            .into_iter()
            .map(|(key, outcome)| (key, outcome.result))
            .collect();
        results.entry(root_key).or_insert(root_result);

        run.pool.close_all().await;
        shared.driver.shutdown().await;

        if let Some(reason) = run.fatal() {
            return Err(ScribeError::BrowserLaunch(reason));
        }

        let successes = results.values().filter(|r| r.is_success()).count();
        info!(
            pages = results.len(),
            successes,
            failures = results.len() - successes,
            "Crawl finished"
        );

        Ok(results)
    }
}

/// Visits `target` at `depth`, then every eligible link it yielded
fn visit(run: Arc<CrawlRun>, target: CrawlTarget, depth: u32) -> BoxFuture<'static, PageResult> {
    async move {
        let shared = &run.shared;
        if shared.shutdown.is_triggered() {
            return PageResult::failed(
                target.key(),
                PageFailure::new(FailureKind::Shutdown, "shutdown"),
            );
        }

        if depth > shared.crawler.max_depth {
            debug!(url = %target, depth, "Skipping URL beyond max depth");
            return PageResult::failed(
                target.key(),
                PageFailure::new(FailureKind::MaxDepth, "max depth reached"),
            );
        }

        let claim = run.registry.claim_or_join(target.key(), || {
            let run = Arc::clone(&run);
            let target = target.clone();
            async move { resolve(&run, &target).await }.boxed()
        });

        let owned = match claim {
            Claim::Owner(computation) => computation.await,
            Claim::Joined(computation) => return computation.await.result,
            Claim::Settled(outcome) => return outcome.result,
        };

        run.registry
            .settle(target.key(), owned.clone(), owned.state());

        if depth < shared.crawler.max_depth {
            fan_out(&run, &owned.links, depth + 1).await;
        }
        owned.result
    }
    .boxed()
}

/// Visits discovered links in small batches with a pause in between
async fn fan_out(run: &Arc<CrawlRun>, links: &[CrawlTarget], depth: u32) {
    let crawler = &run.shared.crawler;
    let batch_size = crawler.link_batch_size.max(1);

    for (index, batch) in links.chunks(batch_size).enumerate() {
        if run.shared.shutdown.is_triggered() || run.fatal().is_some() {
            break;
        }
        if index > 0 && crawler.link_batch_delay_ms > 0 {
            tokio::time::sleep(crawler.link_batch_delay()).await;
        }

        let mut tasks = JoinSet::new();
        for link in batch {
            tasks.spawn(visit(Arc::clone(run), link.clone(), depth));
        }
        while let Some(joined) = tasks.join_next().await {
            if let Err(e) = joined {
                error!("Visit task panicked: {}", e);
            }
        }
    }
}

/// Produces the outcome of a freshly claimed URL
async fn resolve(run: &CrawlRun, target: &CrawlTarget) -> VisitOutcome {
    let shared = &run.shared;

    match shared.artifacts.existing(target).await {
        Ok(Some(stored)) => return resume(run, target, stored),
        Ok(None) => {}
        Err(e) => warn!(url = %target, "Ignoring unreadable artifacts: {}", e),
    }

    if let Some(cached) = shared.results.get(target.key()) {
        debug!(url = %target, "Using cached result");
        return VisitOutcome::leaf(cached);
    }

    let outcome = match process(run, target).await {
        Ok(outcome) => outcome,
        Err(failure) => {
            if !failure.kind.is_rejection() {
                warn!(url = %target, "Page failed: {}", failure);
            }
            VisitOutcome::leaf(PageResult::failed(target.key(), failure))
        }
    };

    let rejected = outcome
        .result
        .error()
        .is_some_and(|failure| failure.kind.is_rejection());
    if !rejected {
        shared.results.set(target.key(), outcome.result.clone());
    }
    outcome
}

/// Rebuilds a completed outcome from an earlier run's artifacts
fn resume(run: &CrawlRun, target: &CrawlTarget, stored: StoredPage) -> VisitOutcome {
    debug!(url = %target, "Resuming from existing artifacts");

    let links = stored
        .links
        .iter()
        .filter_map(|link| CrawlTarget::parse(link).ok())
        .filter(|link| run.origin.contains(link))
        .collect();

    let result = PageResult::completed(
        target.key(),
        stored.content_path,
        stored.processed_content_path,
        stored.screenshot_paths,
        stored.completed_at,
    );
    run.shared.results.set(target.key(), result.clone());

    VisitOutcome { result, links }
}

/// Drives, filters, summarizes and persists one page
async fn process(run: &CrawlRun, target: &CrawlTarget) -> Result<VisitOutcome, PageFailure> {
    let shared = &run.shared;

    if shared.policy.is_restricted(target.url()) {
        return Err(PageFailure::new(
            FailureKind::Restricted,
            format!("{} is restricted by content policy", target.host()),
        ));
    }

    shared.limiter.acquire().await;
    if shared.shutdown.is_triggered() {
        return Err(PageFailure::new(FailureKind::Shutdown, "shutdown"));
    }

    let paths = shared
        .artifacts
        .prepare(target)
        .await
        .map_err(|e| PageFailure::new(FailureKind::Storage, e.to_string()))?;

    let capture = capture(run, target, &paths).await?;
    let deadline = capture.deadline;

    match tokio::time::timeout_at(deadline, complete(run, target, paths, capture)).await {
        Ok(completed) => completed,
        Err(_) => Err(PageFailure::new(
            FailureKind::Timeout,
            format!("page exceeded {}ms", shared.timeouts.page_ms),
        )),
    }
}

/// Filters and summarizes a captured page, then writes its artifacts
async fn complete(
    run: &CrawlRun,
    target: &CrawlTarget,
    paths: PagePaths,
    capture: Capture,
) -> Result<VisitOutcome, PageFailure> {
    let shared = &run.shared;

    let raw_text = capture.text.join("\n\n");
    let filtered = shared.policy.filter_text(&raw_text);

    shared.limiter.acquire().await;
    if shared.shutdown.is_triggered() {
        return Err(PageFailure::new(FailureKind::Shutdown, "shutdown"));
    }
    let processed = match shared.summarizer.summarize(&filtered, target.key()).await {
        Ok(summary) => summary,
        Err(e) => fallback_text(target, e, &filtered)?,
    };

    let links = discover_links(run, target.url(), &capture.links);
    let manifest: Vec<String> = links.iter().map(|link| link.url().to_string()).collect();

    let storage_failure = |e: crate::storage::StorageError| {
        PageFailure::new(FailureKind::Storage, e.to_string())
    };
    let artifacts = &shared.artifacts;
    artifacts
        .write_text(&paths.processed, &processed)
        .await
        .map_err(storage_failure)?;
    artifacts
        .write_links(&paths.links, &manifest)
        .await
        .map_err(storage_failure)?;
    // Written last: its presence marks the page as complete
    artifacts
        .write_text(&paths.content, &filtered)
        .await
        .map_err(storage_failure)?;

    debug!(url = %target, links = links.len(), "Page completed");

    Ok(VisitOutcome {
        result: PageResult::completed(
            target.key(),
            paths.content,
            paths.processed,
            vec![capture.screenshot],
            Utc::now(),
        ),
        links,
    })
}

/// Decides what a page keeps as processed text when summarizing failed
fn fallback_text(
    target: &CrawlTarget,
    error: SummarizerError,
    filtered: &str,
) -> Result<String, PageFailure> {
    if error.allows_fallback() || !filtered.trim().is_empty() {
        debug!(url = %target, "Keeping filtered text, summarizer failed: {}", error);
        Ok(filtered.to_string())
    } else {
        Err(PageFailure::new(FailureKind::Summarizer, error.to_string()))
    }
}

/// Opens a page under a gate slot and captures links, text and screenshot
async fn capture(
    run: &CrawlRun,
    target: &CrawlTarget,
    paths: &PagePaths,
) -> Result<Capture, PageFailure> {
    let Some(_permit) = run.gate.acquire().await else {
        return Err(PageFailure::new(
            FailureKind::Browser,
            "browser is no longer available",
        ));
    };
    if run.shared.shutdown.is_triggered() {
        return Err(PageFailure::new(FailureKind::Shutdown, "shutdown"));
    }

    let timeouts = &run.shared.timeouts;
    let deadline = Instant::now() + timeouts.page();

    let page = match run.pool.acquire().await {
        Ok(page) => page,
        Err(e) => {
            run.abort(e.to_string());
            return Err(PageFailure::new(FailureKind::Browser, e.to_string()));
        }
    };

    run.registry.mark_in_flight(target.key());

    let driven = with_page_timeout(
        drive(run.shared.driver.as_ref(), page, target, paths, timeouts, deadline),
        deadline.saturating_duration_since(Instant::now()),
        "page",
    )
    .await;

    match driven {
        Ok(capture) => {
            run.pool.release(page);
            Ok(capture)
        }
        Err(e) => {
            run.pool.discard(page).await;
            Err(e.into())
        }
    }
}

async fn drive(
    driver: &dyn PageDriver,
    page: PageHandle,
    target: &CrawlTarget,
    paths: &PagePaths,
    timeouts: &TimeoutConfig,
    deadline: Instant,
) -> Result<Capture, DriverError> {
    with_page_timeout(
        driver.navigate(page, target.url(), timeouts.navigation()),
        timeouts.navigation(),
        "navigation",
    )
    .await?;

    let links = driver.extract_links(page).await?;
    let text = driver.extract_text(page).await?;
    let screenshot = with_page_timeout(
        driver.screenshot(page, &paths.screenshot),
        timeouts.screenshot(),
        "screenshot",
    )
    .await?;

    Ok(Capture {
        links,
        text,
        screenshot,
        deadline,
    })
}

/// Resolves raw hrefs into distinct same-origin textual targets
fn discover_links(run: &CrawlRun, base: &Url, hrefs: &[String]) -> Vec<CrawlTarget> {
    let mut seen = HashSet::new();
    hrefs
        .iter()
        .filter_map(|href| CrawlTarget::resolve(base, href).ok())
        .filter(|link| is_textual_link(link.url()))
        .filter(|link| run.origin.contains(link))
        .filter(|link| seen.insert(link.key().to_string()))
        .collect()
}
