//! End-of-run crawl report

use crate::crawler::PageResult;
use crate::storage::RunStatus;
use crate::url::CrawlTarget;
use crate::ScribeError;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::Path;

/// Outcome counts for one route path
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RouteStats {
    pub total: usize,
    pub successes: usize,
    pub failures: usize,
}

/// Totals, failure breakdown and per-route breakdown of one run
#[derive(Debug, Clone, Serialize)]
pub struct CrawlReport {
    pub root_url: String,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub status: String,
    pub total: usize,
    pub successes: usize,
    pub failures: usize,
    pub failures_by_kind: BTreeMap<String, usize>,
    pub routes: BTreeMap<String, RouteStats>,
    pub pages: BTreeMap<String, PageResult>,
}

impl CrawlReport {
    /// Builds a report from the results of `scrape_website`
    ///
    /// # Arguments
    ///
    /// * `root_url` - The URL the crawl started from
    /// * `results` - Per-URL outcomes keyed by normalized URL
    /// * `started_at` - When the run began
    /// * `status` - Final status of the run
    pub fn from_results(
        root_url: &str,
        results: &BTreeMap<String, PageResult>,
        started_at: DateTime<Utc>,
        status: RunStatus,
    ) -> Self {
        let mut failures_by_kind = BTreeMap::new();
        let mut routes: BTreeMap<String, RouteStats> = BTreeMap::new();
        let mut successes = 0;

        for (key, result) in results {
            let route = CrawlTarget::parse(key)
                .map(|target| target.route())
                .unwrap_or_else(|_| key.clone());
            let stats = routes.entry(route).or_default();
            stats.total += 1;

            match result.error() {
                None => {
                    successes += 1;
                    stats.successes += 1;
                }
                Some(failure) => {
                    stats.failures += 1;
                    *failures_by_kind
                        .entry(failure.kind.as_str().to_string())
                        .or_insert(0) += 1;
                }
            }
        }

        Self {
            root_url: root_url.to_string(),
            started_at,
            finished_at: Utc::now(),
            status: status.to_db_string().to_string(),
            total: results.len(),
            successes,
            failures: results.len() - successes,
            failures_by_kind,
            routes,
            pages: results.clone(),
        }
    }

    pub fn success_rate(&self) -> f64 {
        if self.total == 0 {
            return 0.0;
        }
        (self.successes as f64 / self.total as f64) * 100.0
    }

    /// Writes the report as pretty-printed JSON, creating parent directories
    pub fn write_report(&self, path: &Path) -> Result<(), ScribeError> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        Ok(())
    }

    /// Prints a human-readable summary to stdout
    pub fn print_report(&self) {
        println!("=== Crawl Report ===\n");

        println!("Run:");
        println!("  Root URL: {}", self.root_url);
        println!("  Status: {}", self.status);
        println!(
            "  Duration: {:.1}s",
            (self.finished_at - self.started_at).num_milliseconds() as f64 / 1000.0
        );
        println!();

        println!("Pages:");
        println!("  Total: {}", self.total);
        println!("  Succeeded: {}", self.successes);
        println!("  Failed: {}", self.failures);
        println!();

        if !self.failures_by_kind.is_empty() {
            println!("Failures by Kind:");
            let mut kinds: Vec<_> = self.failures_by_kind.iter().collect();
            kinds.sort_by(|a, b| b.1.cmp(a.1));
            for (kind, count) in kinds {
                println!("  {}: {}", kind, count);
            }
            println!();
        }

        if !self.routes.is_empty() {
            println!("Routes ({}):", self.routes.len());
            for (route, stats) in &self.routes {
                println!(
                    "  {}: {} ok, {} failed",
                    route, stats.successes, stats.failures
                );
            }
            println!();
        }

        println!(
            "Success Rate: {:.1}% ({} / {} pages)",
            self.success_rate(),
            self.successes,
            self.total
        );
    }
}
