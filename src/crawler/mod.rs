//! Crawler module: the recursive crawl engine and its throttles
//!
//! This module contains the core crawling logic, including:
//! - The orchestrator and its per-URL traversal state machine
//! - Token-bucket rate limiting of navigations and summarizer calls
//! - The concurrency gate and page pool bounding open pages
//! - Cooperative shutdown and hard per-operation timeouts

mod gate;
mod orchestrator;
mod page_pool;
mod page_result;
mod page_timeout;
mod rate_limiter;
mod shutdown;

pub use gate::{ConcurrencyGate, GatePermit};
pub use orchestrator::Orchestrator;
pub use page_pool::{launch_with_retry, LaunchPolicy, PagePool};
pub use page_result::{FailureKind, PageFailure, PageResult};
pub use page_timeout::with_page_timeout;
pub use rate_limiter::RateLimiter;
pub use shutdown::ShutdownSignal;

use crate::config::Config;
use crate::driver::build_driver;
use crate::policy::WordlistPolicy;
use crate::summarizer::build_summarizer;
use crate::ScribeError;
use std::sync::Arc;

/// Builds an orchestrator wired with the configured collaborators
///
/// # Arguments
///
/// * `config` - The validated configuration
///
/// # Returns
///
/// * `Ok(Orchestrator)` - Ready to crawl; the browser is launched lazily
/// * `Err(ScribeError)` - A collaborator could not be constructed
pub fn build_orchestrator(config: &Config) -> Result<Orchestrator, ScribeError> {
    let driver = build_driver(&config.browser)?;
    let policy = Arc::new(WordlistPolicy::from_config(&config.policy)?);
    let summarizer = build_summarizer(&config.summarizer, &config.retry)?;

    Ok(Orchestrator::new(config, driver, policy, summarizer))
}
