//! Output module for crawl reports
//!
//! This module handles:
//! - Building the JSON report written after every run
//! - Printing human-readable summaries of a run and of the run ledger

mod report;
pub mod stats;

pub use report::{CrawlReport, RouteStats};
pub use stats::print_ledger_summary;
