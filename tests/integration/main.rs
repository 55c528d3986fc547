//! Integration tests for the crawl engine
//!
//! The orchestrator runs against an in-memory site served by a counting
//! page driver, so every traversal property can be observed directly.

mod crawl_tests;
mod support;
