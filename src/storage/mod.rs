//! Storage module for persisting crawl data
//!
//! This module handles:
//! - The in-memory result cache consulted before re-processing a URL
//! - Per-page artifact files and resume-on-restart detection
//! - The SQLite ledger of runs and their page outcomes

mod artifacts;
mod result_store;
mod schema;
mod sqlite;
mod traits;

pub use artifacts::{ArtifactStore, PagePaths, StoredPage};
pub use result_store::ResultStore;
pub use sqlite::SqliteLedger;
pub use traits::{RunLedger, StorageError, StorageResult};

use std::collections::BTreeMap;
use std::path::Path;

/// Opens or creates the run ledger, creating its parent directory
///
/// # Arguments
///
/// * `path` - Path to the SQLite database file
pub fn open_ledger(path: &Path) -> StorageResult<SqliteLedger> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(|e| StorageError::io(parent, e))?;
    }
    SqliteLedger::new(path)
}

/// Represents a crawl run
#[derive(Debug, Clone)]
pub struct RunRecord {
    pub id: i64,
    pub root_url: String,
    pub started_at: String,
    pub finished_at: Option<String>,
    pub config_hash: String,
    pub status: RunStatus,
}

/// Aggregated page outcomes of one run
#[derive(Debug, Clone)]
pub struct LedgerSummary {
    pub run: RunRecord,
    pub total: u64,
    pub successes: u64,
    pub failures: u64,
    pub failures_by_kind: BTreeMap<String, u64>,
}

/// Status of a crawl run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunStatus {
    Running,
    Completed,
    Interrupted,
    Failed,
}

impl RunStatus {
    pub fn to_db_string(&self) -> &'static str {
        match self {
            Self::Running => "running",
            Self::Completed => "completed",
            Self::Interrupted => "interrupted",
            Self::Failed => "failed",
        }
    }

    pub fn from_db_string(s: &str) -> Option<Self> {
        match s {
            "running" => Some(Self::Running),
            "completed" => Some(Self::Completed),
            "interrupted" => Some(Self::Interrupted),
            "failed" => Some(Self::Failed),
            _ => None,
        }
    }
}
