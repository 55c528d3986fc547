//! SQLite run ledger
//!
//! This module provides a SQLite-based implementation of the RunLedger trait.

use crate::crawler::PageResult;
use crate::storage::schema::initialize_schema;
use crate::storage::traits::{RunLedger, StorageError, StorageResult};
use crate::storage::{LedgerSummary, RunRecord, RunStatus};
use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::collections::BTreeMap;
use std::path::Path;

const RUN_COLUMNS: &str = "id, root_url, started_at, finished_at, config_hash, status";

/// SQLite ledger backend
pub struct SqliteLedger {
    conn: Connection,
}

impl SqliteLedger {
    /// Opens or creates the ledger database
    ///
    /// # Arguments
    ///
    /// * `path` - Path to the SQLite database file
    ///
    /// # Returns
    ///
    /// * `Ok(SqliteLedger)` - Successfully opened/created database
    /// * `Err(StorageError)` - Failed to open database
    pub fn new(path: &Path) -> StorageResult<Self> {
        let conn = Connection::open(path)?;

        conn.execute_batch(
            "
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;
            PRAGMA foreign_keys = ON;
            PRAGMA temp_store = MEMORY;
        ",
        )?;

        initialize_schema(&conn)?;

        Ok(Self { conn })
    }

    /// Creates an in-memory database (for testing)
    #[cfg(test)]
    pub fn new_in_memory() -> StorageResult<Self> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        initialize_schema(&conn)?;
        Ok(Self { conn })
    }

    fn run_from_row(row: &Row<'_>) -> rusqlite::Result<RunRecord> {
        Ok(RunRecord {
            id: row.get(0)?,
            root_url: row.get(1)?,
            started_at: row.get(2)?,
            finished_at: row.get(3)?,
            config_hash: row.get(4)?,
            status: RunStatus::from_db_string(&row.get::<_, String>(5)?)
                .unwrap_or(RunStatus::Running),
        })
    }
}

impl RunLedger for SqliteLedger {
    // ===== Run Management =====

    fn create_run(&mut self, root_url: &str, config_hash: &str) -> StorageResult<i64> {
        let now = Utc::now().to_rfc3339();
        self.conn.execute(
            "INSERT INTO runs (root_url, started_at, config_hash, status) VALUES (?1, ?2, ?3, ?4)",
            params![root_url, now, config_hash, RunStatus::Running.to_db_string()],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    fn get_run(&self, run_id: i64) -> StorageResult<RunRecord> {
        self.conn
            .query_row(
                &format!("SELECT {} FROM runs WHERE id = ?1", RUN_COLUMNS),
                params![run_id],
                Self::run_from_row,
            )
            .optional()?
            .ok_or(StorageError::RunNotFound(run_id))
    }

    fn get_latest_run(&self) -> StorageResult<Option<RunRecord>> {
        let run = self
            .conn
            .query_row(
                &format!("SELECT {} FROM runs ORDER BY id DESC LIMIT 1", RUN_COLUMNS),
                [],
                Self::run_from_row,
            )
            .optional()?;

        Ok(run)
    }

    fn finish_run(&mut self, run_id: i64, status: RunStatus) -> StorageResult<()> {
        let now = Utc::now().to_rfc3339();
        let updated = self.conn.execute(
            "UPDATE runs SET status = ?1, finished_at = ?2 WHERE id = ?3",
            params![status.to_db_string(), now, run_id],
        )?;

        if updated == 0 {
            return Err(StorageError::RunNotFound(run_id));
        }
        Ok(())
    }

    // ===== Page Results =====

    fn record_results<'a, I>(&mut self, run_id: i64, results: I) -> StorageResult<usize>
    where
        I: IntoIterator<Item = &'a PageResult>,
    {
        let tx = self.conn.transaction()?;
        let mut written = 0;
        {
            let mut stmt = tx.prepare(
                "INSERT OR REPLACE INTO page_results
                 (run_id, url, content_path, processed_content_path, screenshot_paths,
                  completed_at, failure_kind, error_message)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            )?;

            for result in results {
                let screenshots: Vec<String> = result
                    .screenshot_paths()
                    .iter()
                    .map(|p| p.display().to_string())
                    .collect();

                stmt.execute(params![
                    run_id,
                    result.url(),
                    result.content_path().map(|p| p.display().to_string()),
                    result
                        .processed_content_path()
                        .map(|p| p.display().to_string()),
                    serde_json::to_string(&screenshots)?,
                    result.timestamp().to_rfc3339(),
                    result.error().map(|e| e.kind.as_str()),
                    result.error().map(|e| e.message.as_str()),
                ])?;
                written += 1;
            }
        }
        tx.commit()?;

        Ok(written)
    }

    fn summarize_run(&self, run_id: i64) -> StorageResult<LedgerSummary> {
        let run = self.get_run(run_id)?;

        let (total, failures): (i64, i64) = self.conn.query_row(
            "SELECT COUNT(*), COUNT(failure_kind) FROM page_results WHERE run_id = ?1",
            params![run_id],
            |row| Ok((row.get(0)?, row.get(1)?)),
        )?;

        let mut stmt = self.conn.prepare(
            "SELECT failure_kind, COUNT(*) FROM page_results
             WHERE run_id = ?1 AND failure_kind IS NOT NULL
             GROUP BY failure_kind",
        )?;

        let failures_by_kind = stmt
            .query_map(params![run_id], |row| {
                Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)? as u64))
            })?
            .collect::<Result<BTreeMap<_, _>, _>>()?;

        Ok(LedgerSummary {
            run,
            total: total as u64,
            successes: (total - failures) as u64,
            failures: failures as u64,
            failures_by_kind,
        })
    }
}
