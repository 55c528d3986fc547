//! Database schema definitions for the Crawlscribe run ledger

/// SQL schema for the database
pub const SCHEMA_SQL: &str = r#"
-- Track crawl runs
CREATE TABLE IF NOT EXISTS runs (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    root_url TEXT NOT NULL,
    started_at TEXT NOT NULL,
    finished_at TEXT,
    config_hash TEXT NOT NULL,
    status TEXT NOT NULL
);

-- One row per URL settled during a run
CREATE TABLE IF NOT EXISTS page_results (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    run_id INTEGER NOT NULL REFERENCES runs(id),
    url TEXT NOT NULL,
    content_path TEXT,
    processed_content_path TEXT,
    screenshot_paths TEXT NOT NULL DEFAULT '[]',
    completed_at TEXT NOT NULL,
    failure_kind TEXT,
    error_message TEXT,
    UNIQUE(run_id, url)
);

CREATE INDEX IF NOT EXISTS idx_page_results_run ON page_results(run_id);
CREATE INDEX IF NOT EXISTS idx_page_results_kind ON page_results(failure_kind);
"#;

/// Initializes the database schema
///
/// # Arguments
///
/// * `conn` - The database connection
///
/// # Returns
///
/// * `Ok(())` - Schema initialized successfully
/// * `Err(rusqlite::Error)` - Failed to initialize schema
pub fn initialize_schema(conn: &rusqlite::Connection) -> Result<(), rusqlite::Error> {
    conn.execute_batch(SCHEMA_SQL)?;
    Ok(())
}
