//! Statistics of recorded runs
//!
//! Prints what the run ledger knows about a run, used by `--stats`.

use crate::storage::LedgerSummary;

/// Prints a ledger summary in a human-readable format
///
/// # Arguments
///
/// * `summary` - Aggregated outcomes of one run
pub fn print_ledger_summary(summary: &LedgerSummary) {
    println!("=== Crawl Statistics ===\n");

    println!("Run #{}:", summary.run.id);
    println!("  Root URL: {}", summary.run.root_url);
    println!("  Status: {}", summary.run.status.to_db_string());
    println!("  Started: {}", summary.run.started_at);
    if let Some(finished) = &summary.run.finished_at {
        println!("  Finished: {}", finished);
    }
    println!("  Config hash: {}", summary.run.config_hash);
    println!();

    println!("Pages:");
    println!("  Total: {}", summary.total);
    println!("  Succeeded: {}", summary.successes);
    println!("  Failed: {}", summary.failures);
    println!();

    if !summary.failures_by_kind.is_empty() {
        println!("Failures by Kind:");
        let mut kinds: Vec<_> = summary.failures_by_kind.iter().collect();
        kinds.sort_by(|a, b| b.1.cmp(a.1));
        for (kind, count) in kinds {
            println!("  {}: {}", kind, count);
        }
        println!();
    }

    println!(
        "Success Rate: {:.1}% ({} / {} pages)",
        success_rate(summary),
        summary.successes,
        summary.total
    );
}

fn success_rate(summary: &LedgerSummary) -> f64 {
    if summary.total == 0 {
        return 0.0;
    }
    (summary.successes as f64 / summary.total as f64) * 100.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::{RunRecord, RunStatus};
    use std::collections::BTreeMap;

    fn summary(total: u64, successes: u64) -> LedgerSummary {
        LedgerSummary {
            run: RunRecord {
                id: 1,
                root_url: "https://example.com".to_string(),
                started_at: "2024-01-01T00:00:00Z".to_string(),
                finished_at: None,
                config_hash: "abc".to_string(),
                status: RunStatus::Completed,
            },
            total,
            successes,
            failures: total - successes,
            failures_by_kind: BTreeMap::new(),
        }
    }

    #[test]
    fn test_success_rate() {
        assert_eq!(success_rate(&summary(4, 3)), 75.0);
        assert_eq!(success_rate(&summary(0, 0)), 0.0);
    }

    #[test]
    fn test_print_does_not_panic() {
        let mut summary = summary(2, 1);
        summary.failures_by_kind.insert("timeout".to_string(), 1);
        print_ledger_summary(&summary);
    }
}
