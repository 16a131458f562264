//! SQLite history storage -- schema, queries, migrations.
//!
//! The engine only sees the [`HistoryStore`] trait; [`SqliteHistory`] is the
//! bundled implementation.

pub mod history;
pub mod schema;

use std::path::Path;

use anyhow::{Context, Result};
use chrono::{DateTime, SecondsFormat, Utc};
use r2d2::Pool as R2D2Pool;
use r2d2_sqlite::SqliteConnectionManager;
use serde::{Deserialize, Serialize};

use crate::model::{RunMetadata, RunStatus};

pub use history::SqliteHistory;

/// Connection Pool type
pub type Pool = R2D2Pool<SqliteConnectionManager>;

/// Open (or create) the SQLite database and return a connection pool.
pub fn open_pool(path: &Path) -> Result<Pool> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent).with_context(|| {
                format!("failed to create history directory: {}", parent.display())
            })?;
        }
    }

    let manager = SqliteConnectionManager::file(path).with_init(|c| {
        c.execute_batch(
            "PRAGMA journal_mode = WAL;
                 PRAGMA synchronous = NORMAL;
                 PRAGMA temp_store = MEMORY;
                 PRAGMA foreign_keys = ON;
                 PRAGMA busy_timeout = 5000;",
        )
    });

    let pool = R2D2Pool::new(manager)?;

    // Run migrations on a single connection
    let conn = pool.get()?;
    schema::migrate(&conn)?;

    Ok(pool)
}

/// Fixed-width UTC timestamp, so stored values sort and compare as text.
pub fn to_db_time(dt: &DateTime<Utc>) -> String {
    dt.to_rfc3339_opts(SecondsFormat::Millis, true)
}

pub fn from_db_time(s: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(s)
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

/// Cutoff for a trailing window of `days`.
pub fn window_start(days: u32) -> String {
    to_db_time(&(Utc::now() - chrono::Duration::days(i64::from(days))))
}

/// One row per run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutionRecord {
    pub id: String,
    pub timestamp: DateTime<Utc>,
    pub duration_ms: u64,
    pub total_scenarios: usize,
    pub passed_scenarios: usize,
    pub failed_scenarios: usize,
    pub skipped_scenarios: usize,
    pub success_rate: f64,
    pub environment: String,
    pub tags: Vec<String>,
    pub metadata: RunMetadata,
}

/// One row per scenario per run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScenarioRecord {
    pub execution_id: String,
    pub scenario_name: String,
    pub spec_name: String,
    pub status: RunStatus,
    pub duration_ms: u64,
    pub error_message: String,
    pub stack_trace: String,
}

/// A scenario's outcome in one past run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScenarioRun {
    pub execution_id: String,
    pub spec_name: String,
    pub status: RunStatus,
    pub duration_ms: u64,
    pub error_message: String,
    pub stack_trace: String,
    pub timestamp: DateTime<Utc>,
}

/// Aggregate outcome of one past run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrendPoint {
    pub timestamp: DateTime<Utc>,
    pub success_rate: f64,
    pub duration_ms: u64,
    pub total: usize,
    pub passed: usize,
    pub failed: usize,
    pub skipped: usize,
    pub metadata: RunMetadata,
}

/// Recurrence record of a failure signature.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FailurePattern {
    pub signature: String,
    pub classification: String,
    pub first_seen: DateTime<Utc>,
    pub last_seen: DateTime<Utc>,
    pub occurrence_count: u64,
}

/// Persistence collaborator consumed by the engine.
pub trait HistoryStore: Send + Sync {
    fn save_execution(&self, record: &ExecutionRecord) -> Result<()>;

    fn save_scenario(&self, record: &ScenarioRecord) -> Result<()>;

    /// Newest first.
    fn recent_executions(&self, limit: usize) -> Result<Vec<ExecutionRecord>>;

    /// Outcomes of `scenario_name` in runs within the last `window_days`,
    /// newest first.
    fn scenario_history(&self, scenario_name: &str, window_days: u32) -> Result<Vec<ScenarioRun>>;

    /// Run aggregates within the last `window_days`, oldest first.
    fn trend_points(&self, window_days: u32) -> Result<Vec<TrendPoint>>;

    /// Insert or bump the recurrence record for `signature`.
    fn record_failure_pattern(
        &self,
        signature: &str,
        classification: &str,
        seen_at: DateTime<Utc>,
    ) -> Result<()>;

    /// Delete history older than `retention_days`. Returns rows removed.
    fn cleanup(&self, retention_days: u32) -> Result<usize>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_db_time_roundtrip_and_ordering() {
        let early = DateTime::parse_from_rfc3339("2026-01-02T03:04:05Z")
            .unwrap()
            .with_timezone(&Utc);
        let late = early + chrono::Duration::milliseconds(1500);

        let a = to_db_time(&early);
        let b = to_db_time(&late);
        assert_eq!(a, "2026-01-02T03:04:05.000Z");
        assert!(a < b);
        assert_eq!(from_db_time(&b), Some(late));
    }

    #[test]
    fn test_open_pool_creates_parent_dir() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("nested").join("history.db");
        let pool = open_pool(&path).unwrap();
        assert!(path.exists());
        let conn = pool.get().unwrap();
        let count: i64 = conn
            .query_row("SELECT COUNT(*) FROM executions", [], |row| row.get(0))
            .unwrap();
        assert_eq!(count, 0);
    }
}
