use std::path::Path;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use rusqlite::{params, Row};
use tracing::{debug, info, warn};

use super::{
    from_db_time, open_pool, to_db_time, window_start, ExecutionRecord, FailurePattern,
    HistoryStore, Pool, ScenarioRecord, ScenarioRun, TrendPoint,
};
use crate::model::{RunMetadata, RunStatus};

/// [`HistoryStore`] backed by a pooled SQLite database.
#[derive(Clone)]
pub struct SqliteHistory {
    pool: Pool,
}

impl SqliteHistory {
    pub fn new(pool: Pool) -> Self {
        Self { pool }
    }

    /// Open (or create) the history database at `path`.
    pub fn open(path: &Path) -> Result<Self> {
        info!(path = %path.display(), "Opening history database");
        let pool = open_pool(path)?;
        Ok(Self::new(pool))
    }

    /// Recurrence record for one signature, if it was ever seen.
    pub fn failure_pattern(&self, signature: &str) -> Result<Option<FailurePattern>> {
        let conn = self.pool.get()?;
        let mut stmt = conn.prepare(
            "SELECT error_signature, classification, first_seen, last_seen, occurrence_count
             FROM failure_patterns WHERE error_signature = ?1",
        )?;
        let mut rows = stmt.query_map(params![signature], |row| {
            Ok(FailurePattern {
                signature: row.get(0)?,
                classification: row.get(1)?,
                first_seen: parse_time(row, 2)?,
                last_seen: parse_time(row, 3)?,
                occurrence_count: row.get::<_, i64>(4)?.max(0) as u64,
            })
        })?;
        rows.next().transpose().map_err(Into::into)
    }
}

fn parse_time(row: &Row<'_>, idx: usize) -> rusqlite::Result<DateTime<Utc>> {
    let raw: String = row.get(idx)?;
    from_db_time(&raw).ok_or_else(|| {
        rusqlite::Error::FromSqlConversionFailure(
            idx,
            rusqlite::types::Type::Text,
            format!("invalid timestamp: {}", raw).into(),
        )
    })
}

fn count(row: &Row<'_>, idx: usize) -> rusqlite::Result<usize> {
    Ok(row.get::<_, i64>(idx)?.max(0) as usize)
}

fn millis(row: &Row<'_>, idx: usize) -> rusqlite::Result<u64> {
    Ok(row.get::<_, i64>(idx)?.max(0) as u64)
}

/// SQLite integers are signed; larger values are clamped.
fn sql_int(v: u64) -> i64 {
    i64::try_from(v).unwrap_or(i64::MAX)
}

fn parse_metadata(raw: &str) -> RunMetadata {
    serde_json::from_str(raw).unwrap_or_default()
}

impl HistoryStore for SqliteHistory {
    fn save_execution(&self, record: &ExecutionRecord) -> Result<()> {
        let conn = self.pool.get()?;
        let tags_json = serde_json::to_string(&record.tags)?;
        let metadata_json = serde_json::to_string(&record.metadata)?;

        conn.execute(
            "INSERT INTO executions (
                id, timestamp, duration_ms, total_scenarios, passed_scenarios,
                failed_scenarios, skipped_scenarios, success_rate, environment,
                tags_json, metadata_json
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
            params![
                record.id,
                to_db_time(&record.timestamp),
                sql_int(record.duration_ms),
                record.total_scenarios as i64,
                record.passed_scenarios as i64,
                record.failed_scenarios as i64,
                record.skipped_scenarios as i64,
                record.success_rate,
                record.environment,
                tags_json,
                metadata_json,
            ],
        )
        .with_context(|| format!("failed to save execution {}", record.id))?;

        debug!(id = %record.id, "Saved execution record");
        Ok(())
    }

    fn save_scenario(&self, record: &ScenarioRecord) -> Result<()> {
        let conn = self.pool.get()?;
        conn.execute(
            "INSERT INTO scenario_history (
                execution_id, scenario_name, spec_name, status,
                duration_ms, error_message, stack_trace
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                record.execution_id,
                record.scenario_name,
                record.spec_name,
                record.status.as_str(),
                sql_int(record.duration_ms),
                record.error_message,
                record.stack_trace,
            ],
        )
        .with_context(|| format!("failed to save scenario {}", record.scenario_name))?;
        Ok(())
    }

    fn recent_executions(&self, limit: usize) -> Result<Vec<ExecutionRecord>> {
        let conn = self.pool.get()?;
        let mut stmt = conn.prepare(
            "SELECT id, timestamp, duration_ms, total_scenarios, passed_scenarios,
                    failed_scenarios, skipped_scenarios, success_rate, environment,
                    tags_json, metadata_json
             FROM executions
             ORDER BY timestamp DESC
             LIMIT ?1",
        )?;

        let rows = stmt.query_map(params![limit as i64], |row| {
            let tags_json: String = row.get(9)?;
            let metadata_json: String = row.get(10)?;
            Ok(ExecutionRecord {
                id: row.get(0)?,
                timestamp: parse_time(row, 1)?,
                duration_ms: millis(row, 2)?,
                total_scenarios: count(row, 3)?,
                passed_scenarios: count(row, 4)?,
                failed_scenarios: count(row, 5)?,
                skipped_scenarios: count(row, 6)?,
                success_rate: row.get(7)?,
                environment: row.get(8)?,
                tags: serde_json::from_str(&tags_json).unwrap_or_default(),
                metadata: parse_metadata(&metadata_json),
            })
        })?;

        let mut executions = Vec::new();
        for r in rows {
            match r {
                Ok(e) => executions.push(e),
                Err(e) => warn!(error = %e, "Skipping unreadable execution row"),
            }
        }
        Ok(executions)
    }

    fn scenario_history(&self, scenario_name: &str, window_days: u32) -> Result<Vec<ScenarioRun>> {
        let conn = self.pool.get()?;
        let mut stmt = conn.prepare(
            "SELECT sh.execution_id, sh.spec_name, sh.status, sh.duration_ms,
                    sh.error_message, sh.stack_trace, e.timestamp
             FROM scenario_history sh
             JOIN executions e ON sh.execution_id = e.id
             WHERE sh.scenario_name = ?1
               AND e.timestamp >= ?2
             ORDER BY e.timestamp DESC",
        )?;

        let rows = stmt.query_map(params![scenario_name, window_start(window_days)], |row| {
            let status: String = row.get(2)?;
            Ok(ScenarioRun {
                execution_id: row.get(0)?,
                spec_name: row.get(1)?,
                status: RunStatus::parse(&status),
                duration_ms: millis(row, 3)?,
                error_message: row.get(4)?,
                stack_trace: row.get(5)?,
                timestamp: parse_time(row, 6)?,
            })
        })?;

        let mut runs = Vec::new();
        for r in rows {
            match r {
                Ok(run) => runs.push(run),
                Err(e) => warn!(scenario = %scenario_name, error = %e, "Skipping unreadable history row"),
            }
        }
        Ok(runs)
    }

    fn trend_points(&self, window_days: u32) -> Result<Vec<TrendPoint>> {
        let conn = self.pool.get()?;
        let mut stmt = conn.prepare(
            "SELECT timestamp, success_rate, duration_ms, total_scenarios,
                    passed_scenarios, failed_scenarios, skipped_scenarios, metadata_json
             FROM executions
             WHERE timestamp >= ?1
             ORDER BY timestamp ASC",
        )?;

        let rows = stmt.query_map(params![window_start(window_days)], |row| {
            let metadata_json: String = row.get(7)?;
            Ok(TrendPoint {
                timestamp: parse_time(row, 0)?,
                success_rate: row.get(1)?,
                duration_ms: millis(row, 2)?,
                total: count(row, 3)?,
                passed: count(row, 4)?,
                failed: count(row, 5)?,
                skipped: count(row, 6)?,
                metadata: parse_metadata(&metadata_json),
            })
        })?;

        let mut points = Vec::new();
        for r in rows {
            match r {
                Ok(p) => points.push(p),
                Err(e) => warn!(error = %e, "Skipping unreadable trend row"),
            }
        }
        Ok(points)
    }

    fn record_failure_pattern(
        &self,
        signature: &str,
        classification: &str,
        seen_at: DateTime<Utc>,
    ) -> Result<()> {
        let conn = self.pool.get()?;
        let seen = to_db_time(&seen_at);
        conn.execute(
            "INSERT INTO failure_patterns (error_signature, classification, first_seen, last_seen)
             VALUES (?1, ?2, ?3, ?3)
             ON CONFLICT(error_signature) DO UPDATE SET
                last_seen = excluded.last_seen,
                occurrence_count = occurrence_count + 1",
            params![signature, classification, seen],
        )?;
        Ok(())
    }

    fn cleanup(&self, retention_days: u32) -> Result<usize> {
        let mut conn = self.pool.get()?;
        let cutoff = window_start(retention_days);
        let tx = conn.transaction()?;

        let scenarios = tx.execute(
            "DELETE FROM scenario_history WHERE execution_id IN
                (SELECT id FROM executions WHERE timestamp < ?1)",
            params![cutoff],
        )?;
        let executions = tx.execute("DELETE FROM executions WHERE timestamp < ?1", params![cutoff])?;
        let patterns = tx.execute("DELETE FROM failure_patterns WHERE last_seen < ?1", params![cutoff])?;
        tx.commit()?;

        let removed = scenarios + executions + patterns;
        info!(retention_days, scenarios, executions, patterns, "Pruned old history");
        Ok(removed)
    }
}
