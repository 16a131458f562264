//! Database schema and migrations.

use anyhow::Result;
use rusqlite::Connection;

/// Run all pending migrations.
pub fn migrate(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS executions (
            id TEXT PRIMARY KEY,
            timestamp TEXT NOT NULL,
            duration_ms INTEGER NOT NULL,
            total_scenarios INTEGER NOT NULL,
            passed_scenarios INTEGER NOT NULL,
            failed_scenarios INTEGER NOT NULL,
            skipped_scenarios INTEGER NOT NULL,
            success_rate REAL NOT NULL,
            environment TEXT NOT NULL DEFAULT '',
            tags_json TEXT NOT NULL DEFAULT '[]',
            metadata_json TEXT NOT NULL DEFAULT '{}',
            created_at TEXT NOT NULL DEFAULT (datetime('now'))
        );

        CREATE TABLE IF NOT EXISTS scenario_history (
            id INTEGER PRIMARY KEY,
            execution_id TEXT NOT NULL,
            scenario_name TEXT NOT NULL,
            spec_name TEXT NOT NULL,
            status TEXT NOT NULL,
            duration_ms INTEGER NOT NULL DEFAULT 0,
            error_message TEXT NOT NULL DEFAULT '',
            stack_trace TEXT NOT NULL DEFAULT '',
            created_at TEXT NOT NULL DEFAULT (datetime('now')),
            FOREIGN KEY (execution_id) REFERENCES executions(id) ON DELETE CASCADE
        );

        CREATE TABLE IF NOT EXISTS failure_patterns (
            id INTEGER PRIMARY KEY,
            error_signature TEXT NOT NULL UNIQUE,
            classification TEXT NOT NULL,
            first_seen TEXT NOT NULL,
            last_seen TEXT NOT NULL,
            occurrence_count INTEGER NOT NULL DEFAULT 1,
            created_at TEXT NOT NULL DEFAULT (datetime('now'))
        );

        CREATE INDEX IF NOT EXISTS idx_executions_timestamp ON executions(timestamp DESC);
        CREATE INDEX IF NOT EXISTS idx_scenario_history_name ON scenario_history(scenario_name);
        CREATE INDEX IF NOT EXISTS idx_scenario_history_execution ON scenario_history(execution_id);
        CREATE INDEX IF NOT EXISTS idx_failure_patterns_signature ON failure_patterns(error_signature);",
    )?;

    Ok(())
}
