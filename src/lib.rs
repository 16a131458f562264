//! testsight -- test-result intelligence for automated test suites.
//!
//! This crate classifies and groups failures, detects flaky scenarios from
//! run history, tracks quality trends and writes an executive summary, with
//! optional LLM augmentation that always degrades to deterministic output.

pub mod analysis;
pub mod classify;
pub mod config;
pub mod failures;
pub mod llm;
pub mod model;
pub mod storage;

use std::sync::Arc;

use tracing::warn;

pub use analysis::IntelligenceEngine;
pub use config::IntelConfig;
pub use model::SuiteOutcome;

use storage::{HistoryStore, SqliteHistory};

/// Open the configured history store. A disabled or unopenable store yields
/// `None` and the engine runs without history.
pub fn open_store(config: &IntelConfig) -> Option<Arc<dyn HistoryStore>> {
    if !config.storage.enabled {
        return None;
    }
    match SqliteHistory::open(&config.storage.path) {
        Ok(store) => Some(Arc::new(store)),
        Err(e) => {
            warn!(path = %config.storage.path.display(), error = %e, "History store unavailable, continuing without history");
            None
        }
    }
}
