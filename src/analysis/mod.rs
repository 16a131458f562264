//! Analysis pipeline: per-run breakdown, history trends, flaky detection and
//! the executive summary, tied together by [`IntelligenceEngine`].

pub mod breakdown;
pub mod flaky;
pub mod runner;
pub mod summary;
pub mod trend;

pub use breakdown::analyze;
pub use flaky::{flaky_score, FlakyDetector};
pub use runner::IntelligenceEngine;
pub use summary::summarize;
pub use trend::TrendEngine;
