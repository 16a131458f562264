//! Flaky-test detection from per-scenario history.

use std::collections::HashSet;
use std::sync::Arc;

use anyhow::Result;
use tracing::{debug, info, warn};

use crate::config::AnalysisConfig;
use crate::model::{FlakyTest, RunStatus, SuiteOutcome};
use crate::storage::HistoryStore;

/// 0.0 for a scenario that always passes or always fails, 1.0 when it fails
/// exactly half the time. `failure_rate` is a fraction in `[0, 1]`.
pub fn flaky_score(failure_rate: f64) -> f64 {
    (1.0 - 2.0 * (failure_rate - 0.5).abs()).clamp(0.0, 1.0)
}

pub struct FlakyDetector {
    store: Option<Arc<dyn HistoryStore>>,
    window_days: u32,
    min_runs: usize,
    threshold: f64,
}

impl FlakyDetector {
    pub fn new(store: Option<Arc<dyn HistoryStore>>, cfg: &AnalysisConfig) -> Self {
        Self {
            store,
            window_days: cfg.flaky_window_days,
            min_runs: cfg.min_flaky_runs,
            threshold: cfg.flaky_threshold,
        }
    }

    /// Scenarios of `suite` whose recent history flips between pass and fail,
    /// in suite order. Without a store nothing is flaky.
    pub fn detect(&self, suite: &SuiteOutcome) -> Vec<FlakyTest> {
        let Some(store) = self.store.as_deref() else {
            debug!("No history store, skipping flaky detection");
            return Vec::new();
        };

        let mut seen: HashSet<(&str, &str)> = HashSet::new();
        let mut flaky = Vec::new();

        for spec in &suite.specs {
            for scenario in &spec.scenarios {
                if !seen.insert((spec.heading.as_str(), scenario.heading.as_str())) {
                    continue;
                }
                match self.evaluate(store, &spec.heading, &scenario.heading) {
                    Ok(Some(test)) => flaky.push(test),
                    Ok(None) => {}
                    Err(e) => {
                        warn!(scenario = %scenario.heading, error = %e, "Flaky history query failed, skipping scenario");
                    }
                }
            }
        }

        info!(flaky = flaky.len(), "Flaky detection complete");
        flaky
    }

    fn evaluate(
        &self,
        store: &dyn HistoryStore,
        spec_name: &str,
        scenario_name: &str,
    ) -> Result<Option<FlakyTest>> {
        let runs = store.scenario_history(scenario_name, self.window_days)?;
        if runs.len() < self.min_runs {
            return Ok(None);
        }

        let failures = runs.iter().filter(|r| r.status == RunStatus::Failed).count();
        let failure_rate = failures as f64 / runs.len() as f64;
        let score = flaky_score(failure_rate);
        if score <= self.threshold {
            return Ok(None);
        }

        debug!(scenario = %scenario_name, score, runs = runs.len(), "Scenario flagged as flaky");
        Ok(Some(FlakyTest {
            spec_name: spec_name.to_string(),
            scenario_name: scenario_name.to_string(),
            flaky_score: score,
            failure_rate: failure_rate * 100.0,
            occurrences: runs.len(),
            last_seen: runs.iter().map(|r| r.timestamp).max(),
        }))
    }
}
