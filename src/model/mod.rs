//! Execution-result model: suite -> spec -> scenario -> step.
//!
//! These values arrive fully decoded from the host test runner. The engine
//! reads them and attaches its own outputs to the [`SuiteOutcome`].

pub mod insights;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub use insights::{
    Analytics, ExecutiveSummary, FailureGroup, FlakyTest, HealthStatus, HistoricalRun,
    QualityTrend, RunPrediction, Severity, SpecFailureCount, SpecPerformance,
    SuggestionSource, TimelineEntry, TrendData, TrendIndicator, TrendPrediction,
};

/// A single executed step.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct StepOutcome {
    pub text: String,
    pub duration_ms: u64,
    pub failed: bool,
    pub skipped: bool,
    pub error_message: String,
    pub stack_trace: String,
}

/// A scenario and its ordered steps.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ScenarioOutcome {
    pub heading: String,
    pub tags: Vec<String>,
    pub duration_ms: u64,
    pub failed: bool,
    pub skipped: bool,
    pub steps: Vec<StepOutcome>,
}

impl ScenarioOutcome {
    /// Failed if flagged upstream or if any step failed.
    pub fn is_failed(&self) -> bool {
        self.failed || self.steps.iter().any(|s| s.failed)
    }

    /// First failed step in declared order.
    pub fn first_failed_step(&self) -> Option<&StepOutcome> {
        self.steps.iter().find(|s| s.failed)
    }

    pub fn status(&self) -> RunStatus {
        if self.is_failed() {
            RunStatus::Failed
        } else if self.skipped {
            RunStatus::Skipped
        } else {
            RunStatus::Passed
        }
    }
}

/// A specification file and its scenarios.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SpecOutcome {
    pub heading: String,
    pub file_name: String,
    pub tags: Vec<String>,
    pub duration_ms: u64,
    pub failed: bool,
    pub skipped: bool,
    pub scenarios: Vec<ScenarioOutcome>,
}

impl SpecOutcome {
    pub fn is_failed(&self) -> bool {
        self.failed || self.scenarios.iter().any(|s| s.is_failed())
    }

    pub fn status(&self) -> RunStatus {
        if self.is_failed() {
            RunStatus::Failed
        } else if self.skipped {
            RunStatus::Skipped
        } else {
            RunStatus::Passed
        }
    }

    pub fn failed_scenario_count(&self) -> usize {
        self.scenarios.iter().filter(|s| s.is_failed()).count()
    }
}

/// Terminal state of a spec or scenario, as persisted in history.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RunStatus {
    Passed,
    Failed,
    Skipped,
}

impl RunStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RunStatus::Passed => "passed",
            RunStatus::Failed => "failed",
            RunStatus::Skipped => "skipped",
        }
    }

    pub fn parse(s: &str) -> Self {
        match s {
            "failed" => RunStatus::Failed,
            "skipped" => RunStatus::Skipped,
            _ => RunStatus::Passed,
        }
    }
}

impl std::fmt::Display for RunStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Build provenance attached to a run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RunMetadata {
    pub build_number: Option<String>,
    pub git_commit: Option<String>,
    pub branch: Option<String>,
}

/// The full current run, plus the outputs attached by the engine.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SuiteOutcome {
    pub project_name: String,
    pub environment: String,
    pub tags: Vec<String>,
    pub timestamp: DateTime<Utc>,
    pub duration_ms: u64,
    pub metadata: RunMetadata,

    pub passed_specs: usize,
    pub failed_specs: usize,
    pub skipped_specs: usize,
    pub total_specs: usize,
    pub passed_scenarios: usize,
    pub failed_scenarios: usize,
    pub skipped_scenarios: usize,
    pub total_scenarios: usize,
    /// Percentage of passed scenarios, 0-100.
    pub success_rate: f64,

    pub specs: Vec<SpecOutcome>,

    // Engine outputs. Written once per run.
    pub analytics: Option<Analytics>,
    pub trends: Option<TrendData>,
    pub flaky_tests: Option<Vec<FlakyTest>>,
    pub failure_groups: Option<Vec<FailureGroup>>,
    pub executive_summary: Option<ExecutiveSummary>,
}

impl Default for SuiteOutcome {
    fn default() -> Self {
        Self {
            project_name: String::new(),
            environment: String::new(),
            tags: Vec::new(),
            timestamp: Utc::now(),
            duration_ms: 0,
            metadata: RunMetadata::default(),
            passed_specs: 0,
            failed_specs: 0,
            skipped_specs: 0,
            total_specs: 0,
            passed_scenarios: 0,
            failed_scenarios: 0,
            skipped_scenarios: 0,
            total_scenarios: 0,
            success_rate: 0.0,
            specs: Vec::new(),
            analytics: None,
            trends: None,
            flaky_tests: None,
            failure_groups: None,
            executive_summary: None,
        }
    }
}

impl SuiteOutcome {
    /// Build a suite from its specs, deriving every aggregate count.
    pub fn from_specs(project_name: impl Into<String>, specs: Vec<SpecOutcome>) -> Self {
        let mut suite = Self {
            project_name: project_name.into(),
            duration_ms: specs.iter().map(|s| s.duration_ms).fold(0, u64::saturating_add),
            specs,
            ..Self::default()
        };
        suite.recount();
        suite
    }

    /// Recompute spec/scenario counts and the success rate from `specs`.
    pub fn recount(&mut self) {
        let (mut passed, mut failed, mut skipped) = (0, 0, 0);
        for spec in &self.specs {
            match spec.status() {
                RunStatus::Passed => passed += 1,
                RunStatus::Failed => failed += 1,
                RunStatus::Skipped => skipped += 1,
            }
        }
        self.passed_specs = passed;
        self.failed_specs = failed;
        self.skipped_specs = skipped;
        self.total_specs = self.specs.len();

        let (mut passed, mut failed, mut skipped, mut total) = (0, 0, 0, 0);
        for scenario in self.scenarios() {
            total += 1;
            match scenario.status() {
                RunStatus::Passed => passed += 1,
                RunStatus::Failed => failed += 1,
                RunStatus::Skipped => skipped += 1,
            }
        }
        self.passed_scenarios = passed;
        self.failed_scenarios = failed;
        self.skipped_scenarios = skipped;
        self.total_scenarios = total;
        self.success_rate = success_rate(passed, total);
    }

    /// All scenarios in declared order.
    pub fn scenarios(&self) -> impl Iterator<Item = &ScenarioOutcome> {
        self.specs.iter().flat_map(|s| s.scenarios.iter())
    }

    /// True once the engine has attached its outputs.
    pub fn is_processed(&self) -> bool {
        self.executive_summary.is_some()
    }
}

/// Passed / total as a percentage. An empty run is 0%.
pub fn success_rate(passed: usize, total: usize) -> f64 {
    if total == 0 {
        return 0.0;
    }
    passed as f64 / total as f64 * 100.0
}

/// Human-readable duration: `850ms`, `12.5s`, `3m 20s`.
pub fn format_duration_ms(ms: u64) -> String {
    if ms < 1_000 {
        format!("{}ms", ms)
    } else if ms < 60_000 {
        format!("{:.1}s", ms as f64 / 1000.0)
    } else {
        format!("{}m {}s", ms / 60_000, (ms / 1000) % 60)
    }
}
