//! Outputs the engine attaches to a run for the rendering collaborators.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::classify::ErrorKind;

/// Failure-group severity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Medium,
    High,
    Critical,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Medium => "medium",
            Severity::High => "high",
            Severity::Critical => "critical",
        }
    }

    /// Critical and high groups are surfaced as critical issues.
    pub fn is_urgent(&self) -> bool {
        matches!(self, Severity::Critical | Severity::High)
    }
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Where a group's suggested fix came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SuggestionSource {
    Llm,
    Pattern,
}

/// Failures sharing one signature.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FailureGroup {
    pub signature: String,
    pub kind: ErrorKind,
    pub root_cause: String,
    pub count: usize,
    /// One entry per occurrence, duplicates kept.
    pub affected_scenarios: Vec<String>,
    pub affected_specs: Vec<String>,
    pub severity: Severity,
    pub suggested_fix: String,
    pub suggestion_source: SuggestionSource,
}

/// A scenario whose historical outcomes flip between pass and fail.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FlakyTest {
    pub spec_name: String,
    pub scenario_name: String,
    /// 0.0 (stable) to 1.0 (fails half the time).
    pub flaky_score: f64,
    /// Percentage 0-100.
    pub failure_rate: f64,
    pub occurrences: usize,
    pub last_seen: Option<DateTime<Utc>>,
}

/// One historical run's aggregate outcome.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoricalRun {
    pub timestamp: DateTime<Utc>,
    pub success_rate: f64,
    pub duration_ms: u64,
    pub passed: usize,
    pub failed: usize,
    pub skipped: usize,
    pub build_number: Option<String>,
    pub git_commit: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QualityTrend {
    Improving,
    Degrading,
    Stable,
}

/// Next-run forecast. The values echo the latest run; this is a persistence
/// forecast, not a fitted model, and `confidence` is a fixed placeholder.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunPrediction {
    pub success_rate: f64,
    pub duration_ms: u64,
    pub confidence: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrendPrediction {
    pub quality: QualityTrend,
    pub next_run: RunPrediction,
}

/// Historical series for the trend charts.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TrendData {
    pub historical_runs: Vec<HistoricalRun>,
    pub success_rate_trend: Vec<f64>,
    pub duration_trend: Vec<u64>,
    pub prediction: Option<TrendPrediction>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum HealthStatus {
    Excellent,
    Good,
    Fair,
    Poor,
}

impl HealthStatus {
    /// Inclusive lower bounds: 95, 85, 70.
    pub fn from_success_rate(rate: f64) -> Self {
        if rate >= 95.0 {
            HealthStatus::Excellent
        } else if rate >= 85.0 {
            HealthStatus::Good
        } else if rate >= 70.0 {
            HealthStatus::Fair
        } else {
            HealthStatus::Poor
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            HealthStatus::Excellent => "Excellent",
            HealthStatus::Good => "Good",
            HealthStatus::Fair => "Fair",
            HealthStatus::Poor => "Poor",
        }
    }
}

impl std::fmt::Display for HealthStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TrendIndicator {
    Improving,
    Stable,
    Declining,
    /// Fewer than two historical runs.
    Baseline,
}

impl TrendIndicator {
    pub fn as_str(&self) -> &'static str {
        match self {
            TrendIndicator::Improving => "Improving",
            TrendIndicator::Stable => "Stable",
            TrendIndicator::Declining => "Declining",
            TrendIndicator::Baseline => "Baseline",
        }
    }
}

impl std::fmt::Display for TrendIndicator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// High-level health verdict for a run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutiveSummary {
    pub health: HealthStatus,
    pub key_insights: Vec<String>,
    pub critical_issues: Vec<String>,
    pub trend: TrendIndicator,
    pub recommendation: String,
    /// LLM-written business summary, when a provider answered.
    pub narrative: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpecPerformance {
    pub spec_name: String,
    pub duration_ms: u64,
    pub scenario_count: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpecFailureCount {
    pub spec_name: String,
    pub failure_count: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimelineEntry {
    pub timestamp: DateTime<Utc>,
    /// `spec_start`, `success` or `failure`.
    pub event: String,
    pub spec_name: String,
    pub duration_ms: u64,
    pub status: String,
}

/// Per-run breakdown derived from the current suite only.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Analytics {
    pub total_duration_ms: u64,
    pub average_spec_ms: u64,
    pub average_scenario_ms: u64,
    pub tag_distribution: BTreeMap<String, usize>,
    pub failure_distribution: BTreeMap<String, usize>,
    pub slowest_specs: Vec<SpecPerformance>,
    pub most_failed_specs: Vec<SpecFailureCount>,
    pub timeline: Vec<TimelineEntry>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_health_boundaries() {
        assert_eq!(HealthStatus::from_success_rate(100.0), HealthStatus::Excellent);
        assert_eq!(HealthStatus::from_success_rate(95.0), HealthStatus::Excellent);
        assert_eq!(HealthStatus::from_success_rate(94.9), HealthStatus::Good);
        assert_eq!(HealthStatus::from_success_rate(85.0), HealthStatus::Good);
        assert_eq!(HealthStatus::from_success_rate(84.9), HealthStatus::Fair);
        assert_eq!(HealthStatus::from_success_rate(70.0), HealthStatus::Fair);
        assert_eq!(HealthStatus::from_success_rate(69.9), HealthStatus::Poor);
        assert_eq!(HealthStatus::from_success_rate(0.0), HealthStatus::Poor);
    }

    #[test]
    fn test_severity_serializes_lowercase() {
        let json = serde_json::to_string(&Severity::Critical).unwrap();
        assert_eq!(json, "\"critical\"");
        assert!(Severity::High.is_urgent());
        assert!(!Severity::Medium.is_urgent());
    }

    #[test]
    fn test_trend_indicator_display() {
        assert_eq!(TrendIndicator::Baseline.to_string(), "Baseline");
        assert_eq!(
            serde_json::to_string(&TrendIndicator::Declining).unwrap(),
            "\"Declining\""
        );
    }
}
