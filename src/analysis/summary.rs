//! Executive summary: health verdict, insights and one recommendation.

use super::trend;
use crate::model::{ExecutiveSummary, FailureGroup, HealthStatus, SuiteOutcome, TrendIndicator};

/// Build the deterministic summary. `narrative` is left empty; the engine
/// fills it when an LLM answers.
///
/// Reads `suite.flaky_tests` and `suite.trends`, so those must be attached
/// first.
pub fn summarize(suite: &SuiteOutcome, groups: &[FailureGroup]) -> ExecutiveSummary {
    let health = HealthStatus::from_success_rate(suite.success_rate);
    let trend = trend::indicator(suite.trends.as_ref());
    let critical_issues = critical_issues(groups);
    let recommendation = recommendation(health, !critical_issues.is_empty(), trend).to_string();

    ExecutiveSummary {
        health,
        key_insights: key_insights(suite, groups),
        critical_issues,
        trend,
        recommendation,
        narrative: None,
    }
}

fn key_insights(suite: &SuiteOutcome, groups: &[FailureGroup]) -> Vec<String> {
    let mut insights = Vec::new();

    if suite.failed_scenarios == 0 {
        insights.push("All tests passed successfully - no failures detected".to_string());
    } else {
        insights.push(format!(
            "{} scenario(s) failed out of {} total",
            suite.failed_scenarios, suite.total_scenarios
        ));
    }

    if groups.len() == 1 {
        insights.push("Single root cause identified - focused fix possible".to_string());
    } else if !groups.is_empty() && groups.len() < suite.failed_scenarios {
        insights.push(format!("{} unique failure patterns detected", groups.len()));
    }

    let flaky = suite.flaky_tests.as_ref().map_or(0, Vec::len);
    if flaky > 0 {
        insights.push(format!("{} flaky test(s) detected - needs stabilization", flaky));
    }

    insights
}

fn critical_issues(groups: &[FailureGroup]) -> Vec<String> {
    groups
        .iter()
        .filter(|g| g.severity.is_urgent())
        .map(|g| {
            format!(
                "{}: {} (affects {} scenario(s))",
                g.kind, g.root_cause, g.count
            )
        })
        .collect()
}

pub fn recommendation(
    health: HealthStatus,
    has_critical_issues: bool,
    trend: TrendIndicator,
) -> &'static str {
    if health == HealthStatus::Excellent {
        "Continue maintaining high quality standards. Monitor for any new flaky tests."
    } else if has_critical_issues {
        "Address critical failures immediately before proceeding with new deployments."
    } else if trend == TrendIndicator::Declining {
        "Investigate declining success rate. Review recent changes and consider rolling back if necessary."
    } else {
        "Focus on stabilizing failing scenarios. Prioritize fixes based on failure frequency."
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classify::ErrorKind;
    use crate::model::{
        FlakyTest, HistoricalRun, Severity, SuggestionSource, TrendData,
    };
    use chrono::Utc;

    fn group(kind: ErrorKind, count: usize, severity: Severity) -> FailureGroup {
        FailureGroup {
            signature: format!("{:?}-{}", kind, count),
            kind,
            root_cause: "boom".into(),
            count,
            affected_scenarios: vec!["s".into(); count],
            affected_specs: vec!["spec".into()],
            severity,
            suggested_fix: String::new(),
            suggestion_source: SuggestionSource::Pattern,
        }
    }

    fn suite(total: usize, failed: usize) -> SuiteOutcome {
        let passed = total - failed;
        SuiteOutcome {
            total_scenarios: total,
            failed_scenarios: failed,
            passed_scenarios: passed,
            success_rate: crate::model::success_rate(passed, total),
            ..SuiteOutcome::default()
        }
    }

    fn run(success_rate: f64) -> HistoricalRun {
        HistoricalRun {
            timestamp: Utc::now(),
            success_rate,
            duration_ms: 0,
            passed: 0,
            failed: 0,
            skipped: 0,
            build_number: None,
            git_commit: None,
        }
    }

    #[test]
    fn test_all_passed() {
        let summary = summarize(&suite(20, 0), &[]);
        assert_eq!(summary.health, HealthStatus::Excellent);
        assert_eq!(
            summary.key_insights,
            vec!["All tests passed successfully - no failures detected"]
        );
        assert!(summary.critical_issues.is_empty());
        assert_eq!(summary.trend, TrendIndicator::Baseline);
        assert!(summary.recommendation.starts_with("Continue maintaining"));
        assert!(summary.narrative.is_none());
    }

    #[test]
    fn test_single_root_cause() {
        let groups = [group(ErrorKind::Timeout, 3, Severity::Critical)];
        let summary = summarize(&suite(10, 3), &groups);
        assert_eq!(summary.health, HealthStatus::Fair);
        assert_eq!(summary.key_insights[0], "3 scenario(s) failed out of 10 total");
        assert_eq!(
            summary.key_insights[1],
            "Single root cause identified - focused fix possible"
        );
        assert_eq!(
            summary.critical_issues,
            vec!["Timeout: boom (affects 3 scenario(s))"]
        );
        assert!(summary.recommendation.starts_with("Address critical failures"));
    }

    #[test]
    fn test_unique_patterns_only_when_fewer_than_failures() {
        let groups = [
            group(ErrorKind::Assertion, 2, Severity::High),
            group(ErrorKind::FileSystem, 1, Severity::Medium),
        ];
        let summary = summarize(&suite(10, 3), &groups);
        assert_eq!(summary.key_insights[1], "2 unique failure patterns detected");
        assert_eq!(summary.critical_issues.len(), 1);

        let groups = [
            group(ErrorKind::FileSystem, 1, Severity::Medium),
            group(ErrorKind::Unknown, 1, Severity::Medium),
        ];
        let summary = summarize(&suite(10, 2), &groups);
        assert_eq!(summary.key_insights.len(), 1);
        assert!(summary.critical_issues.is_empty());
        assert!(summary.recommendation.starts_with("Focus on stabilizing"));
    }

    #[test]
    fn test_flaky_insight() {
        let mut s = suite(10, 0);
        s.flaky_tests = Some(vec![FlakyTest {
            spec_name: "a".into(),
            scenario_name: "b".into(),
            flaky_score: 1.0,
            failure_rate: 50.0,
            occurrences: 4,
            last_seen: None,
        }]);
        let summary = summarize(&s, &[]);
        assert_eq!(summary.key_insights.last().unwrap(), "1 flaky test(s) detected - needs stabilization");
    }

    #[test]
    fn test_declining_trend_recommendation() {
        let mut s = suite(10, 2);
        s.trends = Some(TrendData {
            historical_runs: vec![run(95.0), run(80.0)],
            ..TrendData::default()
        });
        let groups = [group(ErrorKind::FileSystem, 2, Severity::Medium)];
        let summary = summarize(&s, &groups);
        assert_eq!(summary.trend, TrendIndicator::Declining);
        assert!(summary.recommendation.starts_with("Investigate declining success rate"));
    }

    #[test]
    fn test_recommendation_precedence() {
        assert!(recommendation(HealthStatus::Excellent, true, TrendIndicator::Declining)
            .starts_with("Continue"));
        assert!(recommendation(HealthStatus::Poor, true, TrendIndicator::Declining)
            .starts_with("Address"));
        assert!(recommendation(HealthStatus::Good, false, TrendIndicator::Improving)
            .starts_with("Focus"));
    }
}
