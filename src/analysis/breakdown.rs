//! Per-run analytics derived from the current suite only.

use std::collections::BTreeMap;

use chrono::Duration;

use crate::classify::{classify, ErrorKind};
use crate::model::{
    Analytics, RunStatus, SpecFailureCount, SpecPerformance, SuiteOutcome, TimelineEntry,
};

/// Entries kept in the slowest / most-failed rankings.
pub const TOP_SPECS: usize = 5;

pub fn analyze(suite: &SuiteOutcome) -> Analytics {
    let spec_count = suite.specs.len() as u64;
    let spec_total = total_ms(suite.specs.iter().map(|s| s.duration_ms));
    let scenario_count = suite.scenarios().count() as u64;
    let scenario_total = total_ms(suite.scenarios().map(|s| s.duration_ms));

    Analytics {
        total_duration_ms: suite.duration_ms,
        average_spec_ms: if spec_count == 0 { 0 } else { spec_total / spec_count },
        average_scenario_ms: if scenario_count == 0 {
            0
        } else {
            scenario_total / scenario_count
        },
        tag_distribution: tag_distribution(suite),
        failure_distribution: failure_distribution(suite),
        slowest_specs: slowest_specs(suite),
        most_failed_specs: most_failed_specs(suite),
        timeline: timeline(suite),
    }
}

fn total_ms(durations: impl Iterator<Item = u64>) -> u64 {
    durations.fold(0, u64::saturating_add)
}

fn tag_distribution(suite: &SuiteOutcome) -> BTreeMap<String, usize> {
    let mut tags = BTreeMap::new();
    for tag in suite.scenarios().flat_map(|s| s.tags.iter()) {
        *tags.entry(tag.clone()).or_insert(0) += 1;
    }
    tags
}

/// Failed scenarios by error kind label.
fn failure_distribution(suite: &SuiteOutcome) -> BTreeMap<String, usize> {
    let mut kinds = BTreeMap::new();
    for scenario in suite.scenarios().filter(|s| s.is_failed()) {
        let kind = match scenario.first_failed_step() {
            Some(step) if !step.error_message.trim().is_empty() => {
                classify(&step.error_message, &step.stack_trace)
            }
            _ => ErrorKind::Unknown,
        };
        *kinds.entry(kind.label().to_string()).or_insert(0) += 1;
    }
    kinds
}

fn slowest_specs(suite: &SuiteOutcome) -> Vec<SpecPerformance> {
    let mut specs: Vec<SpecPerformance> = suite
        .specs
        .iter()
        .map(|s| SpecPerformance {
            spec_name: s.heading.clone(),
            duration_ms: s.duration_ms,
            scenario_count: s.scenarios.len(),
        })
        .collect();
    specs.sort_by(|a, b| {
        b.duration_ms
            .cmp(&a.duration_ms)
            .then_with(|| a.spec_name.cmp(&b.spec_name))
    });
    specs.truncate(TOP_SPECS);
    specs
}

fn most_failed_specs(suite: &SuiteOutcome) -> Vec<SpecFailureCount> {
    let mut specs: Vec<SpecFailureCount> = suite
        .specs
        .iter()
        .map(|s| SpecFailureCount {
            spec_name: s.heading.clone(),
            failure_count: s.failed_scenario_count(),
        })
        .filter(|s| s.failure_count > 0)
        .collect();
    specs.sort_by(|a, b| {
        b.failure_count
            .cmp(&a.failure_count)
            .then_with(|| a.spec_name.cmp(&b.spec_name))
    });
    specs.truncate(TOP_SPECS);
    specs
}

/// Specs laid end to end from the suite start.
fn timeline(suite: &SuiteOutcome) -> Vec<TimelineEntry> {
    let mut entries = Vec::with_capacity(suite.specs.len() * 2);
    let mut cursor = suite.timestamp;

    for spec in &suite.specs {
        let status = spec.status();
        entries.push(TimelineEntry {
            timestamp: cursor,
            event: "spec_start".to_string(),
            spec_name: spec.heading.clone(),
            duration_ms: 0,
            status: status.as_str().to_string(),
        });

        // Past the representable range the cursor stays put.
        if let Some(next) = i64::try_from(spec.duration_ms)
            .ok()
            .and_then(Duration::try_milliseconds)
            .and_then(|d| cursor.checked_add_signed(d))
        {
            cursor = next;
        }
        let event = if status == RunStatus::Failed { "failure" } else { "success" };
        entries.push(TimelineEntry {
            timestamp: cursor,
            event: event.to_string(),
            spec_name: spec.heading.clone(),
            duration_ms: spec.duration_ms,
            status: status.as_str().to_string(),
        });
    }
    entries
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{ScenarioOutcome, SpecOutcome, StepOutcome};

    fn scenario(heading: &str, tags: &[&str], duration_ms: u64, error: Option<&str>) -> ScenarioOutcome {
        let steps = match error {
            Some(msg) => vec![StepOutcome {
                failed: true,
                error_message: msg.into(),
                ..Default::default()
            }],
            None => vec![StepOutcome::default()],
        };
        ScenarioOutcome {
            heading: heading.into(),
            tags: tags.iter().map(|t| t.to_string()).collect(),
            duration_ms,
            steps,
            ..Default::default()
        }
    }

    fn spec(heading: &str, duration_ms: u64, scenarios: Vec<ScenarioOutcome>) -> SpecOutcome {
        SpecOutcome {
            heading: heading.into(),
            duration_ms,
            scenarios,
            ..Default::default()
        }
    }

    fn sample() -> SuiteOutcome {
        SuiteOutcome::from_specs(
            "demo",
            vec![
                spec(
                    "Login",
                    3_000,
                    vec![
                        scenario("ok", &["smoke"], 1_000, None),
                        scenario("bad", &["smoke", "auth"], 2_000, Some("Expected 1 got 2")),
                    ],
                ),
                spec("Search", 1_000, vec![scenario("slow", &[], 1_000, Some("request timed out"))]),
                spec("Cart", 2_000, vec![scenario("add", &["smoke"], 2_000, None)]),
            ],
        )
    }

    #[test]
    fn test_averages_and_total() {
        let analytics = analyze(&sample());
        assert_eq!(analytics.total_duration_ms, 6_000);
        assert_eq!(analytics.average_spec_ms, 2_000);
        assert_eq!(analytics.average_scenario_ms, 1_500);
    }

    #[test]
    fn test_distributions() {
        let analytics = analyze(&sample());
        assert_eq!(analytics.tag_distribution.get("smoke"), Some(&3));
        assert_eq!(analytics.tag_distribution.get("auth"), Some(&1));
        assert_eq!(analytics.failure_distribution.get("Assertion Failure"), Some(&1));
        assert_eq!(analytics.failure_distribution.get("Timeout"), Some(&1));
    }

    #[test]
    fn test_failed_without_message_counts_as_unknown() {
        let flagged = ScenarioOutcome {
            heading: "flagged".into(),
            failed: true,
            ..Default::default()
        };
        let suite = SuiteOutcome::from_specs("demo", vec![spec("S", 10, vec![flagged])]);
        let analytics = analyze(&suite);
        assert_eq!(analytics.failure_distribution.get("Unknown Error"), Some(&1));
    }

    #[test]
    fn test_rankings() {
        let analytics = analyze(&sample());
        let slowest: Vec<&str> = analytics.slowest_specs.iter().map(|s| s.spec_name.as_str()).collect();
        assert_eq!(slowest, vec!["Login", "Cart", "Search"]);

        let failed: Vec<&str> = analytics
            .most_failed_specs
            .iter()
            .map(|s| s.spec_name.as_str())
            .collect();
        assert_eq!(failed, vec!["Login", "Search"]);
    }

    #[test]
    fn test_timeline_accumulates_elapsed_time() {
        let suite = sample();
        let analytics = analyze(&suite);
        assert_eq!(analytics.timeline.len(), 6);

        assert_eq!(analytics.timeline[0].event, "spec_start");
        assert_eq!(analytics.timeline[0].timestamp, suite.timestamp);
        assert_eq!(analytics.timeline[1].event, "failure");
        assert_eq!(analytics.timeline[1].status, "failed");

        let last = &analytics.timeline[5];
        assert_eq!(last.event, "success");
        assert_eq!(last.timestamp, suite.timestamp + Duration::milliseconds(6_000));
    }

    #[test]
    fn test_huge_durations_do_not_overflow() {
        let suite = SuiteOutcome::from_specs(
            "huge",
            vec![
                spec("A", 10u64.pow(16), vec![scenario("a", &[], u64::MAX, None)]),
                spec("B", u64::MAX, vec![scenario("b", &[], u64::MAX, None)]),
            ],
        );
        assert_eq!(suite.duration_ms, u64::MAX);

        let analytics = analyze(&suite);
        assert_eq!(analytics.total_duration_ms, u64::MAX);
        assert_eq!(analytics.average_spec_ms, u64::MAX / 2);
        assert_eq!(analytics.average_scenario_ms, u64::MAX / 2);
        assert_eq!(analytics.timeline.len(), 4);
        let end = analytics.timeline[1].timestamp;
        assert!(end >= suite.timestamp);
        assert_eq!(analytics.timeline[3].timestamp, end);
    }

    #[test]
    fn test_empty_suite() {
        let analytics = analyze(&SuiteOutcome::from_specs("empty", Vec::new()));
        assert_eq!(analytics.average_spec_ms, 0);
        assert_eq!(analytics.average_scenario_ms, 0);
        assert!(analytics.timeline.is_empty());
    }
}
