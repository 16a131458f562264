//! Prompt templates.

use crate::model::{format_duration_ms, FailureGroup, SuiteOutcome};

/// Most failed scenarios listed in the summary prompt.
const MAX_LISTED_FAILURES: usize = 20;

/// Inputs for a fix suggestion: the first occurrence of a failure group.
#[derive(Debug, Clone)]
pub struct FixContext<'a> {
    pub spec_name: &'a str,
    pub step_text: &'a str,
    pub error_message: &'a str,
    pub stack_trace: &'a str,
}

/// Aggregate facts handed to the executive-summary prompt.
#[derive(Debug, Clone, Default)]
pub struct SummaryFacts {
    pub total: usize,
    pub passed: usize,
    pub failed: usize,
    pub skipped: usize,
    pub success_rate: f64,
    pub duration_ms: u64,
    pub failed_scenarios: Vec<String>,
}

impl SummaryFacts {
    pub fn from_suite(suite: &SuiteOutcome, groups: &[FailureGroup]) -> Self {
        let mut failed_scenarios = Vec::new();
        for group in groups {
            for scenario in &group.affected_scenarios {
                failed_scenarios.push(format!("{} ({}): {}", scenario, group.kind, group.root_cause));
            }
        }
        failed_scenarios.truncate(MAX_LISTED_FAILURES);

        Self {
            total: suite.total_scenarios,
            passed: suite.passed_scenarios,
            failed: suite.failed_scenarios,
            skipped: suite.skipped_scenarios,
            success_rate: suite.success_rate,
            duration_ms: suite.duration_ms,
            failed_scenarios,
        }
    }
}

pub fn fix_suggestion(ctx: &FixContext<'_>) -> String {
    format!(
        "You are an expert test automation engineer analyzing a test failure. \
Provide a specific, actionable fix suggestion.

Failed Test:
- Specification: {spec}
- Step: {step}
- Error Message: {error}
- Stack Trace:
{trace}

Provide:
1. Root cause analysis (1-2 sentences)
2. Specific fix recommendation (actionable steps)
3. Code example if applicable (keep it concise)

Focus on the most likely cause and provide practical guidance.

Analysis:",
        spec = ctx.spec_name,
        step = ctx.step_text,
        error = ctx.error_message,
        trace = ctx.stack_trace,
    )
}

pub fn executive_summary(facts: &SummaryFacts) -> String {
    let failures = if facts.failed_scenarios.is_empty() {
        "None".to_string()
    } else {
        facts
            .failed_scenarios
            .iter()
            .map(|f| format!("- {}", f))
            .collect::<Vec<_>>()
            .join("\n")
    };

    format!(
        "You are a QA manager reviewing test automation results. Write a concise \
executive summary (3-4 sentences maximum) for this test execution.

Test Results:
- Total Scenarios: {total}
- Passed: {passed}
- Failed: {failed}
- Skipped: {skipped}
- Success Rate: {rate:.1}%
- Execution Time: {duration}

Failed Scenarios:
{failures}

Requirements:
1. Open with an overall health verdict (Excellent/Good/Fair/Poor)
2. Call out the most critical issues needing attention
3. Give exactly one specific, actionable recommendation
4. Use business-friendly language without technical jargon

Executive Summary:",
        total = facts.total,
        passed = facts.passed,
        failed = facts.failed,
        skipped = facts.skipped,
        rate = facts.success_rate,
        duration = format_duration_ms(facts.duration_ms),
        failures = failures,
    )
}
