use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use futures::stream::{self, StreamExt};
use tracing::{debug, info, warn};

use super::{fallback_fix, root_cause, severity};
use crate::classify::{classify, sign};
use crate::llm::{self, CompletionProvider, FixContext};
use crate::model::{FailureGroup, SuggestionSource, SuiteOutcome};

/// First occurrence of a group; the LLM prompt is built from it.
struct FirstOccurrence {
    spec_name: String,
    step_text: String,
    error_message: String,
    stack_trace: String,
}

struct Draft {
    group: FailureGroup,
    first: FirstOccurrence,
}

/// Buckets failed scenarios by signature and attaches a suggested fix.
pub struct FailureGrouper {
    llm: Option<Arc<dyn CompletionProvider>>,
    timeout: Duration,
    workers: usize,
}

impl FailureGrouper {
    pub fn new(llm: Option<Arc<dyn CompletionProvider>>, timeout: Duration, workers: usize) -> Self {
        Self {
            llm,
            timeout,
            workers: workers.max(1),
        }
    }

    /// Group every failed scenario of `suite`.
    ///
    /// Output is sorted by descending count, then ascending signature.
    pub async fn group(&self, suite: &SuiteOutcome) -> Vec<FailureGroup> {
        let mut drafts = scan(suite);

        let fixes: Vec<(usize, String, SuggestionSource)> = stream::iter(drafts.iter().enumerate())
            .map(|(idx, draft)| async move {
                let (fix, source) = self.fix_for(draft).await;
                (idx, fix, source)
            })
            .buffer_unordered(self.workers)
            .collect()
            .await;

        for (idx, fix, source) in fixes {
            drafts[idx].group.suggested_fix = fix;
            drafts[idx].group.suggestion_source = source;
        }

        let mut groups: Vec<FailureGroup> = drafts.into_iter().map(|d| d.group).collect();
        groups.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.signature.cmp(&b.signature)));

        info!(groups = groups.len(), "Failure grouping complete");
        groups
    }

    async fn fix_for(&self, draft: &Draft) -> (String, SuggestionSource) {
        let kind = draft.group.kind;
        let Some(provider) = self.llm.as_deref() else {
            return (fallback_fix(kind).to_string(), SuggestionSource::Pattern);
        };

        let ctx = FixContext {
            spec_name: &draft.first.spec_name,
            step_text: &draft.first.step_text,
            error_message: &draft.first.error_message,
            stack_trace: &draft.first.stack_trace,
        };
        match llm::suggest_fix(provider, &ctx, self.timeout).await {
            Ok(fix) => {
                debug!(signature = %draft.group.signature, provider = provider.name(), "LLM fix suggestion received");
                (fix, SuggestionSource::Llm)
            }
            Err(e) => {
                warn!(
                    signature = %draft.group.signature,
                    provider = provider.name(),
                    error = %e,
                    "LLM fix suggestion failed, using pattern fallback"
                );
                (fallback_fix(kind).to_string(), SuggestionSource::Pattern)
            }
        }
    }
}

/// Single pass over the suite. Groups are kept in first-seen order.
fn scan(suite: &SuiteOutcome) -> Vec<Draft> {
    let mut drafts: Vec<Draft> = Vec::new();
    let mut by_signature: HashMap<String, usize> = HashMap::new();

    for spec in &suite.specs {
        for scenario in spec.scenarios.iter().filter(|s| s.is_failed()) {
            let Some(step) = scenario.first_failed_step() else {
                continue;
            };
            if step.error_message.trim().is_empty() {
                continue;
            }

            let kind = classify(&step.error_message, &step.stack_trace);
            let signature = sign(kind, &step.error_message);

            if let Some(&idx) = by_signature.get(&signature) {
                let group = &mut drafts[idx].group;
                group.count += 1;
                group.affected_scenarios.push(scenario.heading.clone());
                if !group.affected_specs.contains(&spec.heading) {
                    group.affected_specs.push(spec.heading.clone());
                }
                continue;
            }

            debug!(signature = %signature, kind = %kind, scenario = %scenario.heading, "New failure group");
            by_signature.insert(signature.clone(), drafts.len());
            drafts.push(Draft {
                group: FailureGroup {
                    signature,
                    kind,
                    root_cause: root_cause(&step.error_message),
                    count: 1,
                    affected_scenarios: vec![scenario.heading.clone()],
                    affected_specs: vec![spec.heading.clone()],
                    severity: severity(kind, 1),
                    suggested_fix: String::new(),
                    suggestion_source: SuggestionSource::Pattern,
                },
                first: FirstOccurrence {
                    spec_name: spec.heading.clone(),
                    step_text: step.text.clone(),
                    error_message: step.error_message.clone(),
                    stack_trace: step.stack_trace.clone(),
                },
            });
        }
    }

    for draft in &mut drafts {
        draft.group.severity = severity(draft.group.kind, draft.group.count);
    }
    drafts
}
