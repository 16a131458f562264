use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::{debug, info, warn};

use super::{analyze, summarize, FlakyDetector, TrendEngine};
use crate::config::IntelConfig;
use crate::failures::FailureGrouper;
use crate::llm::{self, CompletionProvider, SummaryFacts};
use crate::model::SuiteOutcome;
use crate::storage::{ExecutionRecord, HistoryStore, ScenarioRecord};

/// Runs the full analysis pass over one suite and records it into history.
pub struct IntelligenceEngine {
    config: IntelConfig,
    store: Option<Arc<dyn HistoryStore>>,
    llm: Option<Arc<dyn CompletionProvider>>,
}

impl IntelligenceEngine {
    /// Build an engine. A provider that cannot be constructed (for example a
    /// cloud provider without a key) is logged and treated as absent.
    pub fn new(config: IntelConfig, store: Option<Arc<dyn HistoryStore>>) -> Self {
        let llm = match llm::build_provider(&config.llm) {
            Ok(provider) => provider,
            Err(e) => {
                warn!(provider = %config.llm.provider, error = %e, "LLM provider unavailable, continuing without it");
                None
            }
        };
        if let Some(provider) = &llm {
            info!(provider = provider.name(), model = %config.llm.model_id(), "LLM augmentation enabled");
        }
        Self { config, store, llm }
    }

    /// Replace the configured provider.
    pub fn with_provider(mut self, llm: Option<Arc<dyn CompletionProvider>>) -> Self {
        self.llm = llm;
        self
    }

    /// Analyze `suite` and attach every output to it. Never fails: degraded
    /// collaborators yield empty sections and a warning.
    ///
    /// A suite that already carries results is left untouched.
    pub async fn process(&self, suite: &mut SuiteOutcome) {
        if suite.is_processed() {
            warn!(project = %suite.project_name, "Suite already processed, skipping");
            return;
        }
        let analysis = &self.config.analysis;
        info!(
            project = %suite.project_name,
            scenarios = suite.total_scenarios,
            failed = suite.failed_scenarios,
            "Starting analysis"
        );

        suite.analytics = Some(analyze(suite));

        suite.trends = Some(if analysis.enable_trends {
            TrendEngine::new(self.store.clone()).trends(analysis.trend_window_days)
        } else {
            Default::default()
        });

        suite.flaky_tests = Some(if analysis.flaky_detection {
            FlakyDetector::new(self.store.clone(), analysis).detect(suite)
        } else {
            Vec::new()
        });

        let grouper = FailureGrouper::new(
            self.llm.clone(),
            self.config.llm.timeout(),
            analysis.fix_suggestion_workers,
        );
        let groups = grouper.group(suite).await;

        let mut summary = summarize(suite, &groups);
        summary.narrative = self.narrative(suite, &groups).await;
        info!(health = %summary.health, trend = %summary.trend, groups = groups.len(), "Analysis complete");

        suite.failure_groups = Some(groups);
        suite.executive_summary = Some(summary);

        if self.store.is_some() {
            match self.record_run(suite) {
                Ok(id) => info!(execution_id = %id, "Run recorded into history"),
                Err(e) => warn!(error = %e, "Failed to record run into history"),
            }
            if let Some(days) = self.config.storage.retention_days {
                self.prune(days);
            }
        }
    }

    async fn narrative(
        &self,
        suite: &SuiteOutcome,
        groups: &[crate::model::FailureGroup],
    ) -> Option<String> {
        let provider = self.llm.as_deref()?;
        let facts = SummaryFacts::from_suite(suite, groups);
        match llm::narrate_summary(provider, &facts, self.config.llm.timeout()).await {
            Ok(text) => Some(text),
            Err(e) => {
                warn!(provider = provider.name(), error = %e, "LLM summary failed, omitting narrative");
                None
            }
        }
    }

    /// Persist the run, its scenarios and the failure signatures it produced.
    /// Returns the new execution id.
    pub fn record_run(&self, suite: &SuiteOutcome) -> Result<String> {
        let store = self
            .store
            .as_deref()
            .context("no history store configured")?;

        let id = uuid::Uuid::new_v4().to_string();
        store.save_execution(&ExecutionRecord {
            id: id.clone(),
            timestamp: suite.timestamp,
            duration_ms: suite.duration_ms,
            total_scenarios: suite.total_scenarios,
            passed_scenarios: suite.passed_scenarios,
            failed_scenarios: suite.failed_scenarios,
            skipped_scenarios: suite.skipped_scenarios,
            success_rate: suite.success_rate,
            environment: suite.environment.clone(),
            tags: suite.tags.clone(),
            metadata: suite.metadata.clone(),
        })?;

        let mut saved = 0usize;
        for spec in &suite.specs {
            for scenario in &spec.scenarios {
                let (error_message, stack_trace) = scenario
                    .first_failed_step()
                    .map(|s| (s.error_message.clone(), s.stack_trace.clone()))
                    .unwrap_or_default();
                let record = ScenarioRecord {
                    execution_id: id.clone(),
                    scenario_name: scenario.heading.clone(),
                    spec_name: spec.heading.clone(),
                    status: scenario.status(),
                    duration_ms: scenario.duration_ms,
                    error_message,
                    stack_trace,
                };
                match store.save_scenario(&record) {
                    Ok(()) => saved += 1,
                    Err(e) => warn!(scenario = %scenario.heading, error = %e, "Failed to save scenario history"),
                }
            }
        }

        for group in suite.failure_groups.iter().flatten() {
            if let Err(e) = store.record_failure_pattern(&group.signature, group.kind.label(), suite.timestamp) {
                warn!(signature = %group.signature, error = %e, "Failed to record failure pattern");
            }
        }

        debug!(execution_id = %id, scenarios = saved, "History written");
        Ok(id)
    }

    fn prune(&self, retention_days: u32) {
        let Some(store) = self.store.as_deref() else {
            return;
        };
        if let Err(e) = store.cleanup(retention_days) {
            warn!(retention_days, error = %e, "History cleanup failed");
        }
    }
}
