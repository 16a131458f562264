//! Historical trend series and the next-run forecast.

use std::sync::Arc;

use tracing::{debug, warn};

use crate::model::{
    HistoricalRun, QualityTrend, RunPrediction, TrendData, TrendIndicator, TrendPrediction,
};
use crate::storage::{HistoryStore, TrendPoint};

/// Success-rate movement (percentage points) needed to call a direction.
pub const TREND_DELTA: f64 = 5.0;

/// Fixed confidence attached to every forecast. Not derived from the data.
pub const PREDICTION_CONFIDENCE: f64 = 0.7;

pub struct TrendEngine {
    store: Option<Arc<dyn HistoryStore>>,
}

impl TrendEngine {
    pub fn new(store: Option<Arc<dyn HistoryStore>>) -> Self {
        Self { store }
    }

    /// Series over the last `window_days`, oldest first. Empty without a
    /// store or when the query fails.
    pub fn trends(&self, window_days: u32) -> TrendData {
        let Some(store) = self.store.as_deref() else {
            debug!("No history store, skipping trends");
            return TrendData::default();
        };

        match store.trend_points(window_days) {
            Ok(points) => build(&points),
            Err(e) => {
                warn!(window_days, error = %e, "Trend query failed, returning empty series");
                TrendData::default()
            }
        }
    }
}

fn build(points: &[TrendPoint]) -> TrendData {
    let historical_runs: Vec<HistoricalRun> = points
        .iter()
        .map(|p| HistoricalRun {
            timestamp: p.timestamp,
            success_rate: p.success_rate,
            duration_ms: p.duration_ms,
            passed: p.passed,
            failed: p.failed,
            skipped: p.skipped,
            build_number: p.metadata.build_number.clone(),
            git_commit: p.metadata.git_commit.clone(),
        })
        .collect();

    TrendData {
        success_rate_trend: points.iter().map(|p| p.success_rate).collect(),
        duration_trend: points.iter().map(|p| p.duration_ms).collect(),
        prediction: predict(&historical_runs),
        historical_runs,
    }
}

/// Compare the last two runs. `None` with fewer than two.
pub fn quality(runs: &[HistoricalRun]) -> Option<QualityTrend> {
    let [.., previous, last] = runs else {
        return None;
    };
    let delta = last.success_rate - previous.success_rate;
    Some(if delta > TREND_DELTA {
        QualityTrend::Improving
    } else if delta < -TREND_DELTA {
        QualityTrend::Degrading
    } else {
        QualityTrend::Stable
    })
}

/// Persistence forecast: the next run looks like the latest one.
fn predict(runs: &[HistoricalRun]) -> Option<TrendPrediction> {
    let quality = quality(runs)?;
    let last = runs.last()?;
    Some(TrendPrediction {
        quality,
        next_run: RunPrediction {
            success_rate: last.success_rate,
            duration_ms: last.duration_ms,
            confidence: PREDICTION_CONFIDENCE,
        },
    })
}

/// Summary-level direction for a run's trend data.
pub fn indicator(trends: Option<&TrendData>) -> TrendIndicator {
    match trends.and_then(|t| quality(&t.historical_runs)) {
        Some(QualityTrend::Improving) => TrendIndicator::Improving,
        Some(QualityTrend::Degrading) => TrendIndicator::Declining,
        Some(QualityTrend::Stable) => TrendIndicator::Stable,
        None => TrendIndicator::Baseline,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::RunMetadata;
    use chrono::Utc;

    fn point(success_rate: f64, duration_ms: u64) -> TrendPoint {
        TrendPoint {
            timestamp: Utc::now(),
            success_rate,
            duration_ms,
            total: 10,
            passed: 0,
            failed: 0,
            skipped: 0,
            metadata: RunMetadata {
                build_number: Some("42".into()),
                ..RunMetadata::default()
            },
        }
    }

    #[test]
    fn test_no_store_is_empty() {
        let data = TrendEngine::new(None).trends(30);
        assert!(data.historical_runs.is_empty());
        assert!(data.prediction.is_none());
        assert_eq!(indicator(Some(&data)), TrendIndicator::Baseline);
    }

    #[test]
    fn test_series_follow_points() {
        let data = build(&[point(80.0, 1_000), point(90.0, 1_200)]);
        assert_eq!(data.success_rate_trend, vec![80.0, 90.0]);
        assert_eq!(data.duration_trend, vec![1_000, 1_200]);
        assert_eq!(data.historical_runs[1].build_number.as_deref(), Some("42"));
    }

    #[test]
    fn test_single_point_has_no_prediction() {
        let data = build(&[point(80.0, 1_000)]);
        assert!(data.prediction.is_none());
        assert_eq!(indicator(Some(&data)), TrendIndicator::Baseline);
    }

    #[test]
    fn test_quality_thresholds() {
        let improving = build(&[point(50.0, 1), point(70.0, 1), point(80.0, 2)]);
        let prediction = improving.prediction.unwrap();
        assert_eq!(prediction.quality, QualityTrend::Improving);
        assert_eq!(prediction.next_run.success_rate, 80.0);
        assert_eq!(prediction.next_run.duration_ms, 2);
        assert_eq!(prediction.next_run.confidence, PREDICTION_CONFIDENCE);

        let degrading = build(&[point(90.0, 1), point(80.0, 1)]);
        assert_eq!(degrading.prediction.as_ref().unwrap().quality, QualityTrend::Degrading);
        assert_eq!(indicator(Some(&degrading)), TrendIndicator::Declining);

        // Exactly five points is still stable.
        let stable = build(&[point(90.0, 1), point(95.0, 1)]);
        assert_eq!(stable.prediction.as_ref().unwrap().quality, QualityTrend::Stable);
        assert_eq!(indicator(Some(&stable)), TrendIndicator::Stable);
    }

    #[test]
    fn test_indicator_without_trends() {
        assert_eq!(indicator(None), TrendIndicator::Baseline);
    }
}
