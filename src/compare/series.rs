use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::info;

use crate::compare::diff_engine::DiffEngine;
use crate::timeseries::{AlignedRow, AlignedSeries};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SeriesReason {
    MissingNem,
    MissingMeter,
    ValueMismatch,
    QualityMismatch,
}

impl SeriesReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            SeriesReason::MissingNem => "missing_nem",
            SeriesReason::MissingMeter => "missing_meter",
            SeriesReason::ValueMismatch => "value_mismatch",
            SeriesReason::QualityMismatch => "quality_mismatch",
        }
    }
}

/// An aligned interval where the report and the meter disagree
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IntervalDiscrepancy {
    pub interval_ts: DateTime<Utc>,
    pub value_nem: Option<f64>,
    pub quality_nem: Option<String>,
    pub value_meter: Option<f64>,
    pub quality_meter: Option<String>,
    pub mapped_quality_meter: Option<String>,
    pub value_match: bool,
    pub reason: SeriesReason,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SeriesStats {
    pub total_intervals: usize,
    pub matches: usize,
    pub match_percentage: f64,
    pub missing_nem: usize,
    pub missing_meter: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SeriesComparison {
    pub stats: SeriesStats,
    /// Non-matching rows in timeline order
    pub discrepancies: Vec<IntervalDiscrepancy>,
}

fn numbers_match(a: Option<f64>, b: Option<f64>, tolerance: f64) -> bool {
    match (a, b) {
        (Some(a), Some(b)) => (a - b).abs() <= tolerance,
        _ => false,
    }
}

impl<'a> DiffEngine<'a> {
    /// Compare reported and meter values row by row on an aligned timeline
    pub fn compare_series(&self, aligned: &AlignedSeries) -> SeriesComparison {
        let tolerance = self.config().series_tolerance;
        let mut stats = SeriesStats {
            total_intervals: aligned.len(),
            ..SeriesStats::default()
        };
        let mut discrepancies = Vec::new();

        for row in &aligned.rows {
            let value_match = numbers_match(row.reported_value, row.meter_value, tolerance);
            if value_match {
                stats.matches += 1;
            }
            if row.reported_value.is_none() {
                stats.missing_nem += 1;
            }
            if row.meter_value.is_none() {
                stats.missing_meter += 1;
            }

            let mapped_quality = row
                .meter_quality
                .as_deref()
                .map(|q| self.config().map_quality(q));
            if let Some(reason) = self.classify(row, value_match, mapped_quality.as_deref()) {
                discrepancies.push(IntervalDiscrepancy {
                    interval_ts: row.interval_start,
                    value_nem: row.reported_value,
                    quality_nem: row.reported_quality.clone(),
                    value_meter: row.meter_value,
                    quality_meter: row.meter_quality.clone(),
                    mapped_quality_meter: mapped_quality,
                    value_match,
                    reason,
                });
            }
        }

        stats.match_percentage = if stats.total_intervals > 0 {
            stats.matches as f64 / stats.total_intervals as f64 * 100.0
        } else {
            0.0
        };

        info!(
            "Series comparison: {} intervals, {} matches ({:.2}%), {} missing NEM, {} missing meter",
            stats.total_intervals,
            stats.matches,
            stats.match_percentage,
            stats.missing_nem,
            stats.missing_meter
        );

        SeriesComparison {
            stats,
            discrepancies,
        }
    }

    fn classify(
        &self,
        row: &AlignedRow,
        value_match: bool,
        mapped_quality: Option<&str>,
    ) -> Option<SeriesReason> {
        if row.reported_value.is_none() {
            return Some(SeriesReason::MissingNem);
        }
        if row.meter_value.is_none() {
            return Some(SeriesReason::MissingMeter);
        }
        if !value_match {
            return Some(SeriesReason::ValueMismatch);
        }
        match row.reported_quality.as_deref() {
            Some(reported) if mapped_quality != Some(reported) => Some(SeriesReason::QualityMismatch),
            _ => None,
        }
    }
}
