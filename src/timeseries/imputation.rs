/// LOCF (last observation carried forward) validation
///
/// Reported NEM12 intervals that were filled by carrying the previous reading
/// forward are checked against the usage recomputed from the meter register.
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::BTreeSet;
use tracing::{debug, info};

use crate::config::ValidationConfig;
use crate::timeseries::aligner::AlignedSeries;

#[derive(Debug, Clone)]
pub struct LocfOptions {
    /// Meter values are register totals rather than per-interval usage
    pub meter_is_cumulative: bool,
    /// Reported quality tokens that mark a substituted interval. When unset,
    /// a repeated reported value marks the substitution instead.
    pub locf_quality_values: Option<BTreeSet<String>>,
    pub tolerance: f64,
    /// Forward-fill gaps in the cumulative series before differencing
    pub apply_fill: bool,
}

impl LocfOptions {
    pub fn from_config(config: &ValidationConfig) -> Self {
        Self {
            meter_is_cumulative: true,
            locf_quality_values: None,
            tolerance: config.series_tolerance,
            apply_fill: false,
        }
    }

    pub fn with_locf_quality_values<I, S>(mut self, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.locf_quality_values = Some(values.into_iter().map(Into::into).collect());
        self
    }
}

impl Default for LocfOptions {
    fn default() -> Self {
        Self::from_config(&ValidationConfig::default())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LocfDetail {
    pub interval_start: DateTime<Utc>,
    pub nem_value: Option<f64>,
    pub quality_nem: Option<String>,
    pub meter_usage: Option<f64>,
    pub diff: Option<f64>,
    #[serde(rename = "match")]
    pub matched: bool,
    pub meter_substituted: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LocfValidation {
    pub count: usize,
    pub matches: usize,
    pub match_percentage: f64,
    #[serde(skip)]
    pub details: Vec<LocfDetail>,
}

/// Propagate the last present value through absent entries.
///
/// Returns the filled series and a mask of positions that were absent but
/// now hold a carried value. Leading absences stay absent.
pub fn forward_fill(values: &[Option<f64>]) -> (Vec<Option<f64>>, Vec<bool>) {
    let mut last = None;
    let mut filled = Vec::with_capacity(values.len());
    let mut substituted = Vec::with_capacity(values.len());
    for value in values {
        match value {
            Some(v) => {
                last = Some(*v);
                filled.push(Some(*v));
                substituted.push(false);
            }
            None => {
                filled.push(last);
                substituted.push(last.is_some());
            }
        }
    }
    (filled, substituted)
}

/// Difference each entry against the adjacent previous entry.
/// The first entry, and any entry next to an absent one, is absent.
pub fn difference(values: &[Option<f64>]) -> Vec<Option<f64>> {
    let mut usage = Vec::with_capacity(values.len());
    let mut previous: Option<f64> = None;
    for (i, current) in values.iter().enumerate() {
        let delta = match (i, previous, current) {
            (0, _, _) => None,
            (_, Some(prev), Some(cur)) => Some(cur - prev),
            _ => None,
        };
        usage.push(delta);
        previous = *current;
    }
    usage
}

pub struct ImputationValidator {
    options: LocfOptions,
}

impl ImputationValidator {
    pub fn new(options: LocfOptions) -> Self {
        Self { options }
    }

    pub fn validate(&self, aligned: &AlignedSeries) -> LocfValidation {
        let meter = aligned.meter_values();
        let reported = aligned.reported_values();

        let (usage, substituted) = match (self.options.meter_is_cumulative, self.options.apply_fill) {
            (true, true) => {
                let (filled, substituted) = forward_fill(&meter);
                debug!(
                    "Forward-filled {} absent cumulative readings",
                    substituted.iter().filter(|s| **s).count()
                );
                (difference(&filled), substituted)
            }
            (true, false) => (difference(&meter), vec![false; meter.len()]),
            (false, _) => (meter.clone(), vec![false; meter.len()]),
        };

        let mut details = Vec::new();
        for (i, row) in aligned.rows.iter().enumerate() {
            if !self.is_locf_candidate(aligned, &reported, i) {
                continue;
            }

            let diff = match (row.reported_value, usage[i]) {
                (Some(nem), Some(meter_usage)) => Some(nem - meter_usage),
                _ => None,
            };
            details.push(LocfDetail {
                interval_start: row.interval_start,
                nem_value: row.reported_value,
                quality_nem: row.reported_quality.clone(),
                meter_usage: usage[i],
                diff,
                matched: diff.is_some_and(|d| d.abs() <= self.options.tolerance),
                meter_substituted: substituted[i],
            });
        }

        let count = details.len();
        let matches = details.iter().filter(|d| d.matched).count();
        let match_percentage = if count > 0 {
            matches as f64 / count as f64 * 100.0
        } else {
            0.0
        };

        info!(
            "LOCF validation: {} candidates, {} matches ({:.2}%)",
            count, matches, match_percentage
        );

        LocfValidation {
            count,
            matches,
            match_percentage,
            details,
        }
    }

    fn is_locf_candidate(&self, aligned: &AlignedSeries, reported: &[Option<f64>], i: usize) -> bool {
        match &self.options.locf_quality_values {
            Some(markers) => aligned.rows[i]
                .reported_quality
                .as_ref()
                .is_some_and(|q| markers.contains(q)),
            None => match (i.checked_sub(1).and_then(|p| reported[p]), reported[i]) {
                (Some(previous), Some(current)) => previous == current,
                _ => false,
            },
        }
    }
}
