use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use std::collections::BTreeMap;
use thiserror::Error;
use tracing::debug;

#[derive(Error, Debug, PartialEq)]
pub enum AlignError {
    #[error("Interval length must be a positive number of minutes, got {0}")]
    InvalidInterval(u32),
}

/// One observation from an external time-series source
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SeriesPoint {
    pub ts: DateTime<Utc>,
    pub value: Option<f64>,
    pub quality: Option<String>,
}

impl SeriesPoint {
    pub fn new(ts: DateTime<Utc>, value: Option<f64>) -> Self {
        Self {
            ts,
            value,
            quality: None,
        }
    }

    pub fn with_quality(mut self, quality: impl Into<String>) -> Self {
        self.quality = Some(quality.into());
        self
    }
}

/// Both sources at one interval boundary. Either side may be absent.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AlignedRow {
    pub interval_start: DateTime<Utc>,
    pub reported_value: Option<f64>,
    pub reported_quality: Option<String>,
    pub meter_value: Option<f64>,
    pub meter_quality: Option<String>,
}

/// Reported (NEM12) and meter series on one contiguous timeline
#[derive(Debug, Clone, PartialEq)]
pub struct AlignedSeries {
    pub interval_minutes: u32,
    pub rows: Vec<AlignedRow>,
}

impl AlignedSeries {
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn meter_values(&self) -> Vec<Option<f64>> {
        self.rows.iter().map(|r| r.meter_value).collect()
    }

    pub fn reported_values(&self) -> Vec<Option<f64>> {
        self.rows.iter().map(|r| r.reported_value).collect()
    }
}

#[derive(Debug, Clone, Copy)]
pub struct TimeSeriesAligner {
    interval_minutes: u32,
}

impl TimeSeriesAligner {
    pub fn new(interval_minutes: u32) -> Result<Self, AlignError> {
        if interval_minutes == 0 {
            return Err(AlignError::InvalidInterval(interval_minutes));
        }
        Ok(Self { interval_minutes })
    }

    pub fn interval_minutes(&self) -> u32 {
        self.interval_minutes
    }

    fn step(&self) -> Duration {
        Duration::minutes(i64::from(self.interval_minutes))
    }

    /// Floor a timestamp to the start of its interval, counted from the epoch
    pub fn floor(&self, ts: DateTime<Utc>) -> DateTime<Utc> {
        let interval_secs = i64::from(self.interval_minutes) * 60;
        let excess = ts.timestamp().rem_euclid(interval_secs);
        ts - Duration::seconds(excess) - Duration::nanoseconds(i64::from(ts.timestamp_subsec_nanos()))
    }

    /// Reindex both series onto the union timeline between the earliest and
    /// latest floored timestamps, inclusive.
    ///
    /// Boundaries a source has no point for are absent, never zero. When
    /// several points of one source floor to the same boundary the first one
    /// wins.
    pub fn align(&self, reported: &[SeriesPoint], meter: &[SeriesPoint]) -> AlignedSeries {
        let reported_by_interval = self.index_by_interval(reported, "reported");
        let meter_by_interval = self.index_by_interval(meter, "meter");

        let bounds = [
            reported_by_interval.keys().next(),
            reported_by_interval.keys().next_back(),
            meter_by_interval.keys().next(),
            meter_by_interval.keys().next_back(),
        ];
        let start = bounds.iter().flatten().min().copied();
        let end = bounds.iter().flatten().max().copied();

        let (Some(start), Some(end)) = (start, end) else {
            return AlignedSeries {
                interval_minutes: self.interval_minutes,
                rows: Vec::new(),
            };
        };

        let mut rows = Vec::new();
        let mut cursor = *start;
        while cursor <= *end {
            let reported_point = reported_by_interval.get(&cursor);
            let meter_point = meter_by_interval.get(&cursor);
            rows.push(AlignedRow {
                interval_start: cursor,
                reported_value: reported_point.and_then(|p| p.value),
                reported_quality: reported_point.and_then(|p| p.quality.clone()),
                meter_value: meter_point.and_then(|p| p.value),
                meter_quality: meter_point.and_then(|p| p.quality.clone()),
            });
            cursor += self.step();
        }

        debug!(
            "Aligned {} reported and {} meter points onto {} intervals ({} to {})",
            reported.len(),
            meter.len(),
            rows.len(),
            start,
            end
        );

        AlignedSeries {
            interval_minutes: self.interval_minutes,
            rows,
        }
    }

    fn index_by_interval<'p>(
        &self,
        points: &'p [SeriesPoint],
        side: &str,
    ) -> BTreeMap<DateTime<Utc>, &'p SeriesPoint> {
        let mut indexed = BTreeMap::new();
        let mut collapsed = 0;
        for point in points {
            let boundary = self.floor(point.ts);
            if indexed.contains_key(&boundary) {
                collapsed += 1;
            } else {
                indexed.insert(boundary, point);
            }
        }
        if collapsed > 0 {
            debug!(
                "{} {} points shared an interval with an earlier point and were dropped",
                collapsed, side
            );
        }
        indexed
    }
}
