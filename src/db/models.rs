use chrono::{DateTime, NaiveDateTime, Utc};
use sqlx::FromRow;

use crate::timeseries::SeriesPoint;

// Database row models. Timestamps are selected `AT TIME ZONE 'UTC'`, so they
// arrive as naive UTC values.

#[derive(Debug, Clone, FromRow)]
pub struct MeterReadingRow {
    pub ts: NaiveDateTime,
    pub value: Option<f64>,
    pub quality_flag: Option<String>,
}

#[derive(Debug, Clone, FromRow)]
pub struct ReportIntervalRow {
    pub ts: NaiveDateTime,
    pub value: Option<f64>,
    pub quality_method: Option<String>,
}

impl From<MeterReadingRow> for SeriesPoint {
    fn from(row: MeterReadingRow) -> Self {
        SeriesPoint {
            ts: DateTime::<Utc>::from_naive_utc_and_offset(row.ts, Utc),
            value: row.value,
            quality: row.quality_flag,
        }
    }
}

impl From<ReportIntervalRow> for SeriesPoint {
    fn from(row: ReportIntervalRow) -> Self {
        SeriesPoint {
            ts: DateTime::<Utc>::from_naive_utc_and_offset(row.ts, Utc),
            value: row.value,
            quality: row.quality_method,
        }
    }
}
