use chrono::{DateTime, Utc};
use futures::TryStreamExt;
use sqlx::PgPool;
use tracing::{debug, info, instrument};

use crate::db::{DbError, ReportIntervalRow, FETCH_LOG_BATCH};
use crate::timeseries::SeriesPoint;

/// Interval records of NEM12 reports loaded into the reporting database
#[derive(Clone)]
pub struct ReportIntervalRepository {
    pool: PgPool,
}

impl ReportIntervalRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Report intervals (record type 200 rows) in `[start, end)`, ordered by
    /// interval start
    #[instrument(skip(self))]
    pub async fn find_series(
        &self,
        report_id: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<SeriesPoint>, DbError> {
        debug!("Querying report intervals from {} to {}", start, end);

        let mut rows = sqlx::query_as::<_, ReportIntervalRow>(
            r#"
            SELECT interval_start AT TIME ZONE 'UTC' AS ts,
                   energy::float8 AS value,
                   quality_method::text AS quality_method
            FROM nem12_report
            WHERE report_id::text = $1
              AND record_type = 200
              AND interval_start >= $2 AND interval_start < $3
            ORDER BY ts
            "#,
        )
        .bind(report_id)
        .bind(start)
        .bind(end)
        .fetch(&self.pool);

        let mut points = Vec::new();
        while let Some(row) = rows.try_next().await? {
            points.push(SeriesPoint::from(row));
            if points.len() % FETCH_LOG_BATCH == 0 {
                debug!("Fetched {} report intervals so far", points.len());
            }
        }

        info!("Fetched {} report intervals for report {}", points.len(), report_id);
        Ok(points)
    }
}
