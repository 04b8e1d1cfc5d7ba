use chrono::{DateTime, Utc};
use futures::TryStreamExt;
use sqlx::PgPool;
use tracing::{debug, info, instrument};

use crate::db::{DbError, MeterReadingRow, FETCH_LOG_BATCH};
use crate::timeseries::SeriesPoint;

#[derive(Clone)]
pub struct MeterReadingRepository {
    pool: PgPool,
}

impl MeterReadingRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Meter readings for one meter in `[start, end)`, ordered by timestamp
    #[instrument(skip(self))]
    pub async fn find_series(
        &self,
        meter_id: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<SeriesPoint>, DbError> {
        debug!("Querying meter readings from {} to {}", start, end);

        let mut rows = sqlx::query_as::<_, MeterReadingRow>(
            r#"
            SELECT timestamp AT TIME ZONE 'UTC' AS ts,
                   value::float8 AS value,
                   quality_flag::text AS quality_flag
            FROM meter_readings
            WHERE meter_id::text = $1 AND timestamp >= $2 AND timestamp < $3
            ORDER BY ts
            "#,
        )
        .bind(meter_id)
        .bind(start)
        .bind(end)
        .fetch(&self.pool);

        let mut points = Vec::new();
        while let Some(row) = rows.try_next().await? {
            points.push(SeriesPoint::from(row));
            if points.len() % FETCH_LOG_BATCH == 0 {
                debug!("Fetched {} meter readings so far", points.len());
            }
        }

        info!("Fetched {} meter readings for meter {}", points.len(), meter_id);
        Ok(points)
    }
}
