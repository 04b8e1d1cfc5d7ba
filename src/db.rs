use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use tracing::info;

pub mod error;
pub mod meter_reading_repository;
pub mod models;
pub mod report_interval_repository;

pub use error::DbError;
pub use meter_reading_repository::MeterReadingRepository;
pub use models::*;
pub use report_interval_repository::ReportIntervalRepository;

/// Progress is logged every this many fetched rows
pub const FETCH_LOG_BATCH: usize = 5000;

/// Open a small pool for one of the two source databases
pub async fn connect(database: &'static str, url: &str) -> Result<PgPool, DbError> {
    info!("Connecting to {} database...", database);
    let pool = PgPoolOptions::new()
        .max_connections(2)
        .connect(url)
        .await
        .map_err(|source| DbError::Connect { database, source })?;
    info!("{} database connection established", database);
    Ok(pool)
}
