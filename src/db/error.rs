#[derive(Debug, thiserror::Error)]
pub enum DbError {
    #[error("Failed to connect to {database} database: {source}")]
    Connect {
        database: &'static str,
        #[source]
        source: sqlx::Error,
    },
    #[error("Database error: {0}")]
    SqlxError(#[from] sqlx::Error),
}
