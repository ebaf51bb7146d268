use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions};
use sqlx::SqlitePool;
use std::str::FromStr;
use std::time::Duration;

use crate::models::job::JobType;

/// Initialize the SQLite connection pool.
///
/// WAL mode plus a busy timeout so the dispatcher and the worker pool can
/// write concurrently; the storage engine serializes the writes.
pub async fn init_pool(database_url: &str) -> Result<SqlitePool, sqlx::Error> {
    let options = SqliteConnectOptions::from_str(database_url)?
        .create_if_missing(true)
        .journal_mode(SqliteJournalMode::Wal)
        .busy_timeout(Duration::from_secs(5));

    SqlitePoolOptions::new()
        .max_connections(10)
        .acquire_timeout(Duration::from_secs(10))
        .connect_with(options)
        .await
}

/// Run database migrations
pub async fn run_migrations(pool: &SqlitePool) -> Result<(), sqlx::Error> {
    sqlx::migrate!("./migrations")
        .run(pool)
        .await
        .map_err(|e| sqlx::Error::Migrate(Box::new(e)))
}

/// Decode a stored job-type code, surfacing corruption as a column error.
pub(crate) fn decode_job_type(code: i64) -> Result<JobType, sqlx::Error> {
    JobType::try_from(code).map_err(|e| sqlx::Error::ColumnDecode {
        index: "job_type".into(),
        source: e.into(),
    })
}

pub mod alerts;
pub mod cart;
pub mod queue;
pub mod records;
