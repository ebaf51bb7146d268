use chrono::Utc;
use sqlx::{QueryBuilder, Row, Sqlite, SqlitePool};
use std::str::FromStr;

use crate::models::job::{JobStatus, JobType};
use crate::models::record::{RecordUpdate, Statistics, TaskRecord};

use super::decode_job_type;

/// Create a result record in `processing` state. The record makes the job
/// durably visible before classification completes.
pub async fn create(
    pool: &SqlitePool,
    task_id: &str,
    job_type: JobType,
    station_id: i64,
) -> Result<i64, sqlx::Error> {
    let result = sqlx::query(
        r#"
        INSERT INTO task_records (task_id, job_type, station_id, status, created_at)
        VALUES (?, ?, ?, 'processing', ?)
        "#,
    )
    .bind(task_id)
    .bind(job_type.code())
    .bind(station_id)
    .bind(Utc::now())
    .execute(pool)
    .await?;

    let record_id = result.last_insert_rowid();
    tracing::info!(record_id, task_id = %task_id, job_type = %job_type, "Result record created");
    Ok(record_id)
}

/// Partial update of a result record; only provided fields are written.
///
/// Returns false when the record does not exist (or nothing was provided) —
/// callers treat that as a lost update, log, and continue.
pub async fn update(
    pool: &SqlitePool,
    record_id: i64,
    fields: &RecordUpdate,
) -> Result<bool, sqlx::Error> {
    let mut builder: QueryBuilder<Sqlite> = QueryBuilder::new("UPDATE task_records SET ");
    let mut separated = builder.separated(", ");
    let mut any = false;

    if let Some(result_data) = &fields.result_data {
        separated.push("result_data = ");
        separated.push_bind_unseparated(result_data);
        any = true;
    }
    if let Some(image_path) = &fields.image_path {
        separated.push("image_path = ");
        separated.push_bind_unseparated(image_path);
        any = true;
    }
    if let Some(status) = fields.status {
        separated.push("status = ");
        separated.push_bind_unseparated(status.as_str());
        any = true;
    }
    if let Some(confidence) = fields.confidence {
        separated.push("confidence = ");
        separated.push_bind_unseparated(confidence);
        any = true;
    }
    if let Some(processing_time) = fields.processing_time {
        separated.push("processing_time = ");
        separated.push_bind_unseparated(processing_time);
        any = true;
    }

    if !any {
        tracing::warn!(record_id, "Record update called with no fields");
        return Ok(false);
    }

    builder.push(" WHERE id = ");
    builder.push_bind(record_id);

    let result = builder.build().execute(pool).await?;
    Ok(result.rows_affected() > 0)
}

/// Get a record by id.
pub async fn get(pool: &SqlitePool, record_id: i64) -> Result<Option<TaskRecord>, sqlx::Error> {
    let row = sqlx::query("SELECT * FROM task_records WHERE id = ?")
        .bind(record_id)
        .fetch_optional(pool)
        .await?;

    row.map(record_from_row).transpose()
}

/// Query records with optional filters, most recent first.
pub async fn query(
    pool: &SqlitePool,
    job_type: Option<JobType>,
    station_id: Option<i64>,
    start_date: Option<&str>,
    end_date: Option<&str>,
    limit: i64,
    offset: i64,
) -> Result<Vec<TaskRecord>, sqlx::Error> {
    let mut builder: QueryBuilder<Sqlite> =
        QueryBuilder::new("SELECT * FROM task_records WHERE 1=1");

    if let Some(job_type) = job_type {
        builder.push(" AND job_type = ");
        builder.push_bind(job_type.code());
    }
    if let Some(station_id) = station_id {
        builder.push(" AND station_id = ");
        builder.push_bind(station_id);
    }
    if let Some(start) = start_date {
        builder.push(" AND created_at >= ");
        builder.push_bind(start.to_string());
    }
    if let Some(end) = end_date {
        builder.push(" AND created_at <= ");
        builder.push_bind(end.to_string());
    }

    builder.push(" ORDER BY created_at DESC, id DESC LIMIT ");
    builder.push_bind(limit);
    builder.push(" OFFSET ");
    builder.push_bind(offset);

    let rows = builder.build().fetch_all(pool).await?;
    rows.into_iter().map(record_from_row).collect()
}

/// Latest record for a station, optionally narrowed to one job type.
pub async fn latest_for(
    pool: &SqlitePool,
    station_id: i64,
    job_type: Option<JobType>,
) -> Result<Option<TaskRecord>, sqlx::Error> {
    let mut builder: QueryBuilder<Sqlite> =
        QueryBuilder::new("SELECT * FROM task_records WHERE station_id = ");
    builder.push_bind(station_id);

    if let Some(job_type) = job_type {
        builder.push(" AND job_type = ");
        builder.push_bind(job_type.code());
    }

    builder.push(" ORDER BY created_at DESC, id DESC LIMIT 1");

    let row = builder.build().fetch_optional(pool).await?;
    row.map(record_from_row).transpose()
}

/// Aggregate status counts and averages over a trailing window of days.
pub async fn statistics(
    pool: &SqlitePool,
    job_type: Option<JobType>,
    days: i64,
) -> Result<Statistics, sqlx::Error> {
    let cutoff = Utc::now() - chrono::Duration::days(days);

    let mut builder: QueryBuilder<Sqlite> = QueryBuilder::new(
        r#"
        SELECT
            COUNT(*) as total_count,
            COUNT(CASE WHEN status = 'normal' THEN 1 END) as normal_count,
            COUNT(CASE WHEN status = 'warning' THEN 1 END) as warning_count,
            COUNT(CASE WHEN status = 'danger' THEN 1 END) as danger_count,
            COUNT(CASE WHEN status = 'failed' THEN 1 END) as failed_count,
            AVG(confidence) as avg_confidence,
            AVG(processing_time) as avg_processing_time
        FROM task_records
        WHERE created_at >= "#,
    );
    builder.push_bind(cutoff);

    if let Some(job_type) = job_type {
        builder.push(" AND job_type = ");
        builder.push_bind(job_type.code());
    }

    let row = builder.build().fetch_one(pool).await?;

    Ok(Statistics {
        total_count: row.try_get("total_count")?,
        normal_count: row.try_get("normal_count")?,
        warning_count: row.try_get("warning_count")?,
        danger_count: row.try_get("danger_count")?,
        failed_count: row.try_get("failed_count")?,
        avg_confidence: row.try_get("avg_confidence")?,
        avg_processing_time: row.try_get("avg_processing_time")?,
    })
}

fn record_from_row(row: sqlx::sqlite::SqliteRow) -> Result<TaskRecord, sqlx::Error> {
    Ok(TaskRecord {
        id: row.try_get("id")?,
        task_id: row.try_get("task_id")?,
        job_type: decode_job_type(row.try_get("job_type")?)?,
        station_id: row.try_get("station_id")?,
        image_path: row.try_get("image_path")?,
        result_data: row.try_get("result_data")?,
        status: JobStatus::from_str(row.try_get::<&str, _>("status")?)
            .unwrap_or(JobStatus::Processing),
        confidence: row.try_get("confidence")?,
        processing_time: row.try_get("processing_time")?,
        created_at: row.try_get("created_at")?,
    })
}
