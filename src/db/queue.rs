use chrono::Utc;
use sqlx::{Row, SqlitePool};
use std::str::FromStr;
use uuid::Uuid;

use crate::models::job::{JobType, Priority};
use crate::models::queue::QueueEntry;

use super::decode_job_type;

/// Insert a job into the pending queue. Generates a task id when the caller
/// does not provide one.
pub async fn enqueue(
    pool: &SqlitePool,
    station_id: i64,
    job_type: JobType,
    params: Option<&serde_json::Value>,
    priority: Priority,
    task_id: Option<String>,
) -> Result<String, sqlx::Error> {
    let task_id = task_id.unwrap_or_else(|| Uuid::new_v4().to_string());

    sqlx::query(
        r#"
        INSERT INTO task_queue (task_id, station_id, job_type, priority, params, created_at)
        VALUES (?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(&task_id)
    .bind(station_id)
    .bind(job_type.code())
    .bind(priority.as_str())
    .bind(params)
    .bind(Utc::now())
    .execute(pool)
    .await?;

    tracing::info!(task_id = %task_id, station_id, job_type = %job_type, "Task queued");
    Ok(task_id)
}

/// Pending jobs ordered by priority tier (high, medium, low), FIFO within
/// a tier.
pub async fn list_pending(pool: &SqlitePool, limit: i64) -> Result<Vec<QueueEntry>, sqlx::Error> {
    let rows = sqlx::query(
        r#"
        SELECT task_id, station_id, job_type, priority, params, created_at
        FROM task_queue
        ORDER BY CASE priority WHEN 'high' THEN 0 WHEN 'medium' THEN 1 ELSE 2 END,
                 created_at ASC, id ASC
        LIMIT ?
        "#,
    )
    .bind(limit)
    .fetch_all(pool)
    .await?;

    rows.into_iter()
        .map(|row| {
            Ok(QueueEntry {
                task_id: row.try_get("task_id")?,
                station_id: row.try_get("station_id")?,
                job_type: decode_job_type(row.try_get("job_type")?)?,
                priority: Priority::from_str(row.try_get::<&str, _>("priority")?)
                    .unwrap_or_default(),
                params: row
                    .try_get::<Option<serde_json::Value>, _>("params")?
                    .unwrap_or_else(|| serde_json::json!({})),
                created_at: row.try_get("created_at")?,
            })
        })
        .collect()
}

/// Delete a queue entry. Idempotent: returns false when no entry existed.
pub async fn remove(pool: &SqlitePool, task_id: &str) -> Result<bool, sqlx::Error> {
    let result = sqlx::query("DELETE FROM task_queue WHERE task_id = ?")
        .bind(task_id)
        .execute(pool)
        .await?;

    let removed = result.rows_affected() > 0;
    if removed {
        tracing::info!(task_id = %task_id, "Task removed from queue");
    }
    Ok(removed)
}

/// Purge entries older than the given number of days. Returns how many
/// were deleted.
pub async fn purge_stale(pool: &SqlitePool, days: i64) -> Result<u64, sqlx::Error> {
    let cutoff = Utc::now() - chrono::Duration::days(days);

    let result = sqlx::query("DELETE FROM task_queue WHERE created_at < ?")
        .bind(cutoff)
        .execute(pool)
        .await?;

    let count = result.rows_affected();
    if count > 0 {
        tracing::info!(count, days, "Purged stale queue entries");
    }
    Ok(count)
}
