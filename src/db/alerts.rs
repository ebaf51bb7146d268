use chrono::Utc;
use sqlx::{Row, SqlitePool};

use crate::models::cart::Alert;

/// Log an alert raised by a job that landed at warning or danger.
pub async fn add(
    pool: &SqlitePool,
    record_id: Option<i64>,
    alert_level: &str,
    alert_type: &str,
    message: &str,
) -> Result<i64, sqlx::Error> {
    let result = sqlx::query(
        r#"
        INSERT INTO alert_log (record_id, alert_level, alert_type, message, handled, created_at)
        VALUES (?, ?, ?, ?, 0, ?)
        "#,
    )
    .bind(record_id)
    .bind(alert_level)
    .bind(alert_type)
    .bind(message)
    .bind(Utc::now())
    .execute(pool)
    .await?;

    let alert_id = result.last_insert_rowid();
    tracing::info!(alert_id, alert_level, alert_type, "Alert logged");
    Ok(alert_id)
}

/// Unhandled alerts, newest first.
pub async fn unhandled(pool: &SqlitePool, limit: i64) -> Result<Vec<Alert>, sqlx::Error> {
    let rows = sqlx::query(
        r#"
        SELECT id, record_id, alert_level, alert_type, message, handled, created_at
        FROM alert_log
        WHERE handled = 0
        ORDER BY created_at DESC, id DESC
        LIMIT ?
        "#,
    )
    .bind(limit)
    .fetch_all(pool)
    .await?;

    rows.into_iter()
        .map(|row| {
            Ok(Alert {
                id: row.try_get("id")?,
                record_id: row.try_get("record_id")?,
                alert_level: row.try_get("alert_level")?,
                alert_type: row.try_get("alert_type")?,
                message: row.try_get("message")?,
                handled: row.try_get("handled")?,
                created_at: row.try_get("created_at")?,
            })
        })
        .collect()
}

/// Mark an alert handled. Returns false when it does not exist.
pub async fn mark_handled(pool: &SqlitePool, alert_id: i64) -> Result<bool, sqlx::Error> {
    let result = sqlx::query("UPDATE alert_log SET handled = 1 WHERE id = ?")
        .bind(alert_id)
        .execute(pool)
        .await?;

    Ok(result.rows_affected() > 0)
}
