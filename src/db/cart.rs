use chrono::Utc;
use sqlx::{Row, SqlitePool};

use crate::models::cart::CartStatus;

/// Insert a new cart status snapshot. Snapshots are versioned; readers
/// only ever see the latest row.
pub async fn update_status(
    pool: &SqlitePool,
    online: bool,
    current_station: Option<i64>,
    mode: &str,
    battery_level: Option<i64>,
    last_activity: Option<&str>,
) -> Result<i64, sqlx::Error> {
    let result = sqlx::query(
        r#"
        INSERT INTO cart_status (online, current_station, mode, battery_level, last_activity, updated_at)
        VALUES (?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(online)
    .bind(current_station)
    .bind(mode)
    .bind(battery_level)
    .bind(last_activity)
    .bind(Utc::now())
    .execute(pool)
    .await?;

    Ok(result.last_insert_rowid())
}

/// Latest cart status snapshot, if the cart has ever checked in.
pub async fn latest(pool: &SqlitePool) -> Result<Option<CartStatus>, sqlx::Error> {
    let row = sqlx::query(
        r#"
        SELECT online, current_station, mode, battery_level, last_activity, updated_at
        FROM cart_status
        ORDER BY updated_at DESC, id DESC
        LIMIT 1
        "#,
    )
    .fetch_optional(pool)
    .await?;

    row.map(|row| {
        Ok(CartStatus {
            online: row.try_get("online")?,
            current_station: row.try_get("current_station")?,
            mode: row.try_get("mode")?,
            battery_level: row.try_get("battery_level")?,
            last_activity: row.try_get("last_activity")?,
            updated_at: row.try_get("updated_at")?,
        })
    })
    .transpose()
}
