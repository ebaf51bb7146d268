use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Latest known state of the inspection cart. Snapshots are versioned in
/// the store; readers only ever see the newest row.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CartStatus {
    pub online: bool,
    pub current_station: Option<i64>,
    pub mode: String,
    pub battery_level: Option<i64>,
    pub last_activity: Option<String>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl CartStatus {
    /// State reported before the cart has ever checked in.
    pub fn offline() -> Self {
        Self {
            online: false,
            current_station: None,
            mode: "idle".to_string(),
            battery_level: Some(0),
            last_activity: None,
            updated_at: None,
        }
    }
}

/// An alert raised when a job lands at warning or danger.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Alert {
    pub id: i64,
    pub record_id: Option<i64>,
    pub alert_level: String,
    pub alert_type: String,
    pub message: Option<String>,
    pub handled: bool,
    pub created_at: DateTime<Utc>,
}
