use garde::Validate;
use serde::{Deserialize, Serialize};

use super::job::Priority;

/// Body of `POST /api/process` — one inspection job from the field device.
///
/// `params` accepts either a JSON object or (as the original device
/// firmware sends it) a JSON-encoded string.
#[derive(Debug, Deserialize, Validate)]
pub struct ProcessRequest {
    #[garde(length(min = 1))]
    pub image_base64: String,

    #[garde(skip)]
    pub task_type: i64,

    #[garde(range(min = 1))]
    pub station_id: i64,

    #[garde(skip)]
    pub params: Option<serde_json::Value>,

    #[garde(length(min = 1, max = 100))]
    pub task_id: Option<String>,
}

/// Response data after a job is accepted for asynchronous processing.
#[derive(Debug, Serialize, Deserialize)]
pub struct ProcessAccepted {
    pub task_id: String,
    pub record_id: i64,
    pub status: String,
}

/// Body of `POST /api/tasks/add`.
#[derive(Debug, Deserialize, Validate)]
pub struct AddTaskRequest {
    #[garde(range(min = 1))]
    pub station_id: i64,

    #[garde(skip)]
    pub task_type: i64,

    #[garde(skip)]
    pub params: Option<serde_json::Value>,

    #[garde(skip)]
    pub priority: Option<Priority>,
}

/// Body of `POST /api/cart/status`, sent by the cart itself.
#[derive(Debug, Deserialize, Validate)]
pub struct CartStatusUpdate {
    #[garde(skip)]
    pub online: Option<bool>,

    #[garde(skip)]
    pub current_station: Option<i64>,

    #[garde(length(min = 1, max = 50))]
    pub mode: Option<String>,

    #[garde(range(min = 0, max = 100))]
    pub battery_level: Option<i64>,

    #[garde(skip)]
    pub last_activity: Option<String>,
}

/// Query string of `GET /api/history`.
#[derive(Debug, Deserialize)]
pub struct HistoryQuery {
    pub task_type: Option<i64>,
    pub station_id: Option<i64>,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
    #[serde(default = "default_limit")]
    pub limit: i64,
    #[serde(default)]
    pub offset: i64,
}

fn default_limit() -> i64 {
    50
}

/// Query string of `GET /api/history/latest`.
#[derive(Debug, Deserialize)]
pub struct LatestQuery {
    pub station_id: i64,
    pub task_type: Option<i64>,
}

/// Query string of `GET /api/statistics`.
#[derive(Debug, Deserialize)]
pub struct StatisticsQuery {
    pub task_type: Option<i64>,
    #[serde(default = "default_days")]
    pub days: i64,
}

/// Query string of `POST /api/tasks/clear`.
#[derive(Debug, Deserialize)]
pub struct ClearTasksRequest {
    #[serde(default = "default_days")]
    pub days: i64,
}

fn default_days() -> i64 {
    1
}
