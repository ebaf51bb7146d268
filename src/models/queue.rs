use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::job::{JobType, Priority};

/// A job accepted into the pending queue but not yet dispatched.
///
/// Dispatch is modeled as deletion: once a worker owns the job it is
/// represented by a result record instead.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueueEntry {
    pub task_id: String,
    pub station_id: i64,
    #[serde(rename = "task_type")]
    pub job_type: JobType,
    pub priority: Priority,
    pub params: serde_json::Value,
    pub created_at: DateTime<Utc>,
}
