use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, EnumString};

/// Inspection job types dispatched by the field device.
///
/// A closed set resolved at compile time; the wire format and the database
/// both use the numeric codes 1-4.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString, EnumIter,
)]
#[serde(try_from = "i64", into = "i64")]
#[strum(serialize_all = "snake_case")]
pub enum JobType {
    PointerReading,
    Temperature,
    SmokeA,
    SmokeB,
}

impl JobType {
    pub const fn code(self) -> i64 {
        match self {
            JobType::PointerReading => 1,
            JobType::Temperature => 2,
            JobType::SmokeA => 3,
            JobType::SmokeB => 4,
        }
    }

    pub fn description(self) -> &'static str {
        match self {
            JobType::PointerReading => "Analog gauge reading",
            JobType::Temperature => "High-temperature object detection",
            JobType::SmokeA => "Smoke detection (zone A)",
            JobType::SmokeB => "Smoke detection (zone B)",
        }
    }
}

impl TryFrom<i64> for JobType {
    type Error = String;

    fn try_from(code: i64) -> Result<Self, Self::Error> {
        match code {
            1 => Ok(JobType::PointerReading),
            2 => Ok(JobType::Temperature),
            3 => Ok(JobType::SmokeA),
            4 => Ok(JobType::SmokeB),
            other => Err(format!("unsupported job type: {other}")),
        }
    }
}

impl From<JobType> for i64 {
    fn from(job_type: JobType) -> i64 {
        job_type.code()
    }
}

/// Lifecycle status of a result record.
///
/// A record is created as `Processing` and transitions at most once to one
/// of the terminal values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum JobStatus {
    Processing,
    Normal,
    Warning,
    Danger,
    Failed,
}

impl JobStatus {
    pub fn is_terminal(self) -> bool {
        !matches!(self, JobStatus::Processing)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            JobStatus::Processing => "processing",
            JobStatus::Normal => "normal",
            JobStatus::Warning => "warning",
            JobStatus::Danger => "danger",
            JobStatus::Failed => "failed",
        }
    }

    /// Normalize a status label returned by the model.
    ///
    /// Gauge-reading answers carry the model's own qualitative judgement;
    /// anything unrecognized is treated as `Normal`.
    pub fn from_model_label(label: &str) -> JobStatus {
        match label.trim().to_ascii_lowercase().as_str() {
            "warning" => JobStatus::Warning,
            "danger" => JobStatus::Danger,
            _ => JobStatus::Normal,
        }
    }
}

/// Scheduling priority of a queued job. High drains before medium, medium
/// before low; FIFO within a tier.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString, Default,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum Priority {
    High,
    #[default]
    Medium,
    Low,
}

impl Priority {
    pub fn as_str(self) -> &'static str {
        match self {
            Priority::High => "high",
            Priority::Medium => "medium",
            Priority::Low => "low",
        }
    }
}
