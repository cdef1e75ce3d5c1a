use serde::{Deserialize, Serialize};

/// Server-reported task status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TaskStatus {
    Queued,
    Running,
    Success,
    Error,
    Cancelled,
    #[serde(rename = "waiting-on-user-input")]
    WaitingOnUser,
    #[default]
    #[serde(other)]
    Unknown,
}

impl TaskStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskStatus::Queued => "queued",
            TaskStatus::Running => "running",
            TaskStatus::Success => "success",
            TaskStatus::Error => "error",
            TaskStatus::Cancelled => "cancelled",
            TaskStatus::WaitingOnUser => "waiting-on-user-input",
            TaskStatus::Unknown => "unknown",
        }
    }
}

/// Snapshot of a server-side asynchronous operation
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Task {
    #[serde(rename = "uuid")]
    pub id: String,
    pub operation: String,
    #[serde(rename = "operation_description")]
    pub description: String,
    #[serde(rename = "task_type")]
    pub kind: String,
    pub status: TaskStatus,
    pub progress: i32,
    pub active: bool,
    pub synced: bool,
    pub message: String,
    pub username: String,
    pub user_full_name: String,
    #[serde(rename = "entity_uuid")]
    pub entity_id: String,
    pub entity_name: String,
    #[serde(rename = "org_uuid")]
    pub org_id: String,
    pub company_id: String,
    pub location_id: String,
    pub start_time: i64,
    pub end_time: i64,
}

impl Task {
    /// The server has finished with this task. The status is deliberately not
    /// consulted: an `error` task is just as settled as a `success` one.
    pub fn is_terminal(&self) -> bool {
        !self.active && self.synced
    }

    pub fn succeeded(&self) -> bool {
        self.is_terminal() && self.status == TaskStatus::Success
    }
}
