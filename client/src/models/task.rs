//! Provisioning task models

use chrono::{DateTime, NaiveDateTime, Utc};
use openapi_client::Task;
use serde::{Deserialize, Serialize};

/// Kind of provisioning attempt
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskKind {
    Deploy,
    Destroy,
    Update,
    Other(String),
}

impl TaskKind {
    pub fn parse(raw: &str) -> Self {
        match raw.trim().to_lowercase().as_str() {
            "deploy" => TaskKind::Deploy,
            "destroy" => TaskKind::Destroy,
            "update" => TaskKind::Update,
            other => TaskKind::Other(other.to_string()),
        }
    }
}

/// Task status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskStatus {
    Pending,
    Running,
    Success,
    Failed,
    Unknown,
}

impl TaskStatus {
    pub fn parse(raw: &str) -> Self {
        match raw.trim().to_lowercase().as_str() {
            "pending" | "queued" => TaskStatus::Pending,
            "running" | "in_progress" => TaskStatus::Running,
            "success" | "succeeded" | "completed" => TaskStatus::Success,
            "failed" | "error" => TaskStatus::Failed,
            _ => TaskStatus::Unknown,
        }
    }

    /// Whether the task can still change
    pub fn is_terminal(&self) -> bool {
        matches!(self, TaskStatus::Success | TaskStatus::Failed)
    }
}

/// One provisioning attempt for a deployment
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskRecord {
    pub task_id: String,
    pub deployment_id: String,
    pub kind: TaskKind,
    pub status: TaskStatus,
    pub started_at: Option<DateTime<Utc>>,
    pub finished_at: Option<DateTime<Utc>>,
    pub created_at: Option<DateTime<Utc>>,
    /// Structured log/output blob, passed through untouched
    pub logs: serde_json::Value,
}

impl TaskRecord {
    /// Convert a wire task; `deployment_id` fills in when the backend omits it
    pub fn from_wire(task: Task, deployment_id: &str) -> Self {
        Self {
            task_id: task.task_id,
            deployment_id: task
                .deployment_id
                .unwrap_or_else(|| deployment_id.to_string()),
            kind: TaskKind::parse(&task.task_type),
            status: TaskStatus::parse(&task.status),
            started_at: task.started_at.as_deref().and_then(parse_timestamp),
            finished_at: task.finished_at.as_deref().and_then(parse_timestamp),
            created_at: task.created_at.as_deref().and_then(parse_timestamp),
            logs: task.logs.unwrap_or(serde_json::Value::Null),
        }
    }

    /// Timestamp used to order attempts: creation time, else start time
    pub fn ordering_time(&self) -> Option<DateTime<Utc>> {
        self.created_at.or(self.started_at)
    }
}

/// Parse an RFC 3339 timestamp, or a naive ISO timestamp taken as UTC
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Some(ts.with_timezone(&Utc));
    }
    ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"]
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
        .map(|naive| naive.and_utc())
}
