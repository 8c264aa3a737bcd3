use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum_macros::Display;
use uuid::Uuid;

/// The kind of work a [`Job`] carries out; informs how items are routed to a
/// processor but does not change queue/worker mechanics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum JobType {
    Media,
    Json,
    Batch,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum JobStatus {
    Queued,
    Processing,
    Completed,
    Failed,
    Cancelled,
}

impl JobStatus {
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            JobStatus::Completed | JobStatus::Failed | JobStatus::Cancelled
        )
    }
}

/// One unit of work within a [`Job`]. `input` is an opaque descriptor the
/// pluggable processor knows how to interpret; `result`/`error` are mutually
/// exclusive and populated once the item has been attempted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobItem {
    pub input: serde_json::Value,
    #[serde(default)]
    pub result: Option<serde_json::Value>,
    #[serde(default)]
    pub error: Option<String>,
}

impl JobItem {
    pub fn new(input: serde_json::Value) -> Self {
        Self {
            input,
            result: None,
            error: None,
        }
    }

    pub fn is_attempted(&self) -> bool {
        self.result.is_some() || self.error.is_some()
    }
}

/// Final accounting for a terminal job (spec §4.8).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobResult {
    pub succeeded: u64,
    pub failed: u64,
    pub duration_ms: u64,
    pub message: String,
}

/// An async unit of work (spec §3, §4.8).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Job {
    pub id: Uuid,
    #[serde(rename = "type")]
    pub job_type: JobType,
    pub status: JobStatus,
    pub items: Vec<JobItem>,
    pub progress: u64,
    pub total: u64,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub started_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub completed_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub retry_count: u32,
    #[serde(default)]
    pub result: Option<JobResult>,
}

impl Job {
    pub fn new(job_type: JobType, items: Vec<JobItem>) -> Self {
        let total = items.len() as u64;
        Self {
            id: Uuid::new_v4(),
            job_type,
            status: JobStatus::Queued,
            items,
            progress: 0,
            total,
            created_at: Utc::now(),
            started_at: None,
            completed_at: None,
            retry_count: 0,
            result: None,
        }
    }
}
