use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::Display;
use uuid::Uuid;

/// Status of a pipeline job in the remote queue.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Display, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    #[strum(to_string = "Queued")]
    Queued,
    #[strum(to_string = "In Progress")]
    Started,
    #[strum(to_string = "Failed")]
    Failed,
    #[strum(to_string = "Completed")]
    Finished,
    /// Any queue state the client does not track (deferred, canceled, ...).
    #[serde(other)]
    #[strum(to_string = "Unknown")]
    Unknown,
}

/// Result a job reports once it has run.
///
/// Equality is structural; the convergence detector relies on it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobResult {
    pub success: bool,
    pub message: Option<String>,
    pub next_job_id: Option<Uuid>,
}

/// Response of `GET <prefix>/job/{id}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobResponse {
    pub id: String,
    pub status: JobStatus,
    pub queue: String,
    #[serde(rename = "enqeued_at", alias = "enqueued_at")]
    pub enqueued_at: Option<String>,
    pub ended_at: Option<String>,
    pub result: Option<JobResult>,
}

impl JobResponse {
    pub fn is_finished(&self) -> bool {
        self.status == JobStatus::Finished
    }

    pub fn enqueued_time(&self) -> Option<DateTime<Utc>> {
        self.enqueued_at.as_deref().and_then(parse_unix_millis)
    }

    pub fn ended_time(&self) -> Option<DateTime<Utc>> {
        self.ended_at.as_deref().and_then(parse_unix_millis)
    }
}

/// Decode a unix-ms timestamp sent as a decimal string.
pub fn parse_unix_millis(raw: &str) -> Option<DateTime<Utc>> {
    raw.trim()
        .parse::<i64>()
        .ok()
        .and_then(DateTime::from_timestamp_millis)
}
