// ABOUTME: Data structures for job specs, durable job records, and status views
// ABOUTME: These are serialized to JSON for storage and queue hand-off

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Lifecycle state of a replication job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    Provisioning,
    Running,
    Completed,
    Failed,
}

impl JobStatus {
    /// Jobs in these states count against the concurrency ceiling.
    pub fn is_active(self) -> bool {
        matches!(self, JobStatus::Provisioning | JobStatus::Running)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            JobStatus::Provisioning => "provisioning",
            JobStatus::Running => "running",
            JobStatus::Completed => "completed",
            JobStatus::Failed => "failed",
        }
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Recognized job options. Unknown keys are rejected during validation,
/// so this is the complete set.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct JobOptions {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub drop_existing: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub enable_sync: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub estimated_size_bytes: Option<u64>,
}

/// A job specification that has passed validation. Produced only by
/// `validate::spec::validate_job_spec`; the command is normalized
/// (trimmed, lowercased) and both URLs have passed the safety checks.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobSpec {
    pub schema_version: String,
    pub command: String,
    pub source_url: String,
    pub target_url: String,
    pub options: JobOptions,
    pub filter: serde_json::Value,
}

/// Durable job record as persisted in the job store. Connection URLs are
/// stored encrypted only; plaintext credentials never reach the store.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Job {
    pub job_id: String,
    pub trace_id: String,
    pub schema_version: String,
    pub status: JobStatus,
    pub command: String,
    pub source_url_encrypted: String,
    pub target_url_encrypted: String,
    pub filter: serde_json::Value,
    pub options: JobOptions,
    pub created_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub started_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub progress: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub log_group: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub log_stream: Option<String>,
    /// Epoch seconds after which the store may expire the record.
    pub ttl: i64,
}

/// Message sent to the provisioning queue. Carries only identifiers and
/// options; the worker fetches and decrypts credentials out-of-band.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HandoffMessage {
    pub job_id: String,
    pub trace_id: String,
    pub options: JobOptions,
}

/// Response body for an accepted submission.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubmissionReceipt {
    pub job_id: String,
    pub trace_id: String,
    pub status: JobStatus,
}

/// External-facing projection of a job record. Never includes the
/// encrypted credential fields.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusView {
    pub job_id: String,
    pub trace_id: String,
    pub status: JobStatus,
    pub created_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub started_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub progress: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub log_url: Option<String>,
}
