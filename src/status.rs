// ABOUTME: Read-only projection of job records into external-facing status views
// ABOUTME: Builds the log viewer URL, never exposes encrypted credentials

use std::sync::Arc;

use tracing::error;

use crate::error::OrchestratorError;
use crate::external::JobStore;
use crate::model::{Job, StatusView};

pub struct StatusReporter {
    store: Arc<dyn JobStore>,
    region: String,
}

impl StatusReporter {
    pub fn new(store: Arc<dyn JobStore>, region: impl Into<String>) -> Self {
        Self {
            store,
            region: region.into(),
        }
    }

    /// Looks up a job and projects it for the caller. `Ok(None)` means
    /// the job id is unknown; store failures map to a dependency error
    /// with a generic caller-facing message.
    pub async fn job_status(&self, job_id: &str) -> Result<Option<StatusView>, OrchestratorError> {
        let job = self.store.get_job(job_id).await.map_err(|err| {
            error!(%job_id, error = %format!("{:#}", err), "failed to read job record");
            OrchestratorError::Dependency("Database error".to_string())
        })?;
        Ok(job.map(|job| self.project(job)))
    }

    fn project(&self, job: Job) -> StatusView {
        let log_url = match (&job.log_group, &job.log_stream) {
            (Some(group), Some(stream)) => Some(build_log_url(&self.region, group, stream)),
            _ => None,
        };
        StatusView {
            job_id: job.job_id,
            trace_id: job.trace_id,
            status: job.status,
            created_at: job.created_at,
            started_at: job.started_at,
            completed_at: job.completed_at,
            error: job.error,
            progress: job.progress,
            log_url,
        }
    }
}

/// Console deep link to a worker's log stream.
fn build_log_url(region: &str, log_group: &str, log_stream: &str) -> String {
    format!(
        "https://console.aws.amazon.com/cloudwatch/home?region={}#logsV2:log-groups/log-group/{}/log-events/{}",
        region,
        percent_encode(log_group),
        percent_encode(log_stream)
    )
}

/// Percent-encodes everything outside the URI unreserved set.
fn percent_encode(component: &str) -> String {
    let mut encoded = String::with_capacity(component.len());
    for byte in component.bytes() {
        match byte {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.' | b'~' => {
                encoded.push(byte as char)
            }
            _ => encoded.push_str(&format!("%{:02X}", byte)),
        }
    }
    encoded
}
