// ABOUTME: Job admission and orchestration pipeline for Seren replication workers
// ABOUTME: Validates, admits, encrypts, persists, and hands off replication jobs

pub mod config;
pub mod error;
pub mod external;
pub mod handler;
pub mod model;
pub mod orchestrator;
pub mod redact;
pub mod retry;
pub mod sizing;
pub mod status;
pub mod validate;

#[cfg(test)]
mod testing;

pub use config::Config;
pub use error::OrchestratorError;
pub use handler::{ApiHandler, ApiRequest, ApiResponse};
pub use model::{
    HandoffMessage, Job, JobOptions, JobSpec, JobStatus, StatusView, SubmissionReceipt,
};
pub use orchestrator::Orchestrator;
pub use redact::redact_url;
pub use status::StatusReporter;
