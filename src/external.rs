// ABOUTME: Trait seams for the external collaborators of the pipeline
// ABOUTME: Store, queue, cipher, secret store, metrics sink, compute API

use std::fmt;

use anyhow::Result;
use async_trait::async_trait;

use crate::model::{HandoffMessage, Job, JobStatus};
use crate::retry::Transience;
use crate::sizing::MachineClass;

/// Failure from the compute provisioning API, tagged so the retrier can
/// tell transient capacity problems from requests that will never succeed.
#[derive(Debug)]
pub enum ProvisionError {
    InsufficientCapacity(String),
    Throttled(String),
    ServiceUnavailable(String),
    Internal(String),
    InvalidRequest(String),
    Other(String),
}

impl ProvisionError {
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            ProvisionError::InsufficientCapacity(_)
                | ProvisionError::Throttled(_)
                | ProvisionError::ServiceUnavailable(_)
                | ProvisionError::Internal(_)
        )
    }
}

impl Transience for ProvisionError {
    fn is_transient(&self) -> bool {
        ProvisionError::is_transient(self)
    }
}

impl fmt::Display for ProvisionError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            ProvisionError::InsufficientCapacity(msg) => {
                write!(f, "insufficient capacity: {}", msg)
            }
            ProvisionError::Throttled(msg) => write!(f, "request throttled: {}", msg),
            ProvisionError::ServiceUnavailable(msg) => write!(f, "service unavailable: {}", msg),
            ProvisionError::Internal(msg) => write!(f, "internal provider error: {}", msg),
            ProvisionError::InvalidRequest(msg) => write!(f, "invalid request: {}", msg),
            ProvisionError::Other(msg) => write!(f, "provisioning error: {}", msg),
        }
    }
}

impl std::error::Error for ProvisionError {}

/// Everything needed to launch one worker instance. The startup payload
/// carries only the job id; credentials stay encrypted in the job store.
#[derive(Debug, Clone)]
pub struct LaunchRequest {
    pub machine_class: MachineClass,
    pub image_id: String,
    pub instance_profile: String,
    pub user_data: String,
    pub tags: Vec<(String, String)>,
}

/// Durable job store, keyed by job id. Must support a conditional
/// per-item transition for `mark_failed`, the compensating action when
/// hand-off fails after persistence.
#[async_trait]
pub trait JobStore: Send + Sync {
    async fn put_job(&self, job: &Job) -> Result<()>;
    async fn get_job(&self, job_id: &str) -> Result<Option<Job>>;
    async fn mark_failed(&self, job_id: &str, error: &str) -> Result<()>;
    /// Filtered count of jobs whose status is in `statuses`.
    async fn count_by_status(&self, statuses: &[JobStatus]) -> Result<usize>;
}

/// Hand-off queue. At-least-once delivery; the consumer side is external.
#[async_trait]
pub trait HandoffQueue: Send + Sync {
    async fn send(&self, message: &HandoffMessage) -> Result<()>;
}

/// Envelope encryption for connection credentials, keyed by a configured
/// key id held by the implementation.
#[async_trait]
pub trait CredentialCipher: Send + Sync {
    async fn encrypt(&self, plaintext: &str) -> Result<String>;
    async fn decrypt(&self, ciphertext: &str) -> Result<String>;
}

/// Decrypt-on-read fetch of the shared API secret. Called once per
/// process; the handler caches the value for its lifetime.
#[async_trait]
pub trait SecretStore: Send + Sync {
    async fn fetch_api_key(&self) -> Result<String>;
}

/// Fire-and-forget metrics. Infallible by signature: implementations
/// swallow their own errors so metric trouble can never fail a request.
pub trait MetricsSink: Send + Sync {
    fn emit_count(&self, name: &str, value: f64, dimensions: &[(&str, &str)]);
}

/// Compute provisioning API: create one worker instance, return its
/// resource identifier.
#[async_trait]
pub trait ComputeProvisioner: Send + Sync {
    async fn launch_worker(&self, request: &LaunchRequest) -> Result<String, ProvisionError>;
}
