// ABOUTME: In-memory fakes for the external collaborators, shared across tests
// ABOUTME: Each fake records calls and can be flipped into failure modes

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use anyhow::{anyhow, bail, Result};
use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use chrono::Utc;
use serde_json::{json, Value};
use uuid::Uuid;

use crate::config::Config;
use crate::external::{
    ComputeProvisioner, CredentialCipher, HandoffQueue, JobStore, LaunchRequest, MetricsSink,
    ProvisionError, SecretStore,
};
use crate::handler::ApiHandler;
use crate::model::{HandoffMessage, Job, JobOptions, JobStatus};
use crate::orchestrator::Orchestrator;
use crate::status::StatusReporter;

pub const API_KEY: &str = "test-shared-secret";

/// Installs a capturing subscriber so test assertions can be debugged
/// via `RUST_LOG`. Idempotent; later calls are no-ops.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// The valid submission scenario used across tests.
pub fn sample_spec() -> Value {
    json!({
        "schema_version": "1.0",
        "command": "init",
        "source_url": "postgresql://u:p@h:5432/db",
        "target_url": "postgresql://u:p@h2:5432/db2",
    })
}

pub fn test_config() -> Config {
    Config::from_lookup(|name| match name {
        "KMS_KEY_ID" => Some("key-test".to_string()),
        "PROVISIONING_QUEUE_URL" => Some("https://queue.test/provision".to_string()),
        "WORKER_AMI_ID" => Some("ami-test".to_string()),
        "WORKER_IAM_ROLE" => Some("worker-role".to_string()),
        "MAX_CONCURRENT_JOBS" => Some("3".to_string()),
        _ => None,
    })
    .expect("test config is valid")
}

pub struct MemoryJobStore {
    jobs: Mutex<HashMap<String, Job>>,
    fail_count: AtomicBool,
    fail_puts: AtomicBool,
    fail_gets: AtomicBool,
}

impl MemoryJobStore {
    pub fn new() -> Arc<Self> {
        init_tracing();
        Arc::new(Self {
            jobs: Mutex::new(HashMap::new()),
            fail_count: AtomicBool::new(false),
            fail_puts: AtomicBool::new(false),
            fail_gets: AtomicBool::new(false),
        })
    }

    pub fn fail_count(&self) {
        self.fail_count.store(true, Ordering::SeqCst);
    }

    pub fn fail_puts(&self) {
        self.fail_puts.store(true, Ordering::SeqCst);
    }

    pub fn fail_gets(&self) {
        self.fail_gets.store(true, Ordering::SeqCst);
    }

    pub fn len(&self) -> usize {
        self.jobs.lock().unwrap().len()
    }

    pub fn get(&self, job_id: &str) -> Option<Job> {
        self.jobs.lock().unwrap().get(job_id).cloned()
    }

    pub fn all(&self) -> Vec<Job> {
        self.jobs.lock().unwrap().values().cloned().collect()
    }

    pub fn insert_active_job(&self) -> String {
        self.insert_with_status(JobStatus::Provisioning)
    }

    pub fn insert_terminal_job(&self) -> String {
        self.insert_with_status(JobStatus::Completed)
    }

    pub fn set_log_location(&self, job_id: &str, log_group: &str, log_stream: &str) {
        let mut jobs = self.jobs.lock().unwrap();
        let job = jobs.get_mut(job_id).expect("job exists");
        job.log_group = Some(log_group.to_string());
        job.log_stream = Some(log_stream.to_string());
    }

    fn insert_with_status(&self, status: JobStatus) -> String {
        let now = Utc::now();
        let job_id = Uuid::new_v4().to_string();
        let job = Job {
            job_id: job_id.clone(),
            trace_id: Uuid::new_v4().to_string(),
            schema_version: "1.0".to_string(),
            status,
            command: "init".to_string(),
            source_url_encrypted: "enc:c291cmNl".to_string(),
            target_url_encrypted: "enc:dGFyZ2V0".to_string(),
            filter: json!({}),
            options: JobOptions::default(),
            created_at: now,
            started_at: None,
            completed_at: None,
            error: None,
            progress: None,
            log_group: None,
            log_stream: None,
            ttl: now.timestamp() + 86_400,
        };
        self.jobs.lock().unwrap().insert(job_id.clone(), job);
        job_id
    }
}

#[async_trait]
impl JobStore for MemoryJobStore {
    async fn put_job(&self, job: &Job) -> Result<()> {
        if self.fail_puts.load(Ordering::SeqCst) {
            bail!("store offline");
        }
        self.jobs
            .lock()
            .unwrap()
            .insert(job.job_id.clone(), job.clone());
        Ok(())
    }

    async fn get_job(&self, job_id: &str) -> Result<Option<Job>> {
        if self.fail_gets.load(Ordering::SeqCst) {
            bail!("store offline");
        }
        Ok(self.jobs.lock().unwrap().get(job_id).cloned())
    }

    async fn mark_failed(&self, job_id: &str, error: &str) -> Result<()> {
        let mut jobs = self.jobs.lock().unwrap();
        let job = jobs
            .get_mut(job_id)
            .ok_or_else(|| anyhow!("no job {}", job_id))?;
        job.status = JobStatus::Failed;
        job.error = Some(error.to_string());
        Ok(())
    }

    async fn count_by_status(&self, statuses: &[JobStatus]) -> Result<usize> {
        if self.fail_count.load(Ordering::SeqCst) {
            bail!("count query timed out");
        }
        Ok(self
            .jobs
            .lock()
            .unwrap()
            .values()
            .filter(|job| statuses.contains(&job.status))
            .count())
    }
}

pub struct MemoryQueue {
    pub sent: Mutex<Vec<HandoffMessage>>,
    fail: AtomicBool,
}

impl MemoryQueue {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            sent: Mutex::new(Vec::new()),
            fail: AtomicBool::new(false),
        })
    }

    pub fn fail_sends(&self) {
        self.fail.store(true, Ordering::SeqCst);
    }
}

#[async_trait]
impl HandoffQueue for MemoryQueue {
    async fn send(&self, message: &HandoffMessage) -> Result<()> {
        if self.fail.load(Ordering::SeqCst) {
            bail!("queue unreachable");
        }
        self.sent.lock().unwrap().push(message.clone());
        Ok(())
    }
}

/// Reversible stand-in for the envelope cipher: base64 under an `enc:`
/// prefix, enough to prove plaintext never reaches the store.
pub struct StubCipher {
    fail_next: AtomicBool,
}

impl StubCipher {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            fail_next: AtomicBool::new(false),
        })
    }

    pub fn fail_next(&self) {
        self.fail_next.store(true, Ordering::SeqCst);
    }
}

#[async_trait]
impl CredentialCipher for StubCipher {
    async fn encrypt(&self, plaintext: &str) -> Result<String> {
        if self.fail_next.swap(false, Ordering::SeqCst) {
            bail!("key unavailable");
        }
        Ok(format!("enc:{}", STANDARD.encode(plaintext)))
    }

    async fn decrypt(&self, ciphertext: &str) -> Result<String> {
        let encoded = ciphertext
            .strip_prefix("enc:")
            .ok_or_else(|| anyhow!("not a stub ciphertext"))?;
        let bytes = STANDARD.decode(encoded)?;
        Ok(String::from_utf8(bytes)?)
    }
}

pub struct StubSecrets;

#[async_trait]
impl SecretStore for StubSecrets {
    async fn fetch_api_key(&self) -> Result<String> {
        Ok(API_KEY.to_string())
    }
}

pub struct RecordingMetrics {
    pub emitted: Mutex<Vec<(String, Vec<(String, String)>)>>,
}

impl RecordingMetrics {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            emitted: Mutex::new(Vec::new()),
        })
    }
}

impl MetricsSink for RecordingMetrics {
    fn emit_count(&self, name: &str, _value: f64, dimensions: &[(&str, &str)]) {
        let dimensions = dimensions
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        self.emitted
            .lock()
            .unwrap()
            .push((name.to_string(), dimensions));
    }
}

pub struct ScriptedProvisioner {
    script: Mutex<VecDeque<Result<String, ProvisionError>>>,
    calls: AtomicUsize,
    pub requests: Mutex<Vec<LaunchRequest>>,
}

impl ScriptedProvisioner {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            script: Mutex::new(VecDeque::new()),
            calls: AtomicUsize::new(0),
            requests: Mutex::new(Vec::new()),
        })
    }

    pub fn script(&self, results: impl IntoIterator<Item = Result<String, ProvisionError>>) {
        self.script.lock().unwrap().extend(results);
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ComputeProvisioner for ScriptedProvisioner {
    async fn launch_worker(&self, request: &LaunchRequest) -> Result<String, ProvisionError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.requests.lock().unwrap().push(request.clone());
        self.script
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Ok("i-default".to_string()))
    }
}

/// Bundles the fakes with an orchestrator wired to them.
pub struct Harness {
    pub store: Arc<MemoryJobStore>,
    pub queue: Arc<MemoryQueue>,
    pub cipher: Arc<StubCipher>,
    pub provisioner: Arc<ScriptedProvisioner>,
    pub metrics: Arc<RecordingMetrics>,
    pub orchestrator: Orchestrator,
    config: Config,
}

impl Harness {
    pub fn new() -> Self {
        let config = test_config();
        let store = MemoryJobStore::new();
        let queue = MemoryQueue::new();
        let cipher = StubCipher::new();
        let provisioner = ScriptedProvisioner::new();
        let metrics = RecordingMetrics::new();
        let orchestrator = Orchestrator::new(
            config.clone(),
            store.clone(),
            queue.clone(),
            cipher.clone(),
            provisioner.clone(),
            metrics.clone(),
        );
        Self {
            store,
            queue,
            cipher,
            provisioner,
            metrics,
            orchestrator,
            config,
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// A front-door handler sharing this harness's collaborators.
    pub async fn handler(&self) -> ApiHandler {
        let orchestrator = Orchestrator::new(
            self.config.clone(),
            self.store.clone(),
            self.queue.clone(),
            self.cipher.clone(),
            self.provisioner.clone(),
            self.metrics.clone(),
        );
        let reporter = StatusReporter::new(self.store.clone(), self.config.region.clone());
        ApiHandler::new(&StubSecrets, orchestrator, reporter)
            .await
            .expect("handler construction")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tracing_init_is_idempotent() {
        init_tracing();
        init_tracing();
        tracing::info!("captured by the test subscriber");
    }

    #[tokio::test]
    async fn stub_cipher_round_trips() {
        let cipher = StubCipher::new();
        let ciphertext = cipher.encrypt("postgresql://u:p@h/db").await.unwrap();
        assert!(!ciphertext.contains("u:p"));
        assert_eq!(
            cipher.decrypt(&ciphertext).await.unwrap(),
            "postgresql://u:p@h/db"
        );
    }
}
