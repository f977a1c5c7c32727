// ABOUTME: Job orchestrator composing admission, validation, persistence, and hand-off
// ABOUTME: Also owns the consumer-side worker provisioning step

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use serde_json::Value;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::config::Config;
use crate::error::OrchestratorError;
use crate::external::{
    ComputeProvisioner, CredentialCipher, HandoffQueue, JobStore, LaunchRequest, MetricsSink,
    ProvisionError,
};
use crate::model::{HandoffMessage, Job, JobOptions, JobStatus, SubmissionReceipt};
use crate::redact::redact_url;
use crate::retry::retry_with_backoff;
use crate::sizing::choose_class;
use crate::validate::validate_job_spec;

const PROVISION_MAX_ATTEMPTS: u32 = 3;
const PROVISION_INITIAL_DELAY: Duration = Duration::from_secs(2);

pub struct Orchestrator {
    config: Config,
    store: Arc<dyn JobStore>,
    queue: Arc<dyn HandoffQueue>,
    cipher: Arc<dyn CredentialCipher>,
    provisioner: Arc<dyn ComputeProvisioner>,
    metrics: Arc<dyn MetricsSink>,
}

impl Orchestrator {
    pub fn new(
        config: Config,
        store: Arc<dyn JobStore>,
        queue: Arc<dyn HandoffQueue>,
        cipher: Arc<dyn CredentialCipher>,
        provisioner: Arc<dyn ComputeProvisioner>,
        metrics: Arc<dyn MetricsSink>,
    ) -> Self {
        Self {
            config,
            store,
            queue,
            cipher,
            provisioner,
            metrics,
        }
    }

    /// Advisory count of jobs holding admission slots. Fail-open by
    /// configured policy: a store failure is logged and counted as zero,
    /// so a degraded store cannot also block new submissions.
    pub async fn active_jobs(&self) -> usize {
        let statuses = [JobStatus::Provisioning, JobStatus::Running];
        match self.store.count_by_status(&statuses).await {
            Ok(count) => count,
            Err(err) => {
                warn!(
                    error = %format!("{:#}", err),
                    fail_open = self.config.admission_fail_open,
                    "failed to count active jobs, admitting"
                );
                0
            }
        }
    }

    /// Submission path: admit, validate, encrypt, persist, hand off.
    pub async fn submit(&self, raw_body: &str) -> Result<SubmissionReceipt, OrchestratorError> {
        let active = self.active_jobs().await;
        if active >= self.config.max_concurrent_jobs {
            info!(
                active,
                ceiling = self.config.max_concurrent_jobs,
                "submission rejected at admission"
            );
            return Err(OrchestratorError::CapacityExceeded(format!(
                "Maximum concurrent jobs limit reached ({}). Please try again later.",
                self.config.max_concurrent_jobs
            )));
        }

        let body: Value = serde_json::from_str(raw_body)
            .map_err(|e| OrchestratorError::BadRequest(format!("Invalid JSON: {}", e)))?;

        let spec = validate_job_spec(&body).map_err(|reason| {
            info!(%reason, "job spec rejected");
            OrchestratorError::BadRequest(reason)
        })?;

        let job_id = Uuid::new_v4().to_string();
        let trace_id = Uuid::new_v4().to_string();
        info!(
            %job_id,
            %trace_id,
            command = %spec.command,
            source = %redact_url(&spec.source_url),
            target = %redact_url(&spec.target_url),
            "job submitted"
        );

        // Plaintext URLs must never be persisted; encryption failure
        // aborts the submission before any record exists.
        let source_url_encrypted = self.cipher.encrypt(&spec.source_url).await.map_err(|err| {
            error!(%job_id, error = %format!("{:#}", err), "credential encryption failed");
            OrchestratorError::Dependency("Failed to encrypt credentials".to_string())
        })?;
        let target_url_encrypted = self.cipher.encrypt(&spec.target_url).await.map_err(|err| {
            error!(%job_id, error = %format!("{:#}", err), "credential encryption failed");
            OrchestratorError::Dependency("Failed to encrypt credentials".to_string())
        })?;

        let now = Utc::now();
        let job = Job {
            job_id: job_id.clone(),
            trace_id: trace_id.clone(),
            schema_version: spec.schema_version.clone(),
            status: JobStatus::Provisioning,
            command: spec.command.clone(),
            source_url_encrypted,
            target_url_encrypted,
            filter: spec.filter.clone(),
            options: spec.options.clone(),
            created_at: now,
            started_at: None,
            completed_at: None,
            error: None,
            progress: None,
            log_group: None,
            log_stream: None,
            ttl: now.timestamp() + self.config.retention.as_secs() as i64,
        };

        self.store.put_job(&job).await.map_err(|err| {
            error!(%job_id, error = %format!("{:#}", err), "failed to persist job record");
            OrchestratorError::Dependency("Failed to create job record".to_string())
        })?;

        let message = HandoffMessage {
            job_id: job_id.clone(),
            trace_id: trace_id.clone(),
            options: spec.options.clone(),
        };
        if let Err(err) = self.queue.send(&message).await {
            error!(
                %job_id,
                %trace_id,
                error = %format!("{:#}", err),
                "failed to enqueue provisioning hand-off"
            );
            // A record with no hand-off must not linger in provisioning.
            if let Err(mark_err) = self.store.mark_failed(&job_id, "Failed to enqueue job").await {
                error!(
                    %job_id,
                    error = %format!("{:#}", mark_err),
                    "failed to mark orphaned job as failed"
                );
            }
            return Err(OrchestratorError::Dependency(
                "Failed to enqueue job".to_string(),
            ));
        }

        info!(%job_id, %trace_id, "job enqueued for provisioning");
        self.metrics
            .emit_count("JobSubmitted", 1.0, &[("Command", spec.command.as_str())]);

        Ok(SubmissionReceipt {
            job_id,
            trace_id,
            status: JobStatus::Provisioning,
        })
    }

    /// Provisioning path, driven by the queue consumer: size the worker,
    /// launch it through the backoff retrier, return the resource id for
    /// the caller to persist. The startup payload carries only the job
    /// id; the worker fetches and decrypts credentials itself.
    pub async fn provision_worker(
        &self,
        job_id: &str,
        options: &JobOptions,
    ) -> Result<String, ProvisionError> {
        let estimated = options.estimated_size_bytes.unwrap_or(0);
        let machine_class = choose_class(estimated, self.config.default_machine_class);
        if estimated > 0 {
            info!(
                %job_id,
                estimated_gib = estimated / (1 << 30),
                class = %machine_class,
                "machine class selected from size estimate"
            );
        } else {
            info!(%job_id, class = %machine_class, "no size estimate, using default machine class");
        }

        let request = LaunchRequest {
            machine_class,
            image_id: self.config.worker_image_id.clone(),
            instance_profile: self.config.worker_iam_role.clone(),
            user_data: worker_user_data(job_id),
            tags: vec![
                ("Name".to_string(), format!("seren-replication-{}", job_id)),
                ("JobId".to_string(), job_id.to_string()),
                (
                    "ManagedBy".to_string(),
                    "seren-replication-system".to_string(),
                ),
            ],
        };

        let resource_id = retry_with_backoff(
            || self.provisioner.launch_worker(&request),
            PROVISION_MAX_ATTEMPTS,
            PROVISION_INITIAL_DELAY,
        )
        .await?;

        info!(%job_id, %resource_id, class = %machine_class, "worker instance launched");
        Ok(resource_id)
    }
}

/// Boot script for the worker instance. Credentials are deliberately
/// absent; the worker pulls the encrypted record by job id.
fn worker_user_data(job_id: &str) -> String {
    format!(
        "#!/bin/bash\n\
         set -euo pipefail\n\
         \n\
         /opt/seren-replicator/worker.sh \"{}\"\n",
        job_id
    )
}
