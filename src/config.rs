// ABOUTME: Process configuration, built once at startup from the environment
// ABOUTME: Replaces ambient globals; handlers receive this by reference

use std::time::Duration;

use anyhow::{bail, Context, Result};

use crate::sizing::MachineClass;

const DEFAULT_MAX_CONCURRENT_JOBS: &str = "10";
const DEFAULT_MACHINE_CLASS: &str = "c5.2xlarge";
const DEFAULT_RETENTION_DAYS: &str = "30";
const DEFAULT_REGION: &str = "us-east-1";

/// Externally supplied configuration, validated up front so a bad
/// deployment fails at startup instead of on the first request.
#[derive(Debug, Clone)]
pub struct Config {
    /// Maximum number of jobs simultaneously in a non-terminal state.
    pub max_concurrent_jobs: usize,
    /// Machine class used when a job carries no size estimate.
    pub default_machine_class: MachineClass,
    /// Key id the credential cipher encrypts under.
    pub encryption_key_id: String,
    /// Destination for provisioning hand-off messages.
    pub provisioning_queue_url: String,
    /// Retention window before job records expire from the store.
    pub retention: Duration,
    /// Region used when constructing log viewer URLs.
    pub region: String,
    /// Image the worker instance boots from.
    pub worker_image_id: String,
    /// Instance profile granting the worker store and decrypt access.
    pub worker_iam_role: String,
    /// Documented availability trade-off: a failing count query admits
    /// rather than blocks. See `Orchestrator::active_jobs`.
    pub admission_fail_open: bool,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Builds the configuration from an arbitrary lookup, so tests can
    /// supply values without touching process-global environment state.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let max_concurrent_jobs: usize = lookup("MAX_CONCURRENT_JOBS")
            .unwrap_or_else(|| DEFAULT_MAX_CONCURRENT_JOBS.to_string())
            .parse()
            .context("MAX_CONCURRENT_JOBS must be an integer")?;
        if max_concurrent_jobs == 0 {
            bail!("MAX_CONCURRENT_JOBS must be at least 1");
        }

        let default_machine_class = lookup("WORKER_INSTANCE_TYPE")
            .unwrap_or_else(|| DEFAULT_MACHINE_CLASS.to_string())
            .parse::<MachineClass>()
            .context("WORKER_INSTANCE_TYPE is not a recognized machine class")?;

        let retention_days: u64 = lookup("JOB_RETENTION_DAYS")
            .unwrap_or_else(|| DEFAULT_RETENTION_DAYS.to_string())
            .parse()
            .context("JOB_RETENTION_DAYS must be an integer")?;

        Ok(Config {
            max_concurrent_jobs,
            default_machine_class,
            encryption_key_id: required(&lookup, "KMS_KEY_ID")?,
            provisioning_queue_url: required(&lookup, "PROVISIONING_QUEUE_URL")?,
            retention: Duration::from_secs(retention_days * 86_400),
            region: lookup("AWS_REGION").unwrap_or_else(|| DEFAULT_REGION.to_string()),
            worker_image_id: required(&lookup, "WORKER_AMI_ID")?,
            worker_iam_role: required(&lookup, "WORKER_IAM_ROLE")?,
            admission_fail_open: true,
        })
    }
}

fn required(lookup: &impl Fn(&str) -> Option<String>, name: &str) -> Result<String> {
    match lookup(name) {
        Some(value) if !value.is_empty() => Ok(value),
        _ => bail!("{} environment variable not set", name),
    }
}
