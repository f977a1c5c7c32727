// ABOUTME: Multi-stage validation of untrusted job specifications
// ABOUTME: Ordered checks, first failure short-circuits with a verbatim reason

use serde_json::Value;

use super::url::check_postgres_url;
use crate::model::{JobOptions, JobSpec};

/// Worker launch configuration tops out at 16 KiB of startup payload;
/// keep 1 KiB of headroom.
pub const MAX_JOB_SPEC_SIZE_BYTES: usize = 15 * 1024;
pub const MAX_URL_LENGTH: usize = 2048;
pub const MAX_COMMAND_LENGTH: usize = 50;

pub const CURRENT_SCHEMA_VERSION: &str = "1.0";
pub const SUPPORTED_SCHEMA_VERSIONS: [&str; 1] = ["1.0"];
pub const ALLOWED_COMMANDS: [&str; 5] = ["init", "validate", "sync", "status", "verify"];

/// Validates an untrusted job spec. Checks run in a fixed order and the
/// first failure is returned as the rejection reason, surfaced verbatim
/// to the requester. On success yields a typed spec with the command
/// normalized and both URLs vetted. Pure: no I/O, input never mutated.
pub fn validate_job_spec(body: &Value) -> Result<JobSpec, String> {
    // 1. Total serialized size.
    let serialized = serde_json::to_string(body)
        .map_err(|e| format!("Failed to serialize job spec: {}", e))?;
    if serialized.len() > MAX_JOB_SPEC_SIZE_BYTES {
        return Err(format!(
            "Job spec too large: {} bytes (max: {})",
            serialized.len(),
            MAX_JOB_SPEC_SIZE_BYTES
        ));
    }

    // 2. Schema version gate. Unknown future versions are rejected
    // explicitly rather than guessed at.
    let schema_version = match body.get("schema_version") {
        None | Some(Value::Null) => {
            return Err("Missing required field: schema_version".to_string())
        }
        Some(Value::String(s)) if s.is_empty() => {
            return Err("Missing required field: schema_version".to_string())
        }
        Some(Value::String(s)) => s.as_str(),
        Some(other) => {
            return Err(format!(
                "Unsupported schema version: {} (supported: {})",
                other,
                SUPPORTED_SCHEMA_VERSIONS.join(", ")
            ))
        }
    };
    if !SUPPORTED_SCHEMA_VERSIONS.contains(&schema_version) {
        return Err(format!(
            "Unsupported schema version: {} (supported: {})",
            schema_version,
            SUPPORTED_SCHEMA_VERSIONS.join(", ")
        ));
    }

    // 3. Required string fields.
    let command_raw = required_string(body, "command")?;
    let source_url = required_string(body, "source_url")?;
    let target_url = required_string(body, "target_url")?;

    // 4. Command allow-list, after normalization.
    let command = command_raw.trim().to_lowercase();
    if command.chars().count() > MAX_COMMAND_LENGTH {
        return Err(format!(
            "Command too long: {} chars (max: {})",
            command.chars().count(),
            MAX_COMMAND_LENGTH
        ));
    }
    if !ALLOWED_COMMANDS.contains(&command.as_str()) {
        return Err(format!(
            "Invalid command: {} (allowed: {})",
            command,
            ALLOWED_COMMANDS.join(", ")
        ));
    }

    // 5. Connection URLs.
    for (field, url) in [("source_url", source_url), ("target_url", target_url)] {
        let length = url.chars().count();
        if length > MAX_URL_LENGTH {
            return Err(format!(
                "{} too long: {} chars (max: {})",
                field, length, MAX_URL_LENGTH
            ));
        }
        check_postgres_url(url).map_err(|reason| format!("Invalid {}: {}", field, reason))?;
    }

    // 6. Options, if present: bounded key set with typed values.
    let options = match body.get("options") {
        None => JobOptions::default(),
        Some(Value::Object(map)) => {
            let mut options = JobOptions::default();
            for (key, value) in map {
                match key.as_str() {
                    "drop_existing" | "enable_sync" => {
                        let Some(flag) = value.as_bool() else {
                            return Err(format!("Option '{}' must be a boolean", key));
                        };
                        match key.as_str() {
                            "drop_existing" => options.drop_existing = Some(flag),
                            _ => options.enable_sync = Some(flag),
                        }
                    }
                    "estimated_size_bytes" => {
                        if !value.is_number() {
                            return Err(format!("Option '{}' must be a number", key));
                        }
                        let size = value.as_f64().unwrap_or(0.0);
                        if size < 0.0 {
                            return Err(format!("Option '{}' must be non-negative", key));
                        }
                        options.estimated_size_bytes = Some(size as u64);
                    }
                    _ => return Err(format!("Unknown option: {}", key)),
                }
            }
            options
        }
        Some(_) => return Err("Field 'options' must be an object".to_string()),
    };

    // 7. Filter is opaque to this layer; only its shape is checked.
    let filter = match body.get("filter") {
        None => Value::Object(Default::default()),
        Some(filter @ Value::Object(_)) => filter.clone(),
        Some(_) => return Err("Field 'filter' must be an object".to_string()),
    };

    Ok(JobSpec {
        schema_version: schema_version.to_string(),
        command,
        source_url: source_url.to_string(),
        target_url: target_url.to_string(),
        options,
        filter,
    })
}

fn required_string<'a>(body: &'a Value, field: &str) -> Result<&'a str, String> {
    match body.get(field) {
        None => Err(format!("Missing required field: {}", field)),
        Some(Value::String(s)) => {
            if s.trim().is_empty() {
                Err(format!("Field '{}' cannot be empty", field))
            } else {
                Ok(s)
            }
        }
        Some(_) => Err(format!("Field '{}' must be a string", field)),
    }
}
