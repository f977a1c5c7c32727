// ABOUTME: Transport-agnostic front door for the jobs API
// ABOUTME: Shared-secret auth, routing, and HTTP status mapping

use std::collections::HashMap;

use anyhow::{Context, Result};
use serde::Serialize;
use serde_json::json;
use tracing::{info, warn};

use crate::error::OrchestratorError;
use crate::external::SecretStore;
use crate::orchestrator::Orchestrator;
use crate::status::StatusReporter;

const API_KEY_HEADER: &str = "x-api-key";

/// One inbound request, as delivered by whatever dispatcher fronts the
/// process. Header names are matched case-insensitively.
#[derive(Debug, Clone)]
pub struct ApiRequest {
    pub method: String,
    pub path: String,
    pub headers: HashMap<String, String>,
    pub body: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiResponse {
    pub status: u16,
    pub body: String,
}

impl ApiResponse {
    fn json(status: u16, payload: &impl Serialize) -> Self {
        match serde_json::to_string(payload) {
            Ok(body) => ApiResponse { status, body },
            Err(_) => ApiResponse::error(500, "Internal server error"),
        }
    }

    fn error(status: u16, message: &str) -> Self {
        ApiResponse {
            status,
            body: json!({ "error": message }).to_string(),
        }
    }
}

pub struct ApiHandler {
    api_key: String,
    orchestrator: Orchestrator,
    reporter: StatusReporter,
}

impl ApiHandler {
    /// Fetches the shared API secret once at construction; the handler
    /// holds it read-only for the process lifetime.
    pub async fn new(
        secrets: &dyn SecretStore,
        orchestrator: Orchestrator,
        reporter: StatusReporter,
    ) -> Result<Self> {
        let api_key = secrets
            .fetch_api_key()
            .await
            .context("failed to load shared API secret")?;
        Ok(Self {
            api_key,
            orchestrator,
            reporter,
        })
    }

    pub async fn handle(&self, request: &ApiRequest) -> ApiResponse {
        if !self.authorized(request) {
            warn!(method = %request.method, path = %request.path, "authentication failed");
            let err = OrchestratorError::Unauthorized;
            return ApiResponse::error(err.status_code(), &err.client_message());
        }

        info!(method = %request.method, path = %request.path, "request");
        match (request.method.as_str(), request.path.as_str()) {
            ("POST", "/jobs") => self.submit(request).await,
            ("GET", path) if path.starts_with("/jobs/") => {
                let job_id = path.trim_start_matches("/jobs/");
                self.status(job_id).await
            }
            _ => ApiResponse::error(404, "Not found"),
        }
    }

    fn authorized(&self, request: &ApiRequest) -> bool {
        request
            .headers
            .iter()
            .find(|(name, _)| name.eq_ignore_ascii_case(API_KEY_HEADER))
            .map(|(_, value)| value == &self.api_key)
            .unwrap_or(false)
    }

    async fn submit(&self, request: &ApiRequest) -> ApiResponse {
        let body = request.body.as_deref().unwrap_or("");
        match self.orchestrator.submit(body).await {
            Ok(receipt) => ApiResponse::json(201, &receipt),
            Err(err) => ApiResponse::error(err.status_code(), &err.client_message()),
        }
    }

    async fn status(&self, job_id: &str) -> ApiResponse {
        match self.reporter.job_status(job_id).await {
            Ok(Some(view)) => ApiResponse::json(200, &view),
            Ok(None) => ApiResponse::error(404, "Job not found"),
            Err(err) => ApiResponse::error(err.status_code(), &err.client_message()),
        }
    }
}
