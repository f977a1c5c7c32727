// ABOUTME: Error taxonomy for the job orchestration pipeline
// ABOUTME: Each variant maps to a distinct HTTP status at the front door

use std::fmt;

/// Pipeline-level failures, classified by who is at fault and how the
/// front door should answer.
///
/// `BadRequest` reasons are surfaced verbatim to the caller. `Dependency`
/// carries only a caller-safe summary; full collaborator detail is logged
/// server-side before the error is constructed.
#[derive(Debug)]
pub enum OrchestratorError {
    /// Malformed or invalid job spec (400).
    BadRequest(String),
    /// Missing or incorrect shared secret (401). Deliberately carries no
    /// detail so nothing leaks to an unauthenticated caller.
    Unauthorized,
    /// Concurrency ceiling reached (429).
    CapacityExceeded(String),
    /// A required external collaborator failed (500).
    Dependency(String),
}

impl OrchestratorError {
    pub fn status_code(&self) -> u16 {
        match self {
            OrchestratorError::BadRequest(_) => 400,
            OrchestratorError::Unauthorized => 401,
            OrchestratorError::CapacityExceeded(_) => 429,
            OrchestratorError::Dependency(_) => 500,
        }
    }

    /// Message included in the response body sent to the caller.
    pub fn client_message(&self) -> String {
        match self {
            OrchestratorError::BadRequest(msg) => msg.clone(),
            OrchestratorError::Unauthorized => "Unauthorized".to_string(),
            OrchestratorError::CapacityExceeded(msg) => msg.clone(),
            OrchestratorError::Dependency(msg) => msg.clone(),
        }
    }
}

impl fmt::Display for OrchestratorError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            OrchestratorError::BadRequest(msg) => write!(f, "Bad request: {}", msg),
            OrchestratorError::Unauthorized => write!(f, "Unauthorized"),
            OrchestratorError::CapacityExceeded(msg) => write!(f, "Capacity exceeded: {}", msg),
            OrchestratorError::Dependency(msg) => write!(f, "Dependency error: {}", msg),
        }
    }
}

impl std::error::Error for OrchestratorError {}
