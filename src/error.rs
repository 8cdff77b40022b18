// ============================================================================
// File: packages/rerobots/src/error.rs
// ----------------------------------------------------------------------------
// Error taxonomy for API, instance lifecycle, and SSH transport operations
// ============================================================================

use std::time::Duration;

/// Errors produced by the rerobots client
///
/// Every failure surfaces as one of these variants. The client never retries
/// on its own; the polling loop in `Instance::wait_for_ready` is the only
/// place that repeats a request.
#[derive(Debug, thiserror::Error)]
pub enum RerobotsError {
    /// API token missing, invalid, or expired
    #[error("authentication failed: {message}")]
    Auth { message: String },

    /// Non-2xx response not otherwise classified
    #[error("service error (HTTP {status}): {message}")]
    Service { status: u16, message: String },

    /// Addressed resource does not exist
    #[error("{resource} not found")]
    NotFound { resource: String },

    /// Provisioning reached a terminal failure state
    #[error("instance {instance_id} failed to initialize (status {status})")]
    InstanceFailure { instance_id: String, status: String },

    /// A bounded wait exceeded its budget
    #[error("{operation} timed out after {waited:?}")]
    Timeout {
        operation: &'static str,
        waited: Duration,
    },

    /// Operation attempted in a state that forbids it
    #[error("invalid state for {operation}: {details}")]
    InvalidState {
        operation: &'static str,
        details: String,
    },

    /// Presented host key does not match any key declared by the service
    #[error("host key verification failed for {host}: presented {presented}")]
    HostKey { host: String, presented: String },

    /// File transfer failed on an open session
    #[error("transfer of {path} failed: {details}")]
    Transfer { path: String, details: String },

    /// Request did not produce an HTTP status
    #[error("network request failed: {details}")]
    Network { details: String },

    /// Response body failed validation
    #[error("malformed response: {details}")]
    Decode { details: String },

    /// SSH session or channel failure
    #[error("ssh error: {details}")]
    Ssh { details: String },

    /// Wait abandoned through a cancel token
    #[error("{operation} was cancelled")]
    Cancelled { operation: &'static str },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl RerobotsError {
    pub(crate) fn invalid_state<D: Into<String>>(operation: &'static str, details: D) -> Self {
        Self::InvalidState {
            operation,
            details: details.into(),
        }
    }

    pub(crate) fn ssh<D: std::fmt::Display>(details: D) -> Self {
        Self::Ssh {
            details: details.to_string(),
        }
    }

    pub(crate) fn decode<D: std::fmt::Display>(details: D) -> Self {
        Self::Decode {
            details: details.to_string(),
        }
    }

    /// True when the caller should re-authenticate
    pub fn is_auth(&self) -> bool {
        matches!(self, Self::Auth { .. })
    }

    /// True when the addressed resource is gone
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }

    /// True when the service refused because all candidates are busy
    pub fn is_busy(&self) -> bool {
        matches!(self, Self::Service { status: 503, .. })
    }
}

impl From<serde_json::Error> for RerobotsError {
    fn from(err: serde_json::Error) -> Self {
        Self::decode(err)
    }
}

impl From<ssh2::Error> for RerobotsError {
    fn from(err: ssh2::Error) -> Self {
        Self::ssh(err)
    }
}

/// Result type for client operations
pub type RerobotsResult<T> = Result<T, RerobotsError>;
