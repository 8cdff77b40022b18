// ============================================================================
// File: packages/rerobots/src/api/mod.rs
// ----------------------------------------------------------------------------
// API client for the rerobots service.
//
// `ApiClient` holds the bearer token and the transport, and normalizes every
// response into a typed value or a `RerobotsError`. Operations are grouped
// by concern:
// - catalog: deployment search and detail
// - leases: instance creation, inspection, termination
// - addons: add-on activation, status, actions
// ============================================================================

use std::sync::Arc;

use http::StatusCode;
use log::debug;
use serde_json::Value;

use crate::addons::AddonRegistry;
use crate::config::ClientConfig;
use crate::error::{RerobotsError, RerobotsResult};
use crate::transport::{ApiRequest, ApiResponse, HttpTransport, Transport};

mod addons;
mod catalog;
mod leases;
pub mod types;


pub use catalog::DeploymentFilter;
pub use leases::{LeaseOptions, LeaseTarget};
pub use types::{ConnectionDescriptor, Deployment, InstanceStatus, Lease, LeaseGrant};

/// Client for the rerobots API
///
/// The token is fixed at construction. On `RerobotsError::Auth`, build a new
/// client with a fresh token.
#[derive(Debug, Clone)]
pub struct ApiClient {
    transport: Arc<dyn Transport>,
    api_token: Option<String>,
    addons: Arc<AddonRegistry>,
}

impl ApiClient {
    /// Create a client that talks HTTP to the configured endpoint
    pub fn new(config: &ClientConfig) -> Self {
        Self::with_transport(Arc::new(HttpTransport::new(config)), config.api_token.clone())
    }

    /// Create a client over an arbitrary transport
    pub fn with_transport(transport: Arc<dyn Transport>, api_token: Option<String>) -> Self {
        Self {
            transport,
            api_token,
            addons: Arc::new(AddonRegistry::new()),
        }
    }

    /// Replace the add-on registry used for routing add-on requests
    pub fn with_addons(mut self, registry: AddonRegistry) -> Self {
        self.addons = Arc::new(registry);
        self
    }

    pub fn api_token(&self) -> Option<&str> {
        self.api_token.as_deref()
    }

    pub fn addons(&self) -> &AddonRegistry {
        &self.addons
    }

    /// Send a request and return the raw response, whatever its status
    pub(crate) fn send(&self, request: &ApiRequest) -> RerobotsResult<ApiResponse> {
        self.transport.send(request, self.api_token.as_deref())
    }

    /// Send a request and return the body of a 2xx response
    ///
    /// `resource` names what was addressed, for `NotFound` messages.
    pub(crate) fn execute(&self, request: &ApiRequest, resource: &str) -> RerobotsResult<Value> {
        let response = self.send(request)?;
        if response.is_success() {
            Ok(response.body)
        } else {
            debug!(
                "{} {} failed with {}",
                request.method, request.path, response.status
            );
            Err(classify(&response, resource))
        }
    }
}

/// Map a non-2xx response onto the error taxonomy
pub(crate) fn classify(response: &ApiResponse, resource: &str) -> RerobotsError {
    let message = response.message();
    match response.status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => RerobotsError::Auth { message },
        StatusCode::BAD_REQUEST if mentions_bad_token(&message) => RerobotsError::Auth { message },
        StatusCode::NOT_FOUND => RerobotsError::NotFound {
            resource: resource.to_string(),
        },
        status => RerobotsError::Service {
            status: status.as_u16(),
            message,
        },
    }
}

fn mentions_bad_token(message: &str) -> bool {
    let message = message.to_lowercase();
    message.contains("token")
        && ["wrong", "invalid", "expired"]
            .iter()
            .any(|word| message.contains(word))
}

/// Pull a required field out of a response body
pub(crate) fn field<'a>(body: &'a Value, key: &str, context: &str) -> RerobotsResult<&'a Value> {
    body.get(key)
        .ok_or_else(|| RerobotsError::decode(format!("{context}: missing `{key}`")))
}
