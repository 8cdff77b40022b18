// ============================================================================
// File: packages/rerobots/src/transport/blocking.rs
// ----------------------------------------------------------------------------
// Blocking HTTP gateway for the rerobots API.
// ============================================================================

use http::StatusCode;
use log::debug;

use crate::config::ClientConfig;
use crate::error::{RerobotsError, RerobotsResult};

use super::{ApiRequest, ApiResponse, Transport, parse_body};

/// HTTP transport backed by a `ureq` agent
///
/// The agent pools connections; clones share the pool.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    agent: ureq::Agent,
    base_uri: String,
}

impl HttpTransport {
    /// Create transport for the configured endpoint
    pub fn new(config: &ClientConfig) -> Self {
        let agent = ureq::AgentBuilder::new()
            .timeout(config.request_timeout)
            .user_agent(concat!("rerobots-rs/", env!("CARGO_PKG_VERSION")))
            .build();

        Self {
            agent,
            base_uri: config.base_uri.trim_end_matches('/').to_string(),
        }
    }

    /// Get base URI
    pub fn base_uri(&self) -> &str {
        &self.base_uri
    }
}

impl Transport for HttpTransport {
    fn send(&self, request: &ApiRequest, token: Option<&str>) -> RerobotsResult<ApiResponse> {
        let url = format!("{}{}", self.base_uri, request.path);
        debug!("{} {}", request.method, url);

        let mut call = self.agent.request(request.method.as_str(), &url);
        for (key, value) in &request.query {
            call = call.query(key, value);
        }
        if let Some(token) = token {
            call = call.set("Authorization", &format!("Bearer {token}"));
        }

        let result = match &request.body {
            Some(body) => call.send_json(body),
            None => call.call(),
        };

        // ureq reports 4xx/5xx as errors; callers classify statuses themselves
        let response = match result {
            Ok(response) => response,
            Err(ureq::Error::Status(_, response)) => response,
            Err(ureq::Error::Transport(err)) => {
                return Err(RerobotsError::Network {
                    details: format!("{} {}: {}", request.method, url, err),
                });
            }
        };

        let status =
            StatusCode::from_u16(response.status()).map_err(|e| RerobotsError::Network {
                details: format!("invalid status from {url}: {e}"),
            })?;
        let text = response.into_string()?;

        debug!("{} {} -> {}", request.method, url, status);
        Ok(ApiResponse::new(status, parse_body(&text)))
    }
}
