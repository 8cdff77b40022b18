//! Reverse proxy to the HTTP API onboard a Misty robot

use serde_json::Value;

use crate::error::{RerobotsError, RerobotsResult};
use crate::transport::ApiRequest;

use super::{Addon, AddonOutput};

/// `mistyproxy` add-on
///
/// The action returns the proxy URLs (`HTTP`, `WebSocket`) carried by the
/// add-on status record once it is active.
#[derive(Debug, Clone, Copy, Default)]
pub struct MistyProxyAddon;

impl Addon for MistyProxyAddon {
    fn name(&self) -> &str {
        "mistyproxy"
    }

    fn action_request(&self, lease_id: &str, _payload: &Value) -> RerobotsResult<ApiRequest> {
        Ok(self.status_request(lease_id))
    }

    fn parse_action(&self, body: Value) -> RerobotsResult<AddonOutput> {
        match body.get("url") {
            Some(url) if !url.is_null() => Ok(AddonOutput::Json(url.clone())),
            _ => Err(RerobotsError::decode("mistyproxy status: missing `url`")),
        }
    }
}
