//! Fallback route for add-ons without a dedicated type

use serde_json::Value;

use crate::error::RerobotsResult;
use crate::transport::ApiRequest;

use super::{Addon, AddonOutput, addon_path};

/// Add-on known only by name
///
/// Actions go to `POST /addon/{name}/{instance}/action` with the payload as
/// body; results are returned as JSON.
#[derive(Debug, Clone)]
pub struct GenericAddon {
    name: String,
}

impl GenericAddon {
    pub fn new<N: Into<String>>(name: N) -> Self {
        Self { name: name.into() }
    }
}

impl Addon for GenericAddon {
    fn name(&self) -> &str {
        &self.name
    }

    fn action_request(&self, lease_id: &str, payload: &Value) -> RerobotsResult<ApiRequest> {
        Ok(
            ApiRequest::post(format!("{}/action", addon_path(&self.name, lease_id)))
                .with_body(payload.clone()),
        )
    }

    fn parse_action(&self, body: Value) -> RerobotsResult<AddonOutput> {
        Ok(AddonOutput::Json(body))
    }
}
