//! Raw drive commands for mobile workspaces

use serde_json::{Value, json};

use crate::error::{RerobotsError, RerobotsResult};
use crate::transport::ApiRequest;

use super::{Addon, AddonOutput, addon_path};

/// `drive` add-on
#[derive(Debug, Clone, Copy, Default)]
pub struct DriveAddon;

/// Action payload carrying one drive command
pub fn drive_payload(command: Value) -> Value {
    json!({ "command": command })
}

impl Addon for DriveAddon {
    fn name(&self) -> &str {
        "drive"
    }

    fn action_request(&self, lease_id: &str, payload: &Value) -> RerobotsResult<ApiRequest> {
        let command = payload.get("command").cloned().ok_or_else(|| {
            RerobotsError::invalid_state("addon_action", "drive payload has no `command`")
        })?;
        Ok(
            ApiRequest::post(format!("{}/send", addon_path(self.name(), lease_id)))
                .with_body(json!({ "command": command })),
        )
    }

    fn parse_action(&self, body: Value) -> RerobotsResult<AddonOutput> {
        Ok(AddonOutput::Json(body))
    }
}
