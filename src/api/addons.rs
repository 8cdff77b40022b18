// ============================================================================
// File: packages/rerobots/src/api/addons.rs
// ----------------------------------------------------------------------------
// Add-on operations on an instance, routed through the add-on registry.
// ============================================================================

use log::{debug, info};
use serde_json::Value;

use crate::addons::{AddonOutput, AddonState};
use crate::error::{RerobotsError, RerobotsResult};

use super::ApiClient;

impl ApiClient {
    /// Begin activating an add-on; does not wait for it to become active
    pub fn activate_addon(
        &self,
        lease_id: &str,
        addon_name: &str,
        addon_config: &Value,
    ) -> RerobotsResult<()> {
        let addon = self.addons().resolve(addon_name);
        let request = addon.activate_request(lease_id, addon_config);
        self.execute(&request, &format!("instance {lease_id}"))?;
        info!("activating add-on {addon_name} on instance {lease_id}");
        Ok(())
    }

    /// Current activation state of an add-on
    ///
    /// An add-on the service has no record of is `Inactive`.
    pub fn addon_status(&self, lease_id: &str, addon_name: &str) -> RerobotsResult<AddonState> {
        let addon = self.addons().resolve(addon_name);
        let response = self.send(&addon.status_request(lease_id))?;

        if response.status == http::StatusCode::NOT_FOUND {
            debug!("no {addon_name} add-on record on instance {lease_id}");
            return Ok(AddonState::Inactive);
        }
        if !response.is_success() {
            return Err(super::classify(
                &response,
                &format!("{addon_name} add-on on instance {lease_id}"),
            ));
        }
        addon.parse_status(&response.body)
    }

    /// Release an add-on
    pub fn deactivate_addon(&self, lease_id: &str, addon_name: &str) -> RerobotsResult<()> {
        let addon = self.addons().resolve(addon_name);
        let request = addon.deactivate_request(lease_id);
        self.execute(
            &request,
            &format!("{addon_name} add-on on instance {lease_id}"),
        )?;
        info!("deactivating add-on {addon_name} on instance {lease_id}");
        Ok(())
    }

    /// Perform an add-on specific request
    ///
    /// Checks the add-on status first; anything but `Active` is an
    /// `InvalidState` error and no action request is sent.
    pub fn addon_action(
        &self,
        lease_id: &str,
        addon_name: &str,
        payload: &Value,
    ) -> RerobotsResult<AddonOutput> {
        let state = self.addon_status(lease_id, addon_name)?;
        if state != AddonState::Active {
            return Err(RerobotsError::invalid_state(
                "addon_action",
                format!("{addon_name} add-on on instance {lease_id} is {state}, not ACTIVE"),
            ));
        }

        let addon = self.addons().resolve(addon_name);
        let request = addon.action_request(lease_id, payload)?;
        let body = self.execute(
            &request,
            &format!("{addon_name} add-on on instance {lease_id}"),
        )?;
        addon.parse_action(body)
    }
}
