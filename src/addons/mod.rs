// ============================================================================
// File: packages/rerobots/src/addons/mod.rs
// ----------------------------------------------------------------------------
// Add-on definitions and the capability-keyed registry.
//
// Each add-on describes how to activate, query, release, and act on itself in
// terms of `ApiRequest`s; `ApiClient` routes by name and never interprets
// add-on payloads beyond that.
// ============================================================================

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use bytes::Bytes;
use serde::Serialize;
use serde_json::Value;

use crate::error::{RerobotsError, RerobotsResult};
use crate::transport::ApiRequest;

mod cam;
mod drive;
mod generic;
mod mistyproxy;

pub use cam::{CamAddon, snapshot_payload};
pub use drive::{DriveAddon, drive_payload};
pub use generic::GenericAddon;
pub use mistyproxy::MistyProxyAddon;

/// Activation state of one add-on on one instance
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AddonState {
    Inactive,
    Activating,
    Active,
    Deactivating,
}

impl AddonState {
    /// Interpret a status string reported by the service
    pub fn from_wire(raw: &str) -> RerobotsResult<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "inactive" | "notfound" | "none" | "stopped" => Ok(Self::Inactive),
            "activating" | "starting" | "pending" => Ok(Self::Activating),
            "active" | "ready" | "running" => Ok(Self::Active),
            "deactivating" | "stopping" => Ok(Self::Deactivating),
            other => Err(RerobotsError::decode(format!("unknown add-on status `{other}`"))),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Inactive => "INACTIVE",
            Self::Activating => "ACTIVATING",
            Self::Active => "ACTIVE",
            Self::Deactivating => "DEACTIVATING",
        }
    }
}

impl fmt::Display for AddonState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result envelope of an add-on action
#[derive(Debug, Clone, PartialEq)]
pub enum AddonOutput {
    /// Encoded image, passed through undecoded
    Image { format: String, data: Bytes },

    /// Add-on specific JSON result
    Json(Value),
}

impl AddonOutput {
    pub fn into_image(self) -> Option<Bytes> {
        match self {
            Self::Image { data, .. } => Some(data),
            Self::Json(_) => None,
        }
    }

    pub fn as_json(&self) -> Option<&Value> {
        match self {
            Self::Json(value) => Some(value),
            Self::Image { .. } => None,
        }
    }
}

pub(crate) fn addon_path(name: &str, lease_id: &str) -> String {
    format!("/addon/{name}/{lease_id}")
}

/// An add-on capability layered on an instance
///
/// The default request shapes cover the common activate/status/deactivate
/// routes; implementors supply the action.
pub trait Addon: Send + Sync + fmt::Debug {
    /// Registry key, also the path segment used by the service
    fn name(&self) -> &str;

    fn activate_request(&self, lease_id: &str, config: &Value) -> ApiRequest {
        let request = ApiRequest::post(addon_path(self.name(), lease_id));
        match config {
            Value::Null => request,
            Value::Object(map) if map.is_empty() => request,
            other => request.with_body(other.clone()),
        }
    }

    fn status_request(&self, lease_id: &str) -> ApiRequest {
        ApiRequest::get(addon_path(self.name(), lease_id))
    }

    fn deactivate_request(&self, lease_id: &str) -> ApiRequest {
        ApiRequest::delete(addon_path(self.name(), lease_id))
    }

    fn parse_status(&self, body: &Value) -> RerobotsResult<AddonState> {
        match body.get("status").and_then(Value::as_str) {
            Some(raw) => AddonState::from_wire(raw),
            None => Err(RerobotsError::decode(format!(
                "{} add-on status: missing `status`",
                self.name()
            ))),
        }
    }

    /// Build the request for an add-on specific action
    fn action_request(&self, lease_id: &str, payload: &Value) -> RerobotsResult<ApiRequest>;

    /// Interpret the body of a successful action
    fn parse_action(&self, body: Value) -> RerobotsResult<AddonOutput>;
}

/// Add-ons keyed by name
///
/// Names without a registration resolve to `GenericAddon`, so new service
/// add-ons are reachable before they get a dedicated type.
#[derive(Debug, Clone)]
pub struct AddonRegistry {
    addons: HashMap<String, Arc<dyn Addon>>,
}

impl AddonRegistry {
    /// Registry holding the built-in `cam`, `mistyproxy`, and `drive` add-ons
    pub fn new() -> Self {
        let mut registry = Self::empty();
        registry.register(CamAddon);
        registry.register(MistyProxyAddon);
        registry.register(DriveAddon);
        registry
    }

    pub fn empty() -> Self {
        Self {
            addons: HashMap::new(),
        }
    }

    /// Register an add-on, returning any previous one of the same name
    pub fn register<A: Addon + 'static>(&mut self, addon: A) -> Option<Arc<dyn Addon>> {
        self.addons.insert(addon.name().to_string(), Arc::new(addon))
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn Addon>> {
        self.addons.get(name).cloned()
    }

    /// Registered add-on, or the generic route for unknown names
    pub fn resolve(&self, name: &str) -> Arc<dyn Addon> {
        self.get(name)
            .unwrap_or_else(|| Arc::new(GenericAddon::new(name)))
    }

    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.addons.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }
}

impl Default for AddonRegistry {
    fn default() -> Self {
        Self::new()
    }
}
