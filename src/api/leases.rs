// ============================================================================
// File: packages/rerobots/src/api/leases.rs
// ----------------------------------------------------------------------------
// Instance lease operations:
// - Lease creation with fixed or type-based deployment selection
// - Point-in-time lease inspection
// - Idempotent termination
// - Listing leases owned by the token holder
// ============================================================================

use std::time::Duration;

use log::{debug, info};
use rand::seq::SliceRandom;
use serde_json::{Map, Value};

use crate::error::{RerobotsError, RerobotsResult};
use crate::transport::ApiRequest;

use super::catalog::DeploymentFilter;
use super::types::{Lease, LeaseGrant, LeaseGrantWire};
use super::{ApiClient, field};

/// What to lease
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LeaseTarget {
    /// A specific workspace deployment
    Deployment(String),

    /// Any deployment of one of these workspace types, chosen at random
    Types(Vec<String>),

    /// A specific deployment that must have one of these types
    DeploymentOfType {
        deployment_id: String,
        types: Vec<String>,
    },
}

impl LeaseTarget {
    pub fn deployment<I: Into<String>>(id: I) -> Self {
        Self::Deployment(id.into())
    }

    pub fn types<I, T>(types: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<String>,
    {
        Self::Types(types.into_iter().map(Into::into).collect())
    }
}

/// Optional parameters of a lease request
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LeaseOptions {
    /// Requested lease duration
    pub duration: Option<Duration>,

    /// OpenSSH public key to authorize instead of a service-issued key
    pub public_key: Option<String>,
}

impl LeaseOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_duration(mut self, duration: Duration) -> Self {
        self.duration = Some(duration);
        self
    }

    pub fn with_public_key<K: Into<String>>(mut self, key: K) -> Self {
        self.public_key = Some(key.into());
        self
    }

    fn to_body(&self) -> Option<Value> {
        let mut body = Map::new();
        if let Some(key) = &self.public_key {
            body.insert("sshkey".to_string(), Value::from(key.trim()));
        }
        if let Some(duration) = self.duration {
            body.insert("expiration".to_string(), Value::from(duration.as_secs()));
        }
        (!body.is_empty()).then_some(Value::Object(body))
    }
}

impl ApiClient {
    /// Request a new instance
    ///
    /// Busy deployments surface as a `Service` error with `is_busy()` set;
    /// no retry is attempted.
    pub fn create_lease(
        &self,
        target: &LeaseTarget,
        options: &LeaseOptions,
    ) -> RerobotsResult<LeaseGrant> {
        let deployment_id = self.resolve_target(target)?;

        let mut request = ApiRequest::post(format!("/new/{deployment_id}"));
        if let Some(body) = options.to_body() {
            request = request.with_body(body);
        }

        let body = self.execute(&request, &format!("deployment {deployment_id}"))?;
        let grant: LeaseGrantWire = serde_json::from_value(body)
            .map_err(|e| RerobotsError::decode(format!("new instance: {e}")))?;

        info!("created instance {} on deployment {}", grant.id, deployment_id);
        Ok(LeaseGrant {
            id: grant.id,
            deployment_id,
            private_key: grant.sshkey,
        })
    }

    fn resolve_target(&self, target: &LeaseTarget) -> RerobotsResult<String> {
        match target {
            LeaseTarget::Deployment(id) => Ok(id.clone()),

            LeaseTarget::Types(types) => {
                let candidates = self.search(DeploymentFilter::all().with_types(types.clone()))?;
                let chosen = candidates
                    .choose(&mut rand::thread_rng())
                    .ok_or_else(|| RerobotsError::NotFound {
                        resource: format!("deployment with type in {types:?}"),
                    })?;
                debug!(
                    "selected deployment {} among {} candidates",
                    chosen.id,
                    candidates.len()
                );
                Ok(chosen.id.clone())
            }

            LeaseTarget::DeploymentOfType {
                deployment_id,
                types,
            } => {
                let deployment = self.describe(deployment_id)?;
                match &deployment.wtype {
                    Some(wtype) if types.contains(wtype) => Ok(deployment.id),
                    other => Err(RerobotsError::invalid_state(
                        "create_lease",
                        format!(
                            "deployment {deployment_id} has type {:?}, expected one of {types:?}",
                            other
                        ),
                    )),
                }
            }
        }
    }

    /// Fetch the current instance record; never cached
    pub fn get_lease(&self, lease_id: &str) -> RerobotsResult<Lease> {
        let request = ApiRequest::get(format!("/instance/{lease_id}"));
        let body = self.execute(&request, &format!("instance {lease_id}"))?;
        Lease::from_value(body)
    }

    /// Release an instance
    ///
    /// An instance that is already gone counts as terminated.
    pub fn terminate_lease(&self, lease_id: &str) -> RerobotsResult<()> {
        let request = ApiRequest::post(format!("/terminate/{lease_id}"));
        match self.execute(&request, &format!("instance {lease_id}")) {
            Ok(_) => {
                info!("terminated instance {lease_id}");
                Ok(())
            }
            Err(RerobotsError::NotFound { .. }) => {
                debug!("instance {lease_id} already gone");
                Ok(())
            }
            Err(RerobotsError::Service { message, .. })
                if message.to_lowercase().contains("already") =>
            {
                debug!("instance {lease_id} already terminated: {message}");
                Ok(())
            }
            Err(e) => Err(e),
        }
    }

    /// Identifiers of instances owned by the token holder
    pub fn list_leases(&self) -> RerobotsResult<Vec<String>> {
        let body = self.execute(&ApiRequest::get("/instances"), "instance listing")?;
        let ids = field(&body, "workspace_instances", "instance listing")?;
        serde_json::from_value(ids.clone())
            .map_err(|e| RerobotsError::decode(format!("instance listing: {e}")))
    }
}
