// ============================================================================
// File: packages/rerobots/src/instance/mod.rs
// ----------------------------------------------------------------------------
// Instance controller bound to one workspace instance lease.
//
// Provides:
// - Lifecycle polling, bounded readiness waits, idempotent termination
// - Per-instance add-on state tracking
// - At most one SSH session, opened on demand from the connection descriptor
//
// One controller is driven from one thread at a time; there is no internal
// locking.
// ============================================================================

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use log::info;

use crate::addons::AddonState;
use crate::api::{
    ApiClient, ConnectionDescriptor, Deployment, InstanceStatus, Lease, LeaseOptions, LeaseTarget,
};
use crate::config::InstanceConfig;
use crate::error::RerobotsResult;
use crate::ssh::{RemoteSession, Ssh2Connector, SshConnector};

mod addons;
mod lifecycle;
mod remote;


/// Controller for one leased workspace instance
pub struct Instance {
    /// Shared API client; its token outlives this controller
    pub(crate) api: Arc<ApiClient>,

    /// Opens SSH sessions to the instance
    pub(crate) connector: Arc<dyn SshConnector>,

    pub(crate) config: InstanceConfig,

    pub(crate) id: String,

    pub(crate) deployment_id: String,

    /// Status observed by the last poll
    pub(crate) status: InstanceStatus,

    /// Instance record from the last poll
    pub(crate) lease: Option<Lease>,

    /// Pinned once first observed
    pub(crate) conn: Option<ConnectionDescriptor>,

    /// Key issued by the service at lease creation
    pub(crate) private_key: Option<String>,

    /// Add-on states last observed or requested
    pub(crate) addons: HashMap<String, AddonState>,

    /// The single live SSH session, if any
    pub(crate) session: Option<Box<dyn RemoteSession>>,
}

impl Instance {
    /// Request a new instance and bind a controller to it
    ///
    /// The controller starts in `INIT`; call `wait_for_ready` before using SSH.
    pub fn launch(
        api: Arc<ApiClient>,
        target: &LeaseTarget,
        options: &LeaseOptions,
        config: InstanceConfig,
    ) -> RerobotsResult<Self> {
        let grant = api.create_lease(target, options)?;
        let mut instance = Self::bind(api, grant.id, grant.deployment_id, config);
        instance.private_key = grant.private_key;
        Ok(instance)
    }

    /// Bind a controller to an existing instance
    ///
    /// The initial status is whatever the service reports now.
    pub fn attach(
        api: Arc<ApiClient>,
        instance_id: &str,
        config: InstanceConfig,
    ) -> RerobotsResult<Self> {
        let lease = api.get_lease(instance_id)?;
        let mut instance = Self::bind(
            api,
            lease.id.clone(),
            lease.deployment_id.clone(),
            config,
        );
        instance.observe(lease);
        Ok(instance)
    }

    fn bind(api: Arc<ApiClient>, id: String, deployment_id: String, config: InstanceConfig) -> Self {
        info!("binding controller to instance {id}");
        Self {
            api,
            connector: Arc::new(Ssh2Connector),
            config,
            id,
            deployment_id,
            status: InstanceStatus::Init,
            lease: None,
            conn: None,
            private_key: None,
            addons: HashMap::new(),
            session: None,
        }
    }

    /// Use a different SSH connector
    pub fn with_connector(mut self, connector: Arc<dyn SshConnector>) -> Self {
        self.connector = connector;
        self
    }

    /// Authenticate SSH with this private key
    pub fn with_private_key<K: Into<String>>(mut self, key: K) -> Self {
        self.private_key = Some(key.into());
        self
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn deployment_id(&self) -> &str {
        &self.deployment_id
    }

    /// Status as of the last poll; does not contact the service
    pub fn status(&self) -> InstanceStatus {
        self.status
    }

    /// Connection descriptor, once observed
    pub fn connection(&self) -> Option<&ConnectionDescriptor> {
        self.conn.as_ref()
    }

    /// Private key issued at lease creation, if any
    pub fn private_key(&self) -> Option<&str> {
        self.private_key.as_deref()
    }

    pub fn config(&self) -> &InstanceConfig {
        &self.config
    }

    /// Detail of the deployment backing this instance
    pub fn deployment_info(&self) -> RerobotsResult<Deployment> {
        self.api.describe(&self.deployment_id)
    }

    pub fn has_session(&self) -> bool {
        self.session.is_some()
    }
}

impl fmt::Debug for Instance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Instance")
            .field("id", &self.id)
            .field("deployment_id", &self.deployment_id)
            .field("status", &self.status)
            .field("conn", &self.conn)
            .field("addons", &self.addons)
            .field("session_open", &self.session.is_some())
            .finish_non_exhaustive()
    }
}

/// Shared flag for abandoning a wait from another thread
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}
