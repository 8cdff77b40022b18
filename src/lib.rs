//! Client library for the rerobots API
//!
//! Search workspace deployments, lease instances, drive them through their
//! lifecycle, manage add-ons, and reach ready instances over SSH.
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use rerobots::{ApiClient, ClientConfig, Instance, InstanceConfig, LeaseOptions, LeaseTarget};
//!
//! # fn main() -> Result<(), rerobots::RerobotsError> {
//! let api = Arc::new(ApiClient::new(&ClientConfig::from_env()));
//! let mut instance = Instance::launch(
//!     api,
//!     &LeaseTarget::types(["fixed_misty2"]),
//!     &LeaseOptions::new(),
//!     InstanceConfig::default(),
//! )?;
//! instance.wait_for_ready_default()?;
//! let (stdout, _stderr, _code) = instance.exec_command("pwd")?;
//! println!("{stdout}");
//! instance.terminate()?;
//! # Ok(())
//! # }
//! ```

pub mod addons;
pub mod api;
pub mod cli;
pub mod config;
pub mod error;
pub mod instance;
pub mod platform_utils;
pub mod ssh;
pub mod transport;

#[cfg(test)]
mod test_support;

pub use addons::{AddonOutput, AddonRegistry, AddonState};
pub use api::{
    ApiClient, ConnectionDescriptor, Deployment, DeploymentFilter, InstanceStatus, Lease,
    LeaseGrant, LeaseOptions, LeaseTarget,
};
pub use config::{ClientConfig, InstanceConfig};
pub use error::{RerobotsError, RerobotsResult};
pub use instance::{CancelToken, Instance};
pub use ssh::SshAuth;
