// ============================================================================
// File: packages/rerobots/src/instance/addons.rs
// ----------------------------------------------------------------------------
// Add-on state tracking for one instance.
//
// Each add-on name has its own INACTIVE -> ACTIVATING -> ACTIVE ->
// DEACTIVATING -> INACTIVE machine; add-ons never affect one another or the
// instance status.
// ============================================================================

use std::thread;
use std::time::{Duration, Instant};

use log::info;
use serde_json::Value;

use crate::addons::{AddonOutput, AddonState};
use crate::error::{RerobotsError, RerobotsResult};

use super::Instance;
use super::lifecycle::MIN_POLL_INTERVAL;

impl Instance {
    /// Request activation; returns without waiting for `ACTIVE`
    pub fn activate_addon(&mut self, name: &str, config: &Value) -> RerobotsResult<()> {
        self.api.activate_addon(&self.id, name, config)?;
        self.addons.insert(name.to_string(), AddonState::Activating);
        Ok(())
    }

    /// Poll the add-on state once
    pub fn addon_status(&mut self, name: &str) -> RerobotsResult<AddonState> {
        let state = self.api.addon_status(&self.id, name)?;
        if self.addons.insert(name.to_string(), state) != Some(state) {
            info!("add-on {name} on instance {} is {state}", self.id);
        }
        Ok(state)
    }

    /// Request release of an add-on
    pub fn deactivate_addon(&mut self, name: &str) -> RerobotsResult<()> {
        self.api.deactivate_addon(&self.id, name)?;
        self.addons.insert(name.to_string(), AddonState::Deactivating);
        Ok(())
    }

    /// Perform an add-on action; the add-on must be `ACTIVE`
    pub fn addon_action(&mut self, name: &str, payload: &Value) -> RerobotsResult<AddonOutput> {
        let output = self.api.addon_action(&self.id, name, payload)?;
        self.addons.insert(name.to_string(), AddonState::Active);
        Ok(output)
    }

    /// State last observed or requested; `INACTIVE` for untouched add-ons
    pub fn addon_state(&self, name: &str) -> AddonState {
        self.addons
            .get(name)
            .copied()
            .unwrap_or(AddonState::Inactive)
    }

    /// Poll until the add-on is `ACTIVE`
    ///
    /// With `timeout` of `None` this waits as long as the add-on keeps
    /// activating. An add-on that falls back to `INACTIVE` or starts
    /// deactivating is an `InvalidState` error.
    pub fn wait_for_addon(&mut self, name: &str, timeout: Option<Duration>) -> RerobotsResult<()> {
        let interval = self.config.poll_interval.max(MIN_POLL_INTERVAL);
        let started = Instant::now();

        loop {
            match self.addon_status(name)? {
                AddonState::Active => return Ok(()),
                AddonState::Activating => {}
                state => {
                    return Err(RerobotsError::invalid_state(
                        "wait_for_addon",
                        format!("add-on {name} on instance {} is {state}", self.id),
                    ));
                }
            }

            let sleep_for = match timeout {
                Some(limit) => {
                    let elapsed = started.elapsed();
                    if elapsed >= limit {
                        return Err(RerobotsError::Timeout {
                            operation: "wait_for_addon",
                            waited: elapsed,
                        });
                    }
                    interval.min(limit - elapsed)
                }
                None => interval,
            };
            thread::sleep(sleep_for);
        }
    }
}
