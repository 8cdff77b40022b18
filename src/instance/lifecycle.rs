// ============================================================================
// File: packages/rerobots/src/instance/lifecycle.rs
// ----------------------------------------------------------------------------
// Instance lifecycle operations:
// - Single status polls and detail refresh
// - Bounded, optionally cancellable readiness waits
// - Idempotent termination
// ============================================================================

use std::thread;
use std::time::{Duration, Instant};

use log::{debug, info, warn};

use crate::api::{InstanceStatus, Lease};
use crate::error::{RerobotsError, RerobotsResult};

use super::{CancelToken, Instance};

/// Floor for the polling interval so a zero interval cannot busy-poll
pub(crate) const MIN_POLL_INTERVAL: Duration = Duration::from_millis(10);

impl Instance {
    /// Poll the service once and return the current status
    pub fn get_status(&mut self) -> RerobotsResult<InstanceStatus> {
        let lease = self.api.get_lease(&self.id)?;
        self.observe(lease);
        Ok(self.status)
    }

    /// Poll the service once and return the full instance record
    ///
    /// The record carries the pinned connection descriptor, not whatever
    /// the service reported on this poll.
    pub fn get_details(&mut self) -> RerobotsResult<Lease> {
        let lease = self.api.get_lease(&self.id)?;
        self.observe(lease);
        self.lease.clone().ok_or_else(|| {
            RerobotsError::invalid_state(
                "get_details",
                format!("no record for instance {}", self.id),
            )
        })
    }

    /// Record a freshly fetched instance record
    pub(crate) fn observe(&mut self, mut lease: Lease) {
        if lease.status != self.status {
            info!(
                "instance {} status {} -> {}",
                self.id, self.status, lease.status
            );
            self.status = lease.status;
        }

        match (&self.conn, &lease.conn) {
            (None, Some(conn)) => {
                debug!(
                    "instance {} reachable at {}:{}",
                    self.id, conn.ipv4, conn.port
                );
                self.conn = Some(conn.clone());
            }
            (Some(pinned), Some(conn)) if pinned != conn => {
                warn!(
                    "instance {} reported a different connection descriptor; keeping the first",
                    self.id
                );
            }
            _ => {}
        }

        if self.conn.is_some() {
            lease.conn = self.conn.clone();
        }
        self.lease = Some(lease);
    }

    /// Block until the instance is `READY`
    ///
    /// Polls every `poll_interval`. Fails with `InstanceFailure` on
    /// `INIT_FAIL`, `InvalidState` if the instance is being or has been
    /// terminated, and `Timeout` once `timeout` elapses.
    pub fn wait_for_ready(&mut self, poll_interval: Duration, timeout: Duration) -> RerobotsResult<()> {
        self.poll_until_ready(poll_interval, timeout, None)
    }

    /// `wait_for_ready` with the interval and timeout from `InstanceConfig`
    pub fn wait_for_ready_default(&mut self) -> RerobotsResult<()> {
        let (interval, timeout) = (self.config.poll_interval, self.config.ready_timeout);
        self.poll_until_ready(interval, timeout, None)
    }

    /// `wait_for_ready` that also gives up once `cancel` is set
    ///
    /// The token is checked before each poll and after each sleep.
    pub fn wait_for_ready_or_cancel(
        &mut self,
        poll_interval: Duration,
        timeout: Duration,
        cancel: &CancelToken,
    ) -> RerobotsResult<()> {
        self.poll_until_ready(poll_interval, timeout, Some(cancel))
    }

    fn poll_until_ready(
        &mut self,
        poll_interval: Duration,
        timeout: Duration,
        cancel: Option<&CancelToken>,
    ) -> RerobotsResult<()> {
        let interval = poll_interval.max(MIN_POLL_INTERVAL);
        let started = Instant::now();

        loop {
            if cancel.is_some_and(CancelToken::is_cancelled) {
                return Err(RerobotsError::Cancelled {
                    operation: "wait_for_ready",
                });
            }

            match self.get_status()? {
                InstanceStatus::Ready => return Ok(()),
                InstanceStatus::InitFail => {
                    return Err(RerobotsError::InstanceFailure {
                        instance_id: self.id.clone(),
                        status: InstanceStatus::InitFail.to_string(),
                    });
                }
                status @ (InstanceStatus::Terminating | InstanceStatus::Terminated) => {
                    return Err(RerobotsError::invalid_state(
                        "wait_for_ready",
                        format!("instance {} is {status}", self.id),
                    ));
                }
                InstanceStatus::Init => {}
            }

            let elapsed = started.elapsed();
            if elapsed >= timeout {
                return Err(RerobotsError::Timeout {
                    operation: "wait_for_ready",
                    waited: elapsed,
                });
            }
            thread::sleep(interval.min(timeout - elapsed));
        }
    }

    /// Release the instance
    ///
    /// Closes any live SSH session first; a close failure is logged and
    /// termination proceeds. Once the instance is known to be terminated,
    /// no further request is sent. If the service refuses, the previous
    /// status is kept.
    pub fn terminate(&mut self) -> RerobotsResult<()> {
        self.close_session_quietly();

        if self.status == InstanceStatus::Terminated {
            debug!("instance {} already terminated", self.id);
            self.addons.clear();
            return Ok(());
        }

        let previous = self.status;
        self.status = InstanceStatus::Terminating;
        if let Err(err) = self.api.terminate_lease(&self.id) {
            self.status = previous;
            return Err(err);
        }
        self.status = InstanceStatus::Terminated;
        self.addons.clear();
        Ok(())
    }
}
