// ============================================================================
// File: packages/rerobots/src/instance/remote.rs
// ----------------------------------------------------------------------------
// SSH and SFTP access to a ready instance.
//
// Remote operations open a session on first use when none is live. The open
// is a side effect of the call: it polls status and verifies the host key
// exactly as `start_sshclient` does, and its errors propagate unchanged.
// ============================================================================

use std::path::Path;

use log::{debug, info, warn};

use crate::api::InstanceStatus;
use crate::error::{RerobotsError, RerobotsResult};
use crate::ssh::{RemoteSession, SftpChannel, SshAuth, SshTarget};

use super::Instance;

impl Instance {
    /// Open an SSH session to the instance
    ///
    /// Requires `READY` as reported by a fresh poll. The presented host key
    /// must match one declared in the connection descriptor; a mismatch is a
    /// `HostKey` error. Any previous session is closed first.
    pub fn start_sshclient(&mut self) -> RerobotsResult<()> {
        let status = self.get_status()?;
        if status != InstanceStatus::Ready {
            return Err(RerobotsError::invalid_state(
                "start_sshclient",
                format!("instance {} is {status}, not READY", self.id),
            ));
        }

        let conn = self.conn.clone().ok_or_else(|| {
            RerobotsError::invalid_state(
                "start_sshclient",
                format!("instance {} has no connection descriptor", self.id),
            )
        })?;

        self.close_session_quietly();

        let target = SshTarget {
            host: conn.ipv4,
            port: conn.port,
            username: self.config.ssh_username.clone(),
            host_keys: conn.hostkeys,
            connect_timeout: self.config.ssh_connect_timeout,
        };
        let session = self.connector.connect(&target, &self.ssh_auth())?;
        info!("SSH session open to instance {} at {}", self.id, target.display_host());
        self.session = Some(session);
        Ok(())
    }

    /// Close the live SSH session, if any
    pub fn stop_sshclient(&mut self) -> RerobotsResult<()> {
        match self.session.take() {
            Some(mut session) => {
                debug!("closing SSH session to instance {}", self.id);
                session.close()
            }
            None => Ok(()),
        }
    }

    /// Run a command and wait for it to finish
    ///
    /// Opens a session first if none is live.
    pub fn exec_command(&mut self, command: &str) -> RerobotsResult<(String, String, i32)> {
        self.ensure_session()?.exec(command)
    }

    /// Upload a whole file, opening a session first if none is live
    pub fn put_file<L: AsRef<Path>, R: AsRef<Path>>(
        &mut self,
        local_path: L,
        remote_path: R,
    ) -> RerobotsResult<u64> {
        let (local, remote) = (local_path.as_ref(), remote_path.as_ref());
        self.ensure_session()?;
        self.sftp_session(|sftp| sftp.put(local, remote))
            .map_err(|e| as_transfer(e, remote))
    }

    /// Download a whole file, opening a session first if none is live
    pub fn get_file<R: AsRef<Path>, L: AsRef<Path>>(
        &mut self,
        remote_path: R,
        local_path: L,
    ) -> RerobotsResult<u64> {
        let (remote, local) = (remote_path.as_ref(), local_path.as_ref());
        self.ensure_session()?;
        self.sftp_session(|sftp| sftp.get(remote, local))
            .map_err(|e| as_transfer(e, remote))
    }

    /// Run `f` with an SFTP channel
    ///
    /// The channel is released when `f` returns, whether it succeeded or not.
    pub fn sftp_session<T, F>(&mut self, f: F) -> RerobotsResult<T>
    where
        F: FnOnce(&mut dyn SftpChannel) -> RerobotsResult<T>,
    {
        let mut channel = self.ensure_session()?.sftp()?;
        f(channel.as_mut())
    }

    fn ensure_session(&mut self) -> RerobotsResult<&mut Box<dyn RemoteSession>> {
        if self.session.is_none() {
            debug!("no SSH session to instance {}; opening one", self.id);
            self.start_sshclient()?;
        }
        self.session.as_mut().ok_or_else(|| {
            RerobotsError::invalid_state("ssh", format!("no SSH session to instance {}", self.id))
        })
    }

    /// Close the live session, logging rather than returning a failure
    pub(crate) fn close_session_quietly(&mut self) {
        if let Some(mut session) = self.session.take()
            && let Err(e) = session.close()
        {
            warn!("closing SSH session to instance {} failed: {e}", self.id);
        }
    }

    fn ssh_auth(&self) -> SshAuth {
        if let Some(auth) = &self.config.ssh_auth {
            return auth.clone();
        }
        match &self.private_key {
            Some(key) => SshAuth::KeyMaterial(key.clone()),
            None => SshAuth::Agent,
        }
    }
}

/// Failures on an open session are reported against the remote path
fn as_transfer(err: RerobotsError, remote: &Path) -> RerobotsError {
    let details = match err {
        RerobotsError::Transfer { .. } => return err,
        RerobotsError::Ssh { details } => details,
        RerobotsError::Io(e) => e.to_string(),
        other => return other,
    };
    RerobotsError::Transfer {
        path: remote.display().to_string(),
        details,
    }
}
