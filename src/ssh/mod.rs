// ============================================================================
// File: packages/rerobots/src/ssh/mod.rs
// ----------------------------------------------------------------------------
// SSH configuration and session seams for instance access.
//
// `SshConnector` opens a verified, authenticated `RemoteSession`; the instance
// controller never touches libssh2 directly, so tests can swap in a fake
// endpoint that still goes through the real host key check.
// ============================================================================

use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::RerobotsResult;

pub mod hostkey;
mod session;

pub use hostkey::{HostKey, verify_host_key};
pub use session::Ssh2Connector;

/// SSH authentication methods for instance access
#[derive(Clone)]
pub enum SshAuth {
    /// Agent-based authentication
    Agent,
    /// Key-based authentication with path to private key
    Key(PathBuf),
    /// Private key held in memory, e.g. issued by the service at launch
    KeyMaterial(String),
    /// Password authentication
    Password(String),
}

impl fmt::Debug for SshAuth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Agent => f.write_str("Agent"),
            Self::Key(path) => f.debug_tuple("Key").field(path).finish(),
            Self::KeyMaterial(_) => f.write_str("KeyMaterial(<redacted>)"),
            Self::Password(_) => f.write_str("Password(<redacted>)"),
        }
    }
}

/// Endpoint and trust anchors for one SSH session
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SshTarget {
    pub host: String,
    pub port: u16,
    pub username: String,
    /// Host keys declared by the service; the presented key must match one
    pub host_keys: Vec<String>,
    pub connect_timeout: Duration,
}

impl SshTarget {
    /// `[host]:port`, as written in known_hosts
    pub fn display_host(&self) -> String {
        format!("[{}]:{}", self.host, self.port)
    }
}

/// Opens SSH sessions
pub trait SshConnector: Send + Sync + fmt::Debug {
    /// Connect, verify the host key against `target.host_keys`, then authenticate
    ///
    /// A host key mismatch must fail before authentication.
    fn connect(&self, target: &SshTarget, auth: &SshAuth) -> RerobotsResult<Box<dyn RemoteSession>>;
}

/// An authenticated SSH session
pub trait RemoteSession: Send {
    /// Run a command to completion, returning `(stdout, stderr, exit_code)`
    fn exec(&mut self, command: &str) -> RerobotsResult<(String, String, i32)>;

    /// Open an SFTP channel; dropping it releases the channel
    fn sftp(&mut self) -> RerobotsResult<Box<dyn SftpChannel>>;

    /// Disconnect
    fn close(&mut self) -> RerobotsResult<()>;
}

/// File operations over one SFTP channel
pub trait SftpChannel {
    /// Upload a whole file, returning bytes written
    fn put(&mut self, local: &Path, remote: &Path) -> RerobotsResult<u64>;

    /// Download a whole file, returning bytes read
    fn get(&mut self, remote: &Path, local: &Path) -> RerobotsResult<u64>;

    fn list_dir(&mut self, remote: &Path) -> RerobotsResult<Vec<PathBuf>>;

    fn mkdir(&mut self, remote: &Path) -> RerobotsResult<()>;

    fn remove(&mut self, remote: &Path) -> RerobotsResult<()>;
}
