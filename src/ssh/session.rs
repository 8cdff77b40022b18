// ============================================================================
// File: packages/rerobots/src/ssh/session.rs
// ----------------------------------------------------------------------------
// libssh2-backed connector, session, and SFTP channel.
// ============================================================================

use std::fs::File;
use std::io::{self, Read, Write};
use std::net::{TcpStream, ToSocketAddrs};
use std::path::{Path, PathBuf};
use std::thread;
use std::time::Duration;

use log::{debug, info};
use ssh2::{Channel, Session, Sftp};

use crate::error::{RerobotsError, RerobotsResult};

use super::hostkey::{HostKey, verify_host_key};
use super::{RemoteSession, SftpChannel, SshAuth, SshConnector, SshTarget};

/// Connector using libssh2
#[derive(Debug, Clone, Copy, Default)]
pub struct Ssh2Connector;

impl SshConnector for Ssh2Connector {
    fn connect(&self, target: &SshTarget, auth: &SshAuth) -> RerobotsResult<Box<dyn RemoteSession>> {
        let host = target.display_host();
        info!("Opening SSH session to {}", host);

        let addr = (target.host.as_str(), target.port)
            .to_socket_addrs()
            .map_err(|e| RerobotsError::ssh(format!("cannot resolve {host}: {e}")))?
            .next()
            .ok_or_else(|| RerobotsError::ssh(format!("no address for {host}")))?;

        let tcp = TcpStream::connect_timeout(&addr, target.connect_timeout)
            .map_err(|e| RerobotsError::ssh(format!("TCP connection to {host} failed: {e}")))?;

        let mut session = Session::new()?;
        session.set_timeout(target.connect_timeout.as_millis().min(u32::MAX as u128) as u32);
        session.set_tcp_stream(tcp);
        session
            .handshake()
            .map_err(|e| RerobotsError::ssh(format!("SSH handshake with {host} failed: {e}")))?;

        // Trust is established before any credential leaves this process
        let presented = session
            .host_key()
            .map(|(blob, _)| HostKey::from_blob(blob))
            .ok_or_else(|| RerobotsError::ssh(format!("{host} presented no host key")))?;
        verify_host_key(&host, &presented, &target.host_keys)?;
        debug!("host key for {} verified: {}", host, presented);

        authenticate(&session, &target.username, auth)?;

        Ok(Box::new(Ssh2Session { session }))
    }
}

fn authenticate(session: &Session, username: &str, auth: &SshAuth) -> RerobotsResult<()> {
    match auth {
        SshAuth::Agent => {
            session
                .userauth_agent(username)
                .map_err(|e| RerobotsError::ssh(format!("SSH agent auth failed: {e}")))?;
        }
        SshAuth::Key(key_path) => {
            session
                .userauth_pubkey_file(username, None, key_path, None)
                .map_err(|e| RerobotsError::ssh(format!("SSH key auth failed: {e}")))?;
        }
        SshAuth::KeyMaterial(pem) => {
            // libssh2 reads keys from disk; the file is removed when dropped
            let mut key_file = tempfile::Builder::new()
                .prefix("rerobots-key-")
                .suffix(".pem")
                .tempfile()?;
            key_file.write_all(pem.as_bytes())?;
            key_file.flush()?;
            session
                .userauth_pubkey_file(username, None, key_file.path(), None)
                .map_err(|e| RerobotsError::ssh(format!("SSH key auth failed: {e}")))?;
        }
        SshAuth::Password(password) => {
            session
                .userauth_password(username, password)
                .map_err(|e| RerobotsError::ssh(format!("SSH password auth failed: {e}")))?;
        }
    }

    if !session.authenticated() {
        return Err(RerobotsError::ssh("SSH authentication failed"));
    }
    Ok(())
}

struct Ssh2Session {
    session: Session,
}

impl RemoteSession for Ssh2Session {
    fn exec(&mut self, command: &str) -> RerobotsResult<(String, String, i32)> {
        info!("Executing command on instance: {}", command);

        let mut channel = self
            .session
            .channel_session()
            .map_err(|e| RerobotsError::ssh(format!("Failed to create channel: {e}")))?;

        channel
            .exec(command)
            .map_err(|e| RerobotsError::ssh(format!("Exec failed: {e}")))?;

        // Both streams are drained together so a full stderr window cannot
        // stall stdout.
        self.session.set_blocking(false);
        let drained = drain_output(&mut channel);
        self.session.set_blocking(true);
        let (stdout, stderr) =
            drained.map_err(|e| RerobotsError::ssh(format!("Read output failed: {e}")))?;

        channel
            .wait_close()
            .map_err(|e| RerobotsError::ssh(format!("Wait close failed: {e}")))?;

        let exit_code = channel
            .exit_status()
            .map_err(|e| RerobotsError::ssh(format!("Get exit status failed: {e}")))?;

        Ok((stdout, stderr, exit_code))
    }

    fn sftp(&mut self) -> RerobotsResult<Box<dyn SftpChannel>> {
        let sftp = self
            .session
            .sftp()
            .map_err(|e| RerobotsError::ssh(format!("Failed to open SFTP channel: {e}")))?;
        Ok(Box::new(Ssh2Sftp { sftp }))
    }

    fn close(&mut self) -> RerobotsResult<()> {
        self.session
            .disconnect(None, "closing", None)
            .map_err(|e| RerobotsError::ssh(format!("Disconnect failed: {e}")))
    }
}

struct Ssh2Sftp {
    sftp: Sftp,
}

fn transfer_error<E: std::fmt::Display>(path: &Path, err: E) -> RerobotsError {
    RerobotsError::Transfer {
        path: path.display().to_string(),
        details: err.to_string(),
    }
}

impl SftpChannel for Ssh2Sftp {
    fn put(&mut self, local: &Path, remote: &Path) -> RerobotsResult<u64> {
        info!("Copying {} to instance at {}", local.display(), remote.display());

        let mut local_file = File::open(local).map_err(|e| transfer_error(local, e))?;
        let mut remote_file = self
            .sftp
            .create(remote)
            .map_err(|e| transfer_error(remote, e))?;

        let written =
            io::copy(&mut local_file, &mut remote_file).map_err(|e| transfer_error(remote, e))?;
        remote_file.flush().map_err(|e| transfer_error(remote, e))?;
        Ok(written)
    }

    fn get(&mut self, remote: &Path, local: &Path) -> RerobotsResult<u64> {
        info!("Copying {} from instance to {}", remote.display(), local.display());

        let mut remote_file = self.sftp.open(remote).map_err(|e| transfer_error(remote, e))?;
        let mut local_file = File::create(local).map_err(|e| transfer_error(local, e))?;

        io::copy(&mut remote_file, &mut local_file).map_err(|e| transfer_error(local, e))
    }

    fn list_dir(&mut self, remote: &Path) -> RerobotsResult<Vec<PathBuf>> {
        let entries = self
            .sftp
            .readdir(remote)
            .map_err(|e| transfer_error(remote, e))?;
        Ok(entries.into_iter().map(|(path, _)| path).collect())
    }

    fn mkdir(&mut self, remote: &Path) -> RerobotsResult<()> {
        self.sftp
            .mkdir(remote, 0o755)
            .map_err(|e| transfer_error(remote, e))
    }

    fn remove(&mut self, remote: &Path) -> RerobotsResult<()> {
        self.sftp.unlink(remote).map_err(|e| transfer_error(remote, e))
    }
}

/// Command output read from a non-blocking channel
trait OutputStreams {
    fn read_stdout(&mut self, buf: &mut [u8]) -> io::Result<usize>;
    fn read_stderr(&mut self, buf: &mut [u8]) -> io::Result<usize>;
    fn at_eof(&self) -> bool;
}

impl OutputStreams for Channel {
    fn read_stdout(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.read(buf)
    }

    fn read_stderr(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.stderr().read(buf)
    }

    fn at_eof(&self) -> bool {
        self.eof()
    }
}

const DRAIN_BACKOFF: Duration = Duration::from_millis(5);

/// Read one chunk into `sink`, treating `WouldBlock` as no data
fn pull(result: io::Result<usize>, buf: &[u8], sink: &mut Vec<u8>) -> io::Result<bool> {
    match result {
        Ok(0) => Ok(false),
        Ok(n) => {
            sink.extend_from_slice(&buf[..n]);
            Ok(true)
        }
        Err(e) if e.kind() == io::ErrorKind::WouldBlock => Ok(false),
        Err(e) => Err(e),
    }
}

/// Read stdout and stderr alternately until the remote end closes both
fn drain_output<S: OutputStreams>(streams: &mut S) -> io::Result<(String, String)> {
    let mut stdout = Vec::new();
    let mut stderr = Vec::new();
    let mut buf = [0u8; 8192];

    loop {
        let out = streams.read_stdout(&mut buf);
        let mut progressed = pull(out, &buf, &mut stdout)?;
        let err = streams.read_stderr(&mut buf);
        progressed |= pull(err, &buf, &mut stderr)?;

        if !progressed {
            if streams.at_eof() {
                break;
            }
            thread::sleep(DRAIN_BACKOFF);
        }
    }

    Ok((
        String::from_utf8_lossy(&stdout).into_owned(),
        String::from_utf8_lossy(&stderr).into_owned(),
    ))
}
