//! Host key parsing and verification
//!
//! Declared keys may be OpenSSH public key lines (`ssh-ed25519 AAAA...`,
//! optionally preceded by a known_hosts host field), bare base64 key blobs, or
//! `SHA256:` fingerprints.

use std::fmt;

use base64::Engine;
use base64::engine::general_purpose::{STANDARD, STANDARD_NO_PAD};
use log::error;
use sha2::{Digest, Sha256};

use crate::error::{RerobotsError, RerobotsResult};

/// Public host key presented by a server
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostKey {
    pub algorithm: String,
    pub blob: Vec<u8>,
}

impl HostKey {
    /// Build from an SSH wire-format key blob
    ///
    /// The algorithm name is read from the blob's leading length-prefixed
    /// string.
    pub fn from_blob(blob: &[u8]) -> Self {
        let algorithm = blob
            .get(..4)
            .map(|len| u32::from_be_bytes([len[0], len[1], len[2], len[3]]) as usize)
            .and_then(|len| blob.get(4..4 + len))
            .and_then(|name| std::str::from_utf8(name).ok())
            .unwrap_or("unknown")
            .to_string();

        Self {
            algorithm,
            blob: blob.to_vec(),
        }
    }

    pub fn base64(&self) -> String {
        STANDARD.encode(&self.blob)
    }

    /// OpenSSH-style `SHA256:` fingerprint
    pub fn fingerprint(&self) -> String {
        format!("SHA256:{}", STANDARD_NO_PAD.encode(Sha256::digest(&self.blob)))
    }

    /// Whether one declared key entry denotes this key
    pub fn matches(&self, declared: &str) -> bool {
        let declared = declared.trim();
        if let Some(fp) = declared.strip_prefix("SHA256:") {
            return self.fingerprint() == format!("SHA256:{}", fp.trim_end_matches('='));
        }

        let tokens: Vec<&str> = declared.split_whitespace().collect();
        tokens.iter().enumerate().any(|(i, token)| {
            let same_blob = STANDARD
                .decode(token)
                .map(|decoded| decoded == self.blob)
                .unwrap_or(false);
            if !same_blob {
                return false;
            }
            match i.checked_sub(1).map(|prev| tokens[prev]) {
                Some(alg) if looks_like_algorithm(alg) => alg == self.algorithm,
                _ => true,
            }
        })
    }
}

impl fmt::Display for HostKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.algorithm, self.fingerprint())
    }
}

fn looks_like_algorithm(token: &str) -> bool {
    ["ssh-", "ecdsa-", "sk-", "rsa-"]
        .iter()
        .any(|prefix| token.starts_with(prefix))
}

/// Fail closed unless `presented` matches one of the declared keys
///
/// An empty declaration never verifies.
pub fn verify_host_key(host: &str, presented: &HostKey, declared: &[String]) -> RerobotsResult<()> {
    if declared.iter().any(|entry| presented.matches(entry)) {
        return Ok(());
    }

    error!(
        "host key mismatch for {}: presented {}, {} declared",
        host,
        presented,
        declared.len()
    );
    Err(RerobotsError::HostKey {
        host: host.to_string(),
        presented: presented.to_string(),
    })
}

/// SSH wire-format blob for tests: algorithm string followed by key bytes
#[cfg(test)]
pub(crate) fn test_blob(algorithm: &str, key: &[u8]) -> Vec<u8> {
    let mut blob = Vec::new();
    blob.extend_from_slice(&(algorithm.len() as u32).to_be_bytes());
    blob.extend_from_slice(algorithm.as_bytes());
    blob.extend_from_slice(&(key.len() as u32).to_be_bytes());
    blob.extend_from_slice(key);
    blob
}
