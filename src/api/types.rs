//! Wire types for the rerobots API
//!
//! Responses are validated and defaulted here so nothing downstream inspects
//! an untyped JSON map.

use std::fmt;

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{RerobotsError, RerobotsResult};

/// Lifecycle status of a workspace instance
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum InstanceStatus {
    Init,
    InitFail,
    Ready,
    Terminating,
    Terminated,
}

impl InstanceStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Init => "INIT",
            Self::InitFail => "INIT_FAIL",
            Self::Ready => "READY",
            Self::Terminating => "TERMINATING",
            Self::Terminated => "TERMINATED",
        }
    }

    /// True once no further transition can lead to `READY`
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::InitFail | Self::Terminating | Self::Terminated)
    }
}

impl fmt::Display for InstanceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Workspace deployment snapshot
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Deployment {
    pub id: String,

    /// Workspace type, e.g. `fixed_misty2`
    #[serde(rename = "type", default)]
    pub wtype: Option<String>,

    #[serde(default)]
    pub region: Option<String>,

    #[serde(default)]
    pub supported_addons: Vec<String>,

    /// Number of pending requests ahead of a new one
    #[serde(default)]
    pub queuelen: Option<u32>,

    /// Capability granted to the requesting user
    #[serde(default)]
    pub cap: Option<String>,

    #[serde(default, with = "timestamp")]
    pub date_created: Option<DateTime<Utc>>,
}

impl Deployment {
    /// Deployment known only by identifier
    pub fn from_id<I: Into<String>>(id: I) -> Self {
        Self {
            id: id.into(),
            wtype: None,
            region: None,
            supported_addons: Vec::new(),
            queuelen: None,
            cap: None,
            date_created: None,
        }
    }

    pub fn supports_addon(&self, name: &str) -> bool {
        self.supported_addons.iter().any(|a| a == name)
    }
}

/// List entries arrive either as bare identifiers or full records
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub(crate) enum DeploymentEntry {
    Id(String),
    Record(Deployment),
}

impl From<DeploymentEntry> for Deployment {
    fn from(entry: DeploymentEntry) -> Self {
        match entry {
            DeploymentEntry::Id(id) => Deployment::from_id(id),
            DeploymentEntry::Record(deployment) => deployment,
        }
    }
}

/// Data needed to open an SSH session to a ready instance
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectionDescriptor {
    /// Transport kind tag; `sshtun` for tunneled SSH
    #[serde(rename = "type")]
    pub kind: String,
    pub ipv4: String,
    pub port: u16,
    #[serde(default)]
    pub hostkeys: Vec<String>,
}

impl ConnectionDescriptor {
    pub const SSH_TUNNEL: &'static str = "sshtun";

    pub fn is_tunneled(&self) -> bool {
        self.kind == Self::SSH_TUNNEL
    }
}

/// Workspace instance record
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Lease {
    pub id: String,
    #[serde(rename = "deployment")]
    pub deployment_id: String,
    pub status: InstanceStatus,
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub wtype: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub region: Option<String>,
    #[serde(with = "timestamp", skip_serializing_if = "Option::is_none")]
    pub starttime: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub conn: Option<ConnectionDescriptor>,
}

#[derive(Debug, Deserialize)]
struct LeaseWire {
    id: String,
    #[serde(default)]
    deployment: Option<String>,
    status: InstanceStatus,
    #[serde(rename = "type", default)]
    wtype: Option<String>,
    #[serde(default)]
    region: Option<String>,
    #[serde(default, with = "timestamp")]
    starttime: Option<DateTime<Utc>>,
    #[serde(default)]
    fwd: Option<ForwardWire>,
    #[serde(default)]
    hostkeys: Option<Vec<String>>,
    #[serde(default)]
    conn: Option<ConnectionDescriptor>,
}

#[derive(Debug, Deserialize)]
struct ForwardWire {
    #[serde(default)]
    ipv4: Option<String>,
    #[serde(default)]
    port: Option<u16>,
}

impl Lease {
    /// Validate an instance record returned by the service
    pub fn from_value(value: Value) -> RerobotsResult<Self> {
        let wire: LeaseWire = serde_json::from_value(value)
            .map_err(|e| RerobotsError::decode(format!("instance record: {e}")))?;

        let conn = match wire.fwd {
            Some(ForwardWire {
                ipv4: Some(ipv4),
                port: Some(port),
            }) => Some(ConnectionDescriptor {
                kind: ConnectionDescriptor::SSH_TUNNEL.to_string(),
                ipv4,
                port,
                hostkeys: wire.hostkeys.unwrap_or_default(),
            }),
            _ => wire.conn,
        };

        Ok(Self {
            id: wire.id,
            deployment_id: wire.deployment.unwrap_or_default(),
            status: wire.status,
            wtype: wire.wtype,
            region: wire.region,
            starttime: wire.starttime,
            conn,
        })
    }
}

/// Result of a successful lease request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LeaseGrant {
    pub id: String,
    pub deployment_id: String,
    /// Private key issued by the service for SSH access
    pub private_key: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct LeaseGrantWire {
    pub id: String,
    #[serde(default)]
    pub sshkey: Option<String>,
}

/// Lenient timestamp handling: RFC 3339, or naive `YYYY-MM-DD HH:MM[:SS[.f]]` as UTC
mod timestamp {
    use super::*;
    use serde::{Deserializer, Serializer};

    const NAIVE_FORMATS: [&str; 3] = ["%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%d %H:%M:%S", "%Y-%m-%d %H:%M"];

    pub fn parse(raw: &str) -> Option<DateTime<Utc>> {
        if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
            return Some(dt.with_timezone(&Utc));
        }
        NAIVE_FORMATS
            .iter()
            .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
            .map(|naive| naive.and_utc())
    }

    pub fn serialize<S: Serializer>(value: &Option<DateTime<Utc>>, s: S) -> Result<S::Ok, S::Error> {
        match value {
            Some(dt) => s.serialize_str(&dt.to_rfc3339()),
            None => s.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Option<DateTime<Utc>>, D::Error> {
        let raw: Option<String> = Option::deserialize(d)?;
        Ok(raw.as_deref().and_then(parse))
    }
}
