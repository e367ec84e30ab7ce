//! Asset inventory records

use bastion_core::{AdminUserId, AssetId, DomainId, GatewayId, NodeId, OrgId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use crate::error::AssetError;

/// Connection protocol of an asset or gateway
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Protocol {
    #[default]
    Ssh,
    Rdp,
    Telnet,
    Vnc,
}

impl Protocol {
    /// Default port for the protocol
    pub fn default_port(&self) -> u16 {
        match self {
            Protocol::Ssh => 22,
            Protocol::Rdp => 3389,
            Protocol::Telnet => 23,
            Protocol::Vnc => 5901,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Protocol::Ssh => "ssh",
            Protocol::Rdp => "rdp",
            Protocol::Telnet => "telnet",
            Protocol::Vnc => "vnc",
        }
    }
}

impl fmt::Display for Protocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Protocol {
    type Err = AssetError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "ssh" => Ok(Protocol::Ssh),
            "rdp" => Ok(Protocol::Rdp),
            "telnet" => Ok(Protocol::Telnet),
            "vnc" => Ok(Protocol::Vnc),
            other => Err(AssetError::InvalidInput(format!("unknown protocol '{}'", other))),
        }
    }
}

/// Key/value label attached to an asset
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Label {
    pub name: String,
    pub value: String,
}

impl Label {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }
}

impl FromStr for Label {
    type Err = AssetError;

    /// Parses the `name:value` form used by the `label` query parameter
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.split_once(':') {
            Some((name, value)) if !name.is_empty() => Ok(Label::new(name, value)),
            _ => Err(AssetError::InvalidInput(format!(
                "label must be 'name:value', got '{}'",
                s
            ))),
        }
    }
}

/// Hardware facts reported by the refresh worker
///
/// All fields are optional: they stay empty until the first refresh
/// completes.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HardwareInfo {
    pub vendor: Option<String>,
    pub model: Option<String>,
    pub sn: Option<String>,
    pub cpu_model: Option<String>,
    pub cpu_count: Option<u32>,
    pub cpu_cores: Option<u32>,
    pub cpu_vcpus: Option<u32>,
    /// Memory as reported, e.g. "15.5 G"
    pub memory: Option<String>,
    pub disk_total: Option<String>,
    pub disk_info: Option<String>,
    pub platform: Option<String>,
    pub os: Option<String>,
    pub os_version: Option<String>,
    pub os_arch: Option<String>,
    pub hostname_raw: Option<String>,
}

/// A managed host
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Asset {
    pub id: AssetId,

    pub hostname: String,

    pub ip: String,

    pub port: u16,

    #[serde(default)]
    pub protocol: Protocol,

    #[serde(default)]
    pub public_ip: Option<String>,

    /// Asset number from the purchasing system
    #[serde(default)]
    pub number: Option<String>,

    #[serde(default = "default_active")]
    pub is_active: bool,

    /// Network domain the asset lives in; gateways are picked from it
    #[serde(default)]
    pub domain: Option<DomainId>,

    #[serde(default)]
    pub admin_user: Option<AdminUserId>,

    /// Node memberships, possibly empty
    #[serde(default)]
    pub nodes: BTreeSet<NodeId>,

    #[serde(default)]
    pub labels: Vec<Label>,

    #[serde(flatten)]
    pub hardware: HardwareInfo,

    #[serde(default)]
    pub comment: String,

    #[serde(default)]
    pub created_by: String,

    #[serde(default = "Utc::now")]
    pub date_created: DateTime<Utc>,

    #[serde(default)]
    pub org_id: OrgId,
}

fn default_active() -> bool {
    true
}

impl Asset {
    /// Create an SSH asset in the default organization
    pub fn new(id: AssetId, hostname: impl Into<String>, ip: impl Into<String>) -> Self {
        Self {
            id,
            hostname: hostname.into(),
            ip: ip.into(),
            port: Protocol::Ssh.default_port(),
            protocol: Protocol::Ssh,
            public_ip: None,
            number: None,
            is_active: true,
            domain: None,
            admin_user: None,
            nodes: BTreeSet::new(),
            labels: Vec::new(),
            hardware: HardwareInfo::default(),
            comment: String::new(),
            created_by: String::new(),
            date_created: Utc::now(),
            org_id: OrgId::default(),
        }
    }

    /// Set node memberships
    pub fn with_nodes(mut self, nodes: impl IntoIterator<Item = NodeId>) -> Self {
        self.nodes = nodes.into_iter().collect();
        self
    }

    pub fn with_admin_user(mut self, admin_user: AdminUserId) -> Self {
        self.admin_user = Some(admin_user);
        self
    }

    pub fn with_domain(mut self, domain: DomainId) -> Self {
        self.domain = Some(domain);
        self
    }

    pub fn with_protocol(mut self, protocol: Protocol) -> Self {
        self.protocol = protocol;
        self.port = protocol.default_port();
        self
    }

    pub fn with_label(mut self, label: Label) -> Self {
        self.labels.push(label);
        self
    }

    pub fn with_org(mut self, org_id: impl Into<OrgId>) -> Self {
        self.org_id = org_id.into();
        self
    }

    /// Whether the asset belongs to no node at all
    pub fn is_unassigned(&self) -> bool {
        self.nodes.is_empty()
    }
}

/// Privileged account used to manage assets
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdminUser {
    pub id: AdminUserId,
    pub name: String,
    pub username: String,
    #[serde(default)]
    pub org_id: OrgId,
}

impl AdminUser {
    pub fn new(id: AdminUserId, name: impl Into<String>, username: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            username: username.into(),
            org_id: OrgId::default(),
        }
    }
}

/// Jump host brokering connections into a domain
///
/// Credentials are accepted on input but never serialized; use
/// [`GatewayWithAuth`] to hand them to a connecting client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Gateway {
    pub id: GatewayId,
    pub name: String,
    pub ip: String,
    pub port: u16,
    #[serde(default)]
    pub protocol: Protocol,
    pub username: String,
    #[serde(default, skip_serializing)]
    pub password: Option<String>,
    #[serde(default, skip_serializing)]
    pub private_key: Option<String>,
}

impl Gateway {
    pub fn new(id: GatewayId, name: impl Into<String>, ip: impl Into<String>, protocol: Protocol) -> Self {
        Self {
            id,
            name: name.into(),
            ip: ip.into(),
            port: protocol.default_port(),
            protocol,
            username: String::new(),
            password: None,
            private_key: None,
        }
    }

    pub fn with_credentials(
        mut self,
        username: impl Into<String>,
        password: Option<String>,
        private_key: Option<String>,
    ) -> Self {
        self.username = username.into();
        self.password = password;
        self.private_key = private_key;
        self
    }
}

/// Gateway connection payload including authentication material
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GatewayWithAuth {
    pub id: GatewayId,
    pub name: String,
    pub ip: String,
    pub port: u16,
    pub protocol: Protocol,
    pub domain: DomainId,
    pub username: String,
    pub password: Option<String>,
    pub private_key: Option<String>,
}

impl GatewayWithAuth {
    pub fn new(gateway: &Gateway, domain: DomainId) -> Self {
        Self {
            id: gateway.id,
            name: gateway.name.clone(),
            ip: gateway.ip.clone(),
            port: gateway.port,
            protocol: gateway.protocol,
            domain,
            username: gateway.username.clone(),
            password: gateway.password.clone(),
            private_key: gateway.private_key.clone(),
        }
    }
}

/// Network domain grouping gateways
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Domain {
    pub id: DomainId,
    pub name: String,
    #[serde(default)]
    pub gateways: Vec<Gateway>,
    #[serde(default)]
    pub org_id: OrgId,
}

impl Domain {
    pub fn new(id: DomainId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            gateways: Vec::new(),
            org_id: OrgId::default(),
        }
    }

    pub fn with_gateway(mut self, gateway: Gateway) -> Self {
        self.gateways.push(gateway);
        self
    }

    /// Gateways speaking the given protocol
    pub fn gateways_for(&self, protocol: Protocol) -> Vec<&Gateway> {
        self.gateways.iter().filter(|g| g.protocol == protocol).collect()
    }
}
