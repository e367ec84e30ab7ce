use bastion_assets::{Asset, GatewayWithAuth, Label, Protocol};
use bastion_core::OrgId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use validator::Validate;

use crate::error::{ApiError, Result};

/// Health check response
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub uptime_seconds: u64,
}

/// Error response body
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ErrorResponse {
    pub error: String,
    pub status: u16,
}

/// Asset label
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct LabelDto {
    pub name: String,
    pub value: String,
}

impl From<Label> for LabelDto {
    fn from(label: Label) -> Self {
        Self {
            name: label.name,
            value: label.value,
        }
    }
}

impl From<LabelDto> for Label {
    fn from(dto: LabelDto) -> Self {
        Label::new(dto.name, dto.value)
    }
}

/// Asset as returned by the API
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct AssetResponse {
    pub id: u64,
    pub hostname: String,
    pub ip: String,
    pub port: u16,
    /// One of `ssh`, `rdp`, `telnet`, `vnc`
    pub protocol: String,
    pub public_ip: Option<String>,
    pub number: Option<String>,
    pub is_active: bool,
    pub domain: Option<u64>,
    pub admin_user: Option<u64>,
    pub nodes: Vec<u64>,
    pub labels: Vec<LabelDto>,
    pub vendor: Option<String>,
    pub model: Option<String>,
    pub sn: Option<String>,
    pub cpu_model: Option<String>,
    pub cpu_count: Option<u32>,
    pub cpu_cores: Option<u32>,
    pub cpu_vcpus: Option<u32>,
    pub memory: Option<String>,
    pub disk_total: Option<String>,
    pub disk_info: Option<String>,
    pub platform: Option<String>,
    pub os: Option<String>,
    pub os_version: Option<String>,
    pub os_arch: Option<String>,
    pub hostname_raw: Option<String>,
    pub comment: String,
    pub created_by: String,
    pub date_created: DateTime<Utc>,
    pub org_id: String,
}

impl From<Asset> for AssetResponse {
    fn from(asset: Asset) -> Self {
        let hw = asset.hardware;
        Self {
            id: asset.id,
            hostname: asset.hostname,
            ip: asset.ip,
            port: asset.port,
            protocol: asset.protocol.to_string(),
            public_ip: asset.public_ip,
            number: asset.number,
            is_active: asset.is_active,
            domain: asset.domain,
            admin_user: asset.admin_user,
            nodes: asset.nodes.into_iter().collect(),
            labels: asset.labels.into_iter().map(LabelDto::from).collect(),
            vendor: hw.vendor,
            model: hw.model,
            sn: hw.sn,
            cpu_model: hw.cpu_model,
            cpu_count: hw.cpu_count,
            cpu_cores: hw.cpu_cores,
            cpu_vcpus: hw.cpu_vcpus,
            memory: hw.memory,
            disk_total: hw.disk_total,
            disk_info: hw.disk_info,
            platform: hw.platform,
            os: hw.os,
            os_version: hw.os_version,
            os_arch: hw.os_arch,
            hostname_raw: hw.hostname_raw,
            comment: asset.comment,
            created_by: asset.created_by,
            date_created: asset.date_created,
            org_id: asset.org_id.as_str().to_string(),
        }
    }
}

/// Asset create or update payload
///
/// Hardware facts are read-only; they come from the refresh worker.
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate, ToSchema)]
pub struct AssetRequest {
    /// Required in bulk updates, ignored elsewhere
    pub id: Option<u64>,

    #[validate(length(min = 1, max = 128))]
    pub hostname: Option<String>,

    #[validate(ip)]
    pub ip: Option<String>,

    #[validate(range(min = 1))]
    pub port: Option<u16>,

    pub protocol: Option<String>,

    #[validate(ip)]
    pub public_ip: Option<String>,

    #[validate(length(max = 32))]
    pub number: Option<String>,

    pub is_active: Option<bool>,

    pub domain: Option<u64>,

    pub admin_user: Option<u64>,

    pub nodes: Option<Vec<u64>>,

    pub labels: Option<Vec<LabelDto>>,

    #[validate(length(max = 128))]
    pub comment: Option<String>,
}

/// Sets `slot` from `value`, or resets it when replacing the whole record
fn assign<T: Default>(slot: &mut T, value: Option<T>, partial: bool) {
    match value {
        Some(v) => *slot = v,
        None if !partial => *slot = T::default(),
        None => {}
    }
}

impl AssetRequest {
    /// Builds a new asset owned by `org`
    pub fn into_asset(self, org: &OrgId, created_by: &str) -> Result<Asset> {
        let mut asset = Asset::new(0, "", "").with_org(org.clone());
        asset.created_by = created_by.to_string();
        self.apply(&mut asset, false)?;
        Ok(asset)
    }

    /// Writes the payload onto `asset`
    ///
    /// With `partial` only the fields present are changed (PATCH);
    /// otherwise the payload replaces every editable field (PUT).
    pub fn apply(self, asset: &mut Asset, partial: bool) -> Result<()> {
        self.validate()?;

        if !partial {
            if self.hostname.is_none() {
                return Err(ApiError::ValidationError("hostname is required".to_string()));
            }
            if self.ip.is_none() {
                return Err(ApiError::ValidationError("ip is required".to_string()));
            }
        }

        let protocol_changed = self.protocol.is_some();
        let protocol = self.protocol.map(|p| p.parse::<Protocol>()).transpose()?;
        assign(&mut asset.protocol, protocol, partial);
        match self.port {
            Some(port) => asset.port = port,
            None if !partial || protocol_changed => asset.port = asset.protocol.default_port(),
            None => {}
        }

        assign(&mut asset.hostname, self.hostname, partial);
        assign(&mut asset.ip, self.ip, partial);
        assign(&mut asset.public_ip, self.public_ip.map(Some), partial);
        assign(&mut asset.number, self.number.map(Some), partial);
        assign(&mut asset.domain, self.domain.map(Some), partial);
        assign(&mut asset.admin_user, self.admin_user.map(Some), partial);
        assign(&mut asset.comment, self.comment, partial);
        assign(
            &mut asset.nodes,
            self.nodes.map(|n| n.into_iter().collect()),
            partial,
        );
        assign(
            &mut asset.labels,
            self.labels.map(|l| l.into_iter().map(Label::from).collect()),
            partial,
        );
        match self.is_active {
            Some(active) => asset.is_active = active,
            None if !partial => asset.is_active = true,
            None => {}
        }

        Ok(())
    }
}

/// A single object or a list of them
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum OneOrMany<T> {
    Many(Vec<T>),
    One(T),
}

/// Limit/offset page of assets
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct PaginatedAssets {
    pub count: usize,
    pub next: Option<String>,
    pub previous: Option<String>,
    pub results: Vec<AssetResponse>,
}

/// Handle of a dispatched background task
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct TaskResponse {
    pub task: String,
}

/// Gateway connection details including credentials
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct GatewayResponse {
    pub id: u64,
    pub name: String,
    pub ip: String,
    pub port: u16,
    pub protocol: String,
    pub domain: u64,
    pub username: String,
    pub password: Option<String>,
    pub private_key: Option<String>,
}

impl From<GatewayWithAuth> for GatewayResponse {
    fn from(gateway: GatewayWithAuth) -> Self {
        Self {
            id: gateway.id,
            name: gateway.name,
            ip: gateway.ip,
            port: gateway.port,
            protocol: gateway.protocol.to_string(),
            domain: gateway.domain,
            username: gateway.username,
            password: gateway.password,
            private_key: gateway.private_key,
        }
    }
}

/// Message-only response, used when an asset has no usable gateway
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct MessageResponse {
    pub msg: String,
}

/// Outcome of the inventory sync trigger
///
/// Any other keys of the remote task API response are passed through.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct SyncResponse {
    pub status: bool,
    pub msg: Option<String>,
}
