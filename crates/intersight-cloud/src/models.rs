//! Request and response models for the management-service API.

use intersight_core::types::{ClaimCredential, Moid};
use serde::{Deserialize, Serialize};

/// Body of an `asset/DeviceClaims` registration.
#[derive(Debug, Clone, Serialize)]
pub struct DeviceClaimRequest {
    /// One-time claim token extracted from the device
    #[serde(rename = "SecurityToken")]
    pub security_token: String,

    /// Device serial number
    #[serde(rename = "SerialNumber")]
    pub serial_number: String,
}

impl From<&ClaimCredential> for DeviceClaimRequest {
    fn from(credential: &ClaimCredential) -> Self {
        Self {
            security_token: credential.token().to_string(),
            serial_number: credential.serial().to_string(),
        }
    }
}

/// Response of a successful `asset/DeviceClaims` registration.
#[derive(Debug, Clone, Deserialize)]
pub struct ClaimedDevice {
    /// Registration object created for the claimed device
    #[serde(rename = "Device")]
    pub device: MoRef,
}

/// Typed reference to another management-service object.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MoRef {
    /// Object type tag (e.g. "resource.Group"); responses may omit it
    #[serde(rename = "ObjectType", skip_serializing_if = "Option::is_none")]
    pub object_type: Option<String>,

    /// Referenced object Moid
    #[serde(rename = "Moid")]
    pub moid: Moid,
}

impl MoRef {
    /// A typed reference with an explicit object type.
    #[must_use]
    pub fn typed(object_type: impl Into<String>, moid: Moid) -> Self {
        Self {
            object_type: Some(object_type.into()),
            moid,
        }
    }
}

/// Generic created-object response; only the Moid is consumed.
#[derive(Debug, Clone, Deserialize)]
pub struct CreatedObject {
    /// Moid of the created object
    #[serde(rename = "Moid")]
    pub moid: Moid,
}

/// One selector expression in a resource group qualifier.
#[derive(Debug, Clone, Serialize)]
pub struct Selector {
    /// OData-style selector expression
    #[serde(rename = "Selector")]
    pub selector: String,
}

/// Body of a `resource/Groups` creation.
#[derive(Debug, Clone, Serialize)]
pub struct ResourceGroupRequest {
    /// Resource group name
    #[serde(rename = "Name")]
    pub name: String,

    /// Membership qualifier; always "Allow-Selectors" here
    #[serde(rename = "Qualifier")]
    pub qualifier: String,

    /// Selector expressions matching the group members
    #[serde(rename = "Selectors")]
    pub selectors: Vec<Selector>,
}

/// Body of an `organization/Organizations` creation.
#[derive(Debug, Clone, Serialize)]
pub struct OrganizationRequest {
    /// Organization name
    #[serde(rename = "Name")]
    pub name: String,

    /// Free-form description
    #[serde(rename = "Description")]
    pub description: String,

    /// Resource groups backing the organization
    #[serde(rename = "ResourceGroups")]
    pub resource_groups: Vec<MoRef>,
}

/// Body of an `iam/Permissions` creation.
#[derive(Debug, Clone, Serialize)]
pub struct PermissionRequest {
    /// Permission name
    #[serde(rename = "Name")]
    pub name: String,
}

/// One role row from an `iam/Roles` query.
#[derive(Debug, Clone, Deserialize)]
pub struct RoleRef {
    /// Role name
    #[serde(rename = "Name")]
    pub name: String,

    /// Role Moid
    #[serde(rename = "Moid")]
    pub moid: Moid,
}

/// Envelope of an `iam/Roles` query response.
#[derive(Debug, Clone, Deserialize)]
pub struct RoleQueryResponse {
    /// Matching roles
    #[serde(rename = "Results", default)]
    pub results: Vec<RoleRef>,
}

/// Body of an `iam/ResourceRoles` binding.
#[derive(Debug, Clone, Serialize)]
pub struct ResourceRoleRequest {
    /// Permission receiving the roles
    #[serde(rename = "Permission")]
    pub permission: MoRef,

    /// Organization the roles apply to
    #[serde(rename = "Resource")]
    pub resource: MoRef,

    /// Roles to bind
    #[serde(rename = "Roles")]
    pub roles: Vec<MoRef>,
}
