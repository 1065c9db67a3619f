//! Wire records of the device connector API.

use serde::Deserialize;

/// Record returned by the `DeviceIdentifiers` resource.
#[derive(Debug, Clone, Deserialize)]
pub struct DeviceIdentifier {
    /// Device serial / unique identifier
    #[serde(rename = "Id")]
    pub id: String,
}

/// Record returned by the `SecurityTokens` resource.
///
/// Tokens are one-time claim codes; the connector invalidates them once
/// consumed by a claim registration.
#[derive(Debug, Clone, Deserialize)]
pub struct SecurityToken {
    /// One-time claim token
    #[serde(rename = "Token")]
    pub token: String,

    /// Remaining token validity, in minutes, when reported
    #[serde(rename = "Duration", default)]
    pub duration: Option<i64>,
}
