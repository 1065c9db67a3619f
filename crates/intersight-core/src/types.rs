//! Core domain types for device claiming.
//!
//! This module provides the device connector state model (status snapshots
//! and their state enumerations), the one-time claim credential, and the
//! Moid identifier used by the management service.

use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Connection state reported by the device connector.
///
/// The connector reports free-form strings; the two values the claim flow
/// acts on are modeled explicitly and everything else is preserved as-is.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(from = "String")]
pub enum ConnectionState {
    /// Connector has a live channel to the management service
    Connected,
    /// Connector is establishing its channel
    Connecting,
    /// Any other state reported by the connector
    Other(String),
}

impl ConnectionState {
    /// Returns the state as reported by the connector.
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::Connected => "Connected",
            Self::Connecting => "Connecting",
            Self::Other(state) => state,
        }
    }

    /// Returns true once the connector has a live channel.
    #[must_use]
    pub const fn is_connected(&self) -> bool {
        matches!(self, Self::Connected)
    }
}

impl From<String> for ConnectionState {
    fn from(state: String) -> Self {
        match state.as_str() {
            "Connected" => Self::Connected,
            "Connecting" => Self::Connecting,
            _ => Self::Other(state),
        }
    }
}

impl Default for ConnectionState {
    fn default() -> Self {
        Self::Other(String::new())
    }
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Account ownership state reported by the device connector.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(from = "String")]
pub enum OwnershipState {
    /// Device is already claimed by an account
    Claimed,
    /// Device is not claimed by any account
    NotClaimed,
    /// Any other state reported by the connector
    Other(String),
}

impl OwnershipState {
    /// Returns the state as reported by the connector.
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::Claimed => "Claimed",
            Self::NotClaimed => "Not Claimed",
            Self::Other(state) => state,
        }
    }

    /// Returns true when the device is already claimed by an account.
    #[must_use]
    pub const fn is_claimed(&self) -> bool {
        matches!(self, Self::Claimed)
    }
}

impl From<String> for OwnershipState {
    fn from(state: String) -> Self {
        match state.as_str() {
            "Claimed" => Self::Claimed,
            "Not Claimed" | "NotClaimed" => Self::NotClaimed,
            _ => Self::Other(state),
        }
    }
}

impl Default for OwnershipState {
    fn default() -> Self {
        Self::Other(String::new())
    }
}

impl fmt::Display for OwnershipState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Point-in-time snapshot of the device connector's Systems resource.
///
/// Every status query produces a fresh snapshot; snapshots are never merged
/// across queries.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "PascalCase")]
pub struct ConnectorStatus {
    /// Whether the connector is administratively enabled
    #[serde(default)]
    pub admin_state: bool,

    /// Current channel state toward the management service
    #[serde(default)]
    pub connection_state: ConnectionState,

    /// Whether some account already owns this device
    #[serde(default, rename = "AccountOwnershipState")]
    pub ownership_state: OwnershipState,

    /// Whether the connector is in read-only access mode
    #[serde(default)]
    pub read_only_mode: bool,
}

/// One-time claim credential extracted from a device connector.
///
/// Constructed only when both the identifier and the security token were
/// fetched successfully; consumed once by the claim registration call.
#[derive(Debug, Clone)]
pub struct ClaimCredential {
    serial: String,
    token: SecretString,
}

impl ClaimCredential {
    /// Create a credential from the device identifier and security token.
    #[must_use]
    pub fn new(serial: impl Into<String>, token: impl Into<String>) -> Self {
        Self {
            serial: serial.into(),
            token: SecretString::from(token.into()),
        }
    }

    /// Device serial / unique identifier.
    #[must_use]
    pub fn serial(&self) -> &str {
        &self.serial
    }

    /// One-time security token.
    #[must_use]
    pub fn token(&self) -> &str {
        self.token.expose_secret()
    }
}

/// Management-service object identifier (Moid).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Moid(String);

impl Moid {
    /// Wrap a raw Moid string.
    #[must_use]
    pub fn new(moid: impl Into<String>) -> Self {
        Self(moid.into())
    }

    /// Returns the Moid as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<String> for Moid {
    fn from(moid: String) -> Self {
        Self(moid)
    }
}

impl fmt::Display for Moid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
