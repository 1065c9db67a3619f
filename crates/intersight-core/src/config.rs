//! Claim configuration structures and file loading.
//!
//! A claim run is driven by a single configuration file (JSON or YAML)
//! naming the management-service endpoint, the API credentials, and the
//! devices to claim.

use crate::error::{Error, Result};
use crate::types::Moid;
use secrecy::SecretString;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::debug;
use validator::Validate;

/// Top-level claim run configuration.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct ClaimConfig {
    /// Management-service API base URL (e.g. "https://intersight.com/api/v1/")
    #[validate(url)]
    pub intersight_base_url: String,

    /// API key credentials for the management service
    #[validate(nested)]
    pub intersight_authentication: ApiKeyConfig,

    /// Partner identifier used to name provisioned objects
    #[validate(length(min = 1))]
    pub partner_id: String,

    /// Names of existing roles to bind to the provisioned organization
    #[serde(default)]
    pub intersight_roles: Vec<String>,

    /// Devices to claim
    #[validate(nested)]
    pub devices: Vec<DeviceDescriptor>,
}

impl ClaimConfig {
    /// Load and validate a configuration file.
    ///
    /// `.json` files are parsed with serde_json, `.yml`/`.yaml` files with
    /// serde_yaml; any other extension is rejected.
    ///
    /// # Errors
    ///
    /// Returns a `ConfigError` if the file cannot be read, parsed, or
    /// fails validation.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        debug!(path = %path.display(), "loading claim configuration");
        let contents = std::fs::read_to_string(path).map_err(|err| {
            Error::ConfigError(format!(
                "Failed to read config file {}: {err}",
                path.display()
            ))
        })?;

        let config: Self = match path.extension().and_then(|ext| ext.to_str()) {
            Some("json") => serde_json::from_str(&contents).map_err(|err| {
                Error::ConfigError(format!("Invalid JSON config {}: {err}", path.display()))
            })?,
            Some("yml" | "yaml") => serde_yaml::from_str(&contents).map_err(|err| {
                Error::ConfigError(format!("Invalid YAML config {}: {err}", path.display()))
            })?,
            _ => {
                return Err(Error::ConfigError(format!(
                    "Unsupported file extension for configuration file: {}",
                    path.display()
                )));
            }
        };

        config
            .validate()
            .map_err(|err| Error::ConfigError(format!("Invalid configuration: {err}")))?;

        debug!(devices = config.devices.len(), "claim configuration loaded");
        Ok(config)
    }

    /// Name for the resource group provisioned for this partner.
    #[must_use]
    pub fn resource_group_name(&self) -> String {
        format!("{}-rg", self.partner_id)
    }
}

/// API key credentials for the management service.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct ApiKeyConfig {
    /// API key identifier
    #[validate(length(min = 1))]
    pub api_key_id: String,

    /// Path to the PEM-encoded secret key
    pub secret_key_filename: PathBuf,
}

/// Managed endpoint access description for one device.
///
/// Immutable input supplied by the configuration; never mutated by the
/// claim flow.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct DeviceDescriptor {
    /// Device network address
    #[validate(length(min = 1))]
    pub hostname: String,

    /// Device login username
    #[validate(length(min = 1))]
    pub username: String,

    /// Device login password
    pub password: SecretString,

    /// Desired connector access mode (true restricts to read-only)
    #[serde(default)]
    pub read_only: bool,
}

/// Selector expression matching claimed device registrations by Moid.
#[must_use]
pub fn registration_selector(moids: &[Moid]) -> String {
    let joined = moids
        .iter()
        .map(Moid::as_str)
        .collect::<Vec<_>>()
        .join(",");
    format!("/api/v1/asset/DeviceRegistrations?$filter=Moid in('{joined}')")
}
