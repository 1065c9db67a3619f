//! Asynchronous management-service client.
//!
//! One-shot calls only: the claim registration and the provisioning
//! operations are not retried here, unlike device connector traffic.

use crate::models::{
    ClaimedDevice, CreatedObject, DeviceClaimRequest, MoRef, OrganizationRequest,
    PermissionRequest, ResourceGroupRequest, ResourceRoleRequest, RoleQueryResponse, RoleRef,
    Selector,
};
use crate::Result;
use intersight_core::client::{ClientConfig, CLOUD_DEFAULT_TIMEOUT};
use intersight_core::config::registration_selector;
use intersight_core::types::{ClaimCredential, Moid};
use intersight_core::Error;
use reqwest::{Client, ClientBuilder, Method};
use secrecy::{ExposeSecret, SecretString};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::time::Duration;
use tracing::{debug, info};
use url::Url;

const USER_AGENT: &str = concat!("intersight-cloud/", env!("CARGO_PKG_VERSION"));

/// API key credential presented on every management-service request.
///
/// The key id and secret are sent as headers; request signing with the
/// secret key is not performed here.
#[derive(Clone)]
struct ApiKeyAuth {
    key_id: String,
    secret: SecretString,
}

/// Builder for [`CloudClient`].
pub struct CloudClientBuilder {
    base_url: String,
    http_config: ClientConfig,
    auth: Option<ApiKeyAuth>,
}

impl CloudClientBuilder {
    /// Create a builder for the specified API base URL.
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            http_config: ClientConfig::new()
                .with_timeout(Duration::from_secs(CLOUD_DEFAULT_TIMEOUT)),
            auth: None,
        }
    }

    /// Configure API key credentials.
    #[must_use]
    pub fn with_api_key(mut self, key_id: impl Into<String>, secret: SecretString) -> Self {
        self.auth = Some(ApiKeyAuth {
            key_id: key_id.into(),
            secret,
        });
        self
    }

    /// Override the HTTP client configuration.
    #[must_use]
    pub fn with_http_config(mut self, config: ClientConfig) -> Self {
        self.http_config = config;
        self
    }

    /// Build the client.
    pub fn build(self) -> Result<CloudClient> {
        let mut base = self.base_url;
        if !base.ends_with('/') {
            base.push('/');
        }
        let base_url = Url::parse(&base)
            .map_err(|err| Error::InvalidEndpoint(format!("Invalid service URL `{base}`: {err}")))?;

        let http = ClientBuilder::new()
            .user_agent(USER_AGENT)
            .timeout(self.http_config.timeout)
            .pool_idle_timeout(self.http_config.pool_idle_timeout)
            .pool_max_idle_per_host(self.http_config.pool_max_idle_per_host)
            .build()
            .map_err(|err| {
                Error::ConfigError(format!("Failed to build service HTTP client: {err}"))
            })?;

        Ok(CloudClient {
            http,
            base_url,
            auth: self.auth,
        })
    }
}

/// Asynchronous management-service client.
#[derive(Clone)]
pub struct CloudClient {
    http: Client,
    base_url: Url,
    auth: Option<ApiKeyAuth>,
}

impl CloudClient {
    /// Return the API base URL.
    #[must_use]
    pub const fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Register a device claim from an extracted credential.
    pub async fn claim_device(&self, credential: &ClaimCredential) -> Result<ClaimedDevice> {
        let request = DeviceClaimRequest::from(credential);
        let claimed: ClaimedDevice = self
            .post_json("asset/DeviceClaims", &request)
            .await?;
        info!(
            serial = %request.serial_number,
            moid = %claimed.device.moid,
            "device claim registered"
        );
        Ok(claimed)
    }

    /// Create a resource group selecting the given device registrations.
    pub async fn create_resource_group(&self, name: &str, devices: &[Moid]) -> Result<Moid> {
        let request = ResourceGroupRequest {
            name: name.to_string(),
            qualifier: "Allow-Selectors".to_string(),
            selectors: vec![Selector {
                selector: registration_selector(devices),
            }],
        };
        let created: CreatedObject = self.post_json("resource/Groups", &request).await?;
        info!(name, moid = %created.moid, "resource group created");
        Ok(created.moid)
    }

    /// Create an organization backed by a resource group.
    pub async fn create_organization(&self, name: &str, resource_group: Moid) -> Result<Moid> {
        let request = OrganizationRequest {
            name: name.to_string(),
            description: format!("Org for {name}"),
            resource_groups: vec![MoRef::typed("resource.Group", resource_group)],
        };
        let created: CreatedObject = self
            .post_json("organization/Organizations", &request)
            .await?;
        info!(name, moid = %created.moid, "organization created");
        Ok(created.moid)
    }

    /// Create a permission to carry role bindings.
    pub async fn create_permission(&self, name: &str) -> Result<Moid> {
        let request = PermissionRequest {
            name: name.to_string(),
        };
        let created: CreatedObject = self.post_json("iam/Permissions", &request).await?;
        info!(name, moid = %created.moid, "permission created");
        Ok(created.moid)
    }

    /// Look up existing roles by name.
    pub async fn find_roles(&self, names: &[String]) -> Result<Vec<RoleRef>> {
        let filter = format!("Name in ({})", names.join(","));
        let params = [
            ("$select", "Name,Moid".to_string()),
            ("$filter", filter),
        ];
        let response: RoleQueryResponse = self.get_json("iam/Roles", &params).await?;
        debug!(found = response.results.len(), requested = names.len(), "roles resolved");
        Ok(response.results)
    }

    /// Bind roles to an organization through a permission.
    pub async fn bind_roles(
        &self,
        permission: Moid,
        organization: Moid,
        roles: &[RoleRef],
    ) -> Result<Moid> {
        let request = ResourceRoleRequest {
            permission: MoRef::typed("iam.Permission", permission),
            resource: MoRef::typed("organization.Organization", organization),
            roles: roles
                .iter()
                .map(|role| MoRef::typed("iam.Role", role.moid.clone()))
                .collect(),
        };
        let created: CreatedObject = self.post_json("iam/ResourceRoles", &request).await?;
        info!(moid = %created.moid, "roles bound");
        Ok(created.moid)
    }

    async fn get_json<R>(&self, path: &str, params: &[(&'static str, String)]) -> Result<R>
    where
        R: DeserializeOwned,
    {
        self.send_json::<(), R>(Method::GET, path, None, params)
            .await
    }

    async fn post_json<B, R>(&self, path: &str, body: &B) -> Result<R>
    where
        B: Serialize + ?Sized,
        R: DeserializeOwned,
    {
        self.send_json(Method::POST, path, Some(body), &[]).await
    }

    async fn send_json<B, R>(
        &self,
        method: Method,
        path: &str,
        body: Option<&B>,
        params: &[(&'static str, String)],
    ) -> Result<R>
    where
        B: Serialize + ?Sized,
        R: DeserializeOwned,
    {
        let url = self.base_url.join(path).map_err(|err| {
            Error::InvalidEndpoint(format!("Invalid service path `{path}`: {err}"))
        })?;

        let mut request = self
            .http
            .request(method.clone(), url.clone())
            .header("Accept", "application/json");
        if !params.is_empty() {
            request = request.query(params);
        }
        if let Some(auth) = &self.auth {
            request = request
                .header("X-Api-Key-Id", &auth.key_id)
                .header("X-Api-Secret", auth.secret.expose_secret());
        }
        if let Some(payload) = body {
            request = request.json(payload);
        }

        debug!(%method, %url, "sending management-service request");
        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(Error::api(method.as_str(), url.as_str(), status.as_u16()));
        }

        response.json::<R>().await.map_err(|err| {
            Error::ParseError(format!(
                "Failed to parse service response for `{path}`: {err}"
            ))
        })
    }
}
