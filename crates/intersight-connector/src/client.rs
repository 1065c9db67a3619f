//! Device connector client: resilient request execution, state polling,
//! and claim credential extraction.
//!
//! All connector traffic funnels through [`ConnectorClient::execute`], so
//! the retry policy for transient server failures is applied uniformly.

use crate::models::{DeviceIdentifier, SecurityToken};
use crate::session::Session;
use crate::Result;
use intersight_core::client::{
    ClientConfig, RetryPolicy, ACCESS_MODE_ATTEMPTS, CONNECT_POLL_ATTEMPTS,
    DEFAULT_RETRY_INTERVAL_SECS, ENABLE_ATTEMPTS,
};
use intersight_core::types::{ClaimCredential, ConnectorStatus};
use intersight_core::Error;
use reqwest::{Client, ClientBuilder, Method};
use serde::de::DeserializeOwned;
use serde_json::{json, Value};
use std::time::Duration;
use tokio::time::sleep;
use tracing::{debug, info, warn};
use url::Url;

const USER_AGENT: &str = concat!("intersight-connector/", env!("CARGO_PKG_VERSION"));

/// Builder for [`ConnectorClient`].
#[derive(Debug, Clone)]
pub struct ConnectorClientBuilder {
    base_url: String,
    http_config: ClientConfig,
    retry_policy: RetryPolicy,
    poll_interval: Duration,
}

impl ConnectorClientBuilder {
    /// Create a builder for an explicit connector base URL.
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            http_config: ClientConfig::new(),
            retry_policy: RetryPolicy::new(),
            poll_interval: Duration::from_secs(DEFAULT_RETRY_INTERVAL_SECS),
        }
    }

    /// Create a builder for a device's connector API
    /// (`https://<hostname>/connector/`).
    pub fn for_device(hostname: impl AsRef<str>) -> Self {
        Self::new(format!("https://{}/connector/", hostname.as_ref()))
    }

    /// Override the HTTP client configuration.
    #[must_use]
    pub fn with_http_config(mut self, config: ClientConfig) -> Self {
        self.http_config = config;
        self
    }

    /// Override the transient-failure retry policy.
    #[must_use]
    pub const fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry_policy = retry;
        self
    }

    /// Override the wait between connectivity/state polls.
    #[must_use]
    pub const fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    /// Build the client.
    pub fn build(self) -> Result<ConnectorClient> {
        let mut base = self.base_url;
        if !base.ends_with('/') {
            base.push('/');
        }
        let base_url = Url::parse(&base)
            .map_err(|err| Error::InvalidEndpoint(format!("Invalid connector URL `{base}`: {err}")))?;

        let mut builder = ClientBuilder::new()
            .user_agent(USER_AGENT)
            .timeout(self.http_config.timeout)
            .pool_idle_timeout(self.http_config.pool_idle_timeout)
            .pool_max_idle_per_host(self.http_config.pool_max_idle_per_host);

        if !self.http_config.tls_verify {
            warn!(%base_url, "TLS verification disabled for device connector client");
            builder = builder.danger_accept_invalid_certs(true);
        }

        let http = builder.build().map_err(|err| {
            Error::ConfigError(format!("Failed to build connector HTTP client: {err}"))
        })?;

        Ok(ConnectorClient {
            http,
            base_url,
            retry_policy: self.retry_policy,
            poll_interval: self.poll_interval,
        })
    }
}

/// Client for one device's connector API.
#[derive(Debug, Clone)]
pub struct ConnectorClient {
    http: Client,
    base_url: Url,
    retry_policy: RetryPolicy,
    poll_interval: Duration,
}

impl ConnectorClient {
    /// Return the connector base URL.
    #[must_use]
    pub const fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Query the current connector status.
    pub async fn get_status(&self, session: &Session) -> Result<ConnectorStatus> {
        self.read("Systems", session).await
    }

    /// Drive the connector's administrative state to enabled.
    ///
    /// Queries status and, while disabled, writes `AdminState: true` and
    /// re-queries, for up to 4 attempts. A write error aborts immediately;
    /// exhausting the attempts returns the last snapshot, which the caller
    /// must interpret (a still-disabled result is a failure).
    pub async fn ensure_enabled(&self, session: &Session) -> Result<ConnectorStatus> {
        let mut status = ConnectorStatus::default();
        for attempt in 0..ENABLE_ATTEMPTS {
            status = self.get_status(session).await?;
            if status.admin_state {
                return Ok(status);
            }
            debug!(attempt, "connector administratively disabled, enabling");
            self.write("Systems", session, &json!({ "AdminState": true }))
                .await?;
        }
        Ok(status)
    }

    /// Wait for the connector to report a live management channel.
    ///
    /// Starting from the given snapshot, sleeps one poll interval and
    /// re-queries while not `Connected`, for up to 10 polls. Exhausting the
    /// polls is not an error; the last snapshot is returned and the caller
    /// treats a still-disconnected result as degraded.
    pub async fn await_connected(
        &self,
        session: &Session,
        status: ConnectorStatus,
    ) -> Result<ConnectorStatus> {
        let mut status = status;
        for _ in 0..CONNECT_POLL_ATTEMPTS {
            if status.connection_state.is_connected() {
                break;
            }
            sleep(self.poll_interval).await;
            status = self.get_status(session).await?;
        }
        Ok(status)
    }

    /// Apply the connector access mode and confirm it stuck.
    ///
    /// Writes `ReadOnlyMode` and re-queries to confirm, for up to 4 cycles;
    /// stops early on a write error or once the read-back matches.
    pub async fn configure_access_mode(
        &self,
        session: &Session,
        read_only: bool,
    ) -> Result<ConnectorStatus> {
        let mut status = ConnectorStatus::default();
        for _ in 0..ACCESS_MODE_ATTEMPTS {
            self.write("Systems", session, &json!({ "ReadOnlyMode": read_only }))
                .await?;
            status = self.get_status(session).await?;
            if status.read_only_mode == read_only {
                break;
            }
        }
        Ok(status)
    }

    /// Extract the device identifier and one-time claim token.
    ///
    /// Callers must have confirmed the connector is administratively
    /// enabled and attempted the connectivity wait first. Either query
    /// failing fails the whole call; no partial credential is ever
    /// returned.
    pub async fn claim_codes(&self, session: &Session) -> Result<ClaimCredential> {
        let identity: DeviceIdentifier = self.read("DeviceIdentifiers", session).await?;
        let token: SecurityToken = self.read("SecurityTokens", session).await?;
        info!(serial = %identity.id, "claim codes retrieved");
        Ok(ClaimCredential::new(identity.id, token.token))
    }

    async fn read<T>(&self, resource: &str, session: &Session) -> Result<T>
    where
        T: DeserializeOwned,
    {
        let value = self
            .execute(Method::GET, resource, session, None)
            .await?
            .ok_or_else(|| Error::Protocol(format!("missing body from {resource}")))?;
        serde_json::from_value(value).map_err(|err| {
            Error::ParseError(format!(
                "Failed to parse connector response for `{resource}`: {err}"
            ))
        })
    }

    async fn write(&self, resource: &str, session: &Session, body: &Value) -> Result<()> {
        self.execute(Method::PUT, resource, session, Some(body))
            .await
            .map(|_| ())
    }

    /// Perform one connector call with the transient-failure retry policy.
    ///
    /// This is the sole point where connector calls touch the network. Only
    /// GET and PUT are supported; a 5xx status is retried at a fixed
    /// interval up to the attempt cap, any other non-success status stops
    /// immediately. Successful reads are singleton collections and are
    /// narrowed to their first element.
    async fn execute(
        &self,
        method: Method,
        resource: &str,
        session: &Session,
        body: Option<&Value>,
    ) -> Result<Option<Value>> {
        if method != Method::GET && method != Method::PUT {
            return Err(Error::UnsupportedOperation(method.to_string()));
        }

        let url = self.build_url(resource)?;
        let mut attempt = 0;

        loop {
            attempt += 1;

            let mut request = self
                .http
                .request(method.clone(), url.clone())
                .header("Accept", "application/json");
            if let Some((name, value)) = session.auth_header() {
                request = request.header(name, value);
            }
            if let Some(payload) = body {
                request = request.json(payload);
            }

            debug!(%method, %url, attempt, "sending device connector request");
            let response = request.send().await?;
            let status = response.status();

            if status.is_success() {
                if method != Method::GET {
                    return Ok(None);
                }

                let value: Value = response.json().await.map_err(|err| {
                    Error::ParseError(format!(
                        "Failed to parse connector response for `{url}`: {err}"
                    ))
                })?;

                return match value {
                    Value::Array(mut items) => {
                        if items.is_empty() {
                            Err(Error::Protocol(format!("empty collection from {url}")))
                        } else {
                            Ok(Some(items.swap_remove(0)))
                        }
                    }
                    _ => Err(Error::Protocol(format!(
                        "expected a collection from {url}"
                    ))),
                };
            }

            if status.is_server_error() && attempt < self.retry_policy.max_attempts {
                debug!(%status, attempt, "transient connector error, retrying");
                sleep(self.retry_policy.interval).await;
                continue;
            }

            return Err(Error::api(method.as_str(), url.as_str(), status.as_u16()));
        }
    }

    fn build_url(&self, resource: &str) -> Result<Url> {
        self.base_url.join(resource).map_err(|err| {
            Error::InvalidEndpoint(format!("Invalid connector resource `{resource}`: {err}"))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use intersight_core::types::{ConnectionState, OwnershipState};
    use wiremock::matchers::{body_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn test_client(server: &MockServer) -> ConnectorClient {
        ConnectorClientBuilder::new(format!("{}/connector/", server.uri()))
            .with_retry_policy(RetryPolicy::new().with_interval(Duration::from_millis(5)))
            .with_poll_interval(Duration::from_millis(5))
            .build()
            .unwrap()
    }

    fn test_session(server: &MockServer) -> Session {
        let logout = Url::parse(&format!("{}/nuova", server.uri())).unwrap();
        Session::established("ucsmcookie", "ucsm-cookie=1629-abc", "1629-abc", logout)
    }

    fn systems_body(admin: bool, connection: &str, ownership: &str) -> serde_json::Value {
        json!([{
            "AdminState": admin,
            "ConnectionState": connection,
            "AccountOwnershipState": ownership,
            "ReadOnlyMode": false
        }])
    }

    #[tokio::test]
    async fn executor_recovers_from_transient_errors() {
        let server = MockServer::start().await;

        // three 5xx responses, then success
        Mock::given(method("GET"))
            .and(path("/connector/Systems"))
            .respond_with(ResponseTemplate::new(503))
            .up_to_n_times(3)
            .expect(3)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/connector/Systems"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(systems_body(true, "Connected", "Not Claimed")),
            )
            .expect(1)
            .mount(&server)
            .await;

        let client = test_client(&server);
        let status = client.get_status(&test_session(&server)).await.unwrap();
        assert!(status.admin_state);
        assert!(status.connection_state.is_connected());
    }

    #[tokio::test]
    async fn executor_stops_after_attempt_cap() {
        let server = MockServer::start().await;

        // always 5xx: exactly 10 attempts, no 11th call
        Mock::given(method("GET"))
            .and(path("/connector/Systems"))
            .respond_with(ResponseTemplate::new(503))
            .expect(10)
            .mount(&server)
            .await;

        let client = test_client(&server);
        let err = client.get_status(&test_session(&server)).await.unwrap_err();
        assert!(matches!(err, Error::Api { status: 503, .. }));
        assert!(err.is_transient());
    }

    #[tokio::test]
    async fn executor_does_not_retry_client_errors() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/connector/Systems"))
            .respond_with(ResponseTemplate::new(401))
            .expect(1)
            .mount(&server)
            .await;

        let client = test_client(&server);
        let err = client.get_status(&test_session(&server)).await.unwrap_err();
        assert!(matches!(err, Error::Api { status: 401, .. }));
        assert!(!err.is_transient());
    }

    #[tokio::test]
    async fn executor_rejects_unsupported_methods_without_network_call() {
        let server = MockServer::start().await;
        let client = test_client(&server);

        let err = client
            .execute(Method::DELETE, "Systems", &test_session(&server), None)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::UnsupportedOperation(_)));

        // no mock mounted: any network call would have produced a 404 Api
        // error instead of UnsupportedOperation
    }

    #[tokio::test]
    async fn executor_treats_empty_collection_as_protocol_error() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/connector/Systems"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
            .expect(1)
            .mount(&server)
            .await;

        let client = test_client(&server);
        let err = client.get_status(&test_session(&server)).await.unwrap_err();
        assert!(matches!(err, Error::Protocol(_)));
    }

    #[tokio::test]
    async fn executor_treats_non_collection_success_as_protocol_error() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/connector/Systems"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"AdminState": true})))
            .expect(1)
            .mount(&server)
            .await;

        let client = test_client(&server);
        let err = client.get_status(&test_session(&server)).await.unwrap_err();
        assert!(matches!(err, Error::Protocol(_)));
    }

    #[tokio::test]
    async fn executor_sends_session_auth_header() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/connector/Systems"))
            .and(header("ucsmcookie", "ucsm-cookie=1629-abc"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(systems_body(true, "Connected", "Not Claimed")),
            )
            .expect(1)
            .mount(&server)
            .await;

        let client = test_client(&server);
        client.get_status(&test_session(&server)).await.unwrap();
    }

    #[tokio::test]
    async fn ensure_enabled_reads_once_when_already_enabled() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/connector/Systems"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(systems_body(true, "Connecting", "Not Claimed")),
            )
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("PUT"))
            .and(path("/connector/Systems"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        let client = test_client(&server);
        let status = client.ensure_enabled(&test_session(&server)).await.unwrap();
        assert!(status.admin_state);
    }

    #[tokio::test]
    async fn ensure_enabled_gives_up_after_four_attempts() {
        let server = MockServer::start().await;

        // reads keep reporting disabled, writes succeed: 4 cycles, no 5th
        Mock::given(method("GET"))
            .and(path("/connector/Systems"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(systems_body(false, "Connecting", "Not Claimed")),
            )
            .expect(4)
            .mount(&server)
            .await;
        Mock::given(method("PUT"))
            .and(path("/connector/Systems"))
            .and(body_json(json!({"AdminState": true})))
            .respond_with(ResponseTemplate::new(200))
            .expect(4)
            .mount(&server)
            .await;

        let client = test_client(&server);
        let status = client.ensure_enabled(&test_session(&server)).await.unwrap();
        assert!(!status.admin_state);
    }

    #[tokio::test]
    async fn ensure_enabled_aborts_on_write_error() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/connector/Systems"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(systems_body(false, "Connecting", "Not Claimed")),
            )
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("PUT"))
            .and(path("/connector/Systems"))
            .respond_with(ResponseTemplate::new(403))
            .expect(1)
            .mount(&server)
            .await;

        let client = test_client(&server);
        let err = client
            .ensure_enabled(&test_session(&server))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Api { status: 403, .. }));
    }

    #[tokio::test]
    async fn await_connected_returns_immediately_when_connected() {
        let server = MockServer::start().await;
        // no mocks: a poll would fail, so returning Ok proves no poll ran

        let client = test_client(&server);
        let status = ConnectorStatus {
            admin_state: true,
            connection_state: ConnectionState::Connected,
            ownership_state: OwnershipState::NotClaimed,
            read_only_mode: false,
        };
        let result = client
            .await_connected(&test_session(&server), status)
            .await
            .unwrap();
        assert!(result.connection_state.is_connected());
    }

    #[tokio::test]
    async fn await_connected_returns_last_snapshot_after_poll_cap() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/connector/Systems"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(systems_body(true, "Connecting", "Not Claimed")),
            )
            .expect(10)
            .mount(&server)
            .await;

        let client = test_client(&server);
        let status = ConnectorStatus {
            admin_state: true,
            connection_state: ConnectionState::Connecting,
            ownership_state: OwnershipState::NotClaimed,
            read_only_mode: false,
        };
        let result = client
            .await_connected(&test_session(&server), status)
            .await
            .unwrap();
        // degraded, not an error
        assert!(!result.connection_state.is_connected());
    }

    #[tokio::test]
    async fn configure_access_mode_confirms_setting() {
        let server = MockServer::start().await;

        Mock::given(method("PUT"))
            .and(path("/connector/Systems"))
            .and(body_json(json!({"ReadOnlyMode": true})))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/connector/Systems"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([{
                "AdminState": true,
                "ConnectionState": "Connected",
                "AccountOwnershipState": "Not Claimed",
                "ReadOnlyMode": true
            }])))
            .expect(1)
            .mount(&server)
            .await;

        let client = test_client(&server);
        let status = client
            .configure_access_mode(&test_session(&server), true)
            .await
            .unwrap();
        assert!(status.read_only_mode);
    }

    #[tokio::test]
    async fn configure_access_mode_gives_up_after_four_cycles() {
        let server = MockServer::start().await;

        // writes succeed but the read-back never matches: 4 cycles, no 5th
        Mock::given(method("PUT"))
            .and(path("/connector/Systems"))
            .and(body_json(json!({"ReadOnlyMode": true})))
            .respond_with(ResponseTemplate::new(200))
            .expect(4)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/connector/Systems"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(systems_body(true, "Connected", "Not Claimed")),
            )
            .expect(4)
            .mount(&server)
            .await;

        let client = test_client(&server);
        let status = client
            .configure_access_mode(&test_session(&server), true)
            .await
            .unwrap();
        // last snapshot returned, caller interprets
        assert!(!status.read_only_mode);
    }

    #[tokio::test]
    async fn configure_access_mode_aborts_on_write_error() {
        let server = MockServer::start().await;

        Mock::given(method("PUT"))
            .and(path("/connector/Systems"))
            .respond_with(ResponseTemplate::new(403))
            .expect(1)
            .mount(&server)
            .await;
        // no confirming read after a failed write
        Mock::given(method("GET"))
            .and(path("/connector/Systems"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(systems_body(true, "Connected", "Not Claimed")),
            )
            .expect(0)
            .mount(&server)
            .await;

        let client = test_client(&server);
        let err = client
            .configure_access_mode(&test_session(&server), true)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Api { status: 403, .. }));
    }

    #[tokio::test]
    async fn claim_codes_returns_complete_credential() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/connector/DeviceIdentifiers"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([{"Id": "FCH12345"}])))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/connector/SecurityTokens"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!([{"Token": "ABCD-1234", "Duration": 600}])),
            )
            .expect(1)
            .mount(&server)
            .await;

        let client = test_client(&server);
        let credential = client.claim_codes(&test_session(&server)).await.unwrap();
        assert_eq!(credential.serial(), "FCH12345");
        assert_eq!(credential.token(), "ABCD-1234");
    }

    #[tokio::test]
    async fn claim_codes_fails_when_identifier_query_errors() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/connector/DeviceIdentifiers"))
            .respond_with(ResponseTemplate::new(404))
            .expect(1)
            .mount(&server)
            .await;
        // the token resource must never be queried
        Mock::given(method("GET"))
            .and(path("/connector/SecurityTokens"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([{"Token": "X"}])))
            .expect(0)
            .mount(&server)
            .await;

        let client = test_client(&server);
        let err = client
            .claim_codes(&test_session(&server))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Api { status: 404, .. }));
    }

    #[tokio::test]
    async fn claim_codes_discards_identifier_when_token_query_errors() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/connector/DeviceIdentifiers"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([{"Id": "FCH12345"}])))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/connector/SecurityTokens"))
            .respond_with(ResponseTemplate::new(500))
            .expect(10)
            .mount(&server)
            .await;

        let client = test_client(&server);
        let err = client
            .claim_codes(&test_session(&server))
            .await
            .unwrap_err();
        // no partial credential: the call fails outright
        assert!(matches!(err, Error::Api { status: 500, .. }));
    }
}
