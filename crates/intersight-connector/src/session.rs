//! Device authentication sessions.
//!
//! The device connector API is authenticated with a session credential
//! obtained through a device-specific login dialect. The dialect lives
//! behind the [`SessionClient`] trait so the poller and extractor never
//! depend on how a particular device family logs in; [`XmlApiSession`]
//! implements the UCS Manager XML API dialect.

use intersight_core::client::{ClientConfig, LOGIN_TIMEOUT};
use intersight_core::config::DeviceDescriptor;
use intersight_core::error::{Error, Result};
use quick_xml::escape::escape;
use reqwest::{Client, ClientBuilder};
use secrecy::ExposeSecret;
use std::time::Duration;
use tracing::{debug, warn};
use url::Url;

const USER_AGENT: &str = concat!("intersight-connector/", env!("CARGO_PKG_VERSION"));

/// Credential material for an established session.
#[derive(Debug, Clone)]
pub struct SessionAuth {
    header_name: String,
    header_value: String,
    cookie: String,
    logout_url: Url,
}

/// An authentication session against one device.
///
/// A failed login is represented by a logged-out session rather than an
/// error, so teardown can be applied uniformly on every exit path. Callers
/// must check [`Session::is_logged_in`] before issuing connector calls.
#[derive(Debug, Clone, Default)]
pub struct Session {
    auth: Option<SessionAuth>,
}

impl Session {
    /// A session whose login never succeeded.
    #[must_use]
    pub const fn logged_out() -> Self {
        Self { auth: None }
    }

    /// A session established from a login exchange.
    #[must_use]
    pub fn established(
        header_name: impl Into<String>,
        header_value: impl Into<String>,
        cookie: impl Into<String>,
        logout_url: Url,
    ) -> Self {
        Self {
            auth: Some(SessionAuth {
                header_name: header_name.into(),
                header_value: header_value.into(),
                cookie: cookie.into(),
                logout_url,
            }),
        }
    }

    /// Whether the login exchange produced a usable credential.
    #[must_use]
    pub const fn is_logged_in(&self) -> bool {
        self.auth.is_some()
    }

    /// Header name/value pair authenticating connector calls.
    #[must_use]
    pub fn auth_header(&self) -> Option<(&str, &str)> {
        self.auth
            .as_ref()
            .map(|auth| (auth.header_name.as_str(), auth.header_value.as_str()))
    }

    /// Invalidate the session, yielding its credential for logout.
    pub fn invalidate(&mut self) -> Option<SessionAuth> {
        self.auth.take()
    }
}

impl SessionAuth {
    /// Raw session cookie, as issued by the login exchange.
    #[must_use]
    pub fn cookie(&self) -> &str {
        &self.cookie
    }

    /// Logout endpoint for this session.
    #[must_use]
    pub const fn logout_url(&self) -> &Url {
        &self.logout_url
    }
}

/// Capability to establish and tear down device sessions.
///
/// `close` must be invoked exactly once per opened session, whether or not
/// the login succeeded and regardless of how the claim sequence ended.
#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait SessionClient: Send + Sync {
    /// Perform a single login exchange against the device.
    ///
    /// Never retried. A timeout, transport failure, non-2xx status, or
    /// unusable login response yields a logged-out session.
    async fn open(&self, device: &DeviceDescriptor) -> Session;

    /// Best-effort logout; a no-op if the session was never established.
    async fn close(&self, session: &mut Session);
}

/// UCS Manager XML API session dialect.
///
/// Logs in with `<aaaLogin>` against `https://<host>/nuova` and presents
/// the returned cookie as the `ucsmcookie` header on connector calls.
pub struct XmlApiSession {
    http: Client,
}

impl XmlApiSession {
    /// Build the session client from an HTTP configuration.
    ///
    /// # Errors
    ///
    /// Returns a `ConfigError` if the underlying HTTP client cannot be
    /// constructed.
    pub fn new(config: &ClientConfig) -> Result<Self> {
        let mut builder = ClientBuilder::new()
            .user_agent(USER_AGENT)
            .timeout(config.timeout)
            .pool_idle_timeout(config.pool_idle_timeout)
            .pool_max_idle_per_host(config.pool_max_idle_per_host);

        if !config.tls_verify {
            warn!("TLS verification disabled for device XML API client");
            builder = builder.danger_accept_invalid_certs(true);
        }

        let http = builder.build().map_err(|err| {
            Error::ConfigError(format!("Failed to build XML API HTTP client: {err}"))
        })?;

        Ok(Self { http })
    }

    fn login_url(device: &DeviceDescriptor) -> Result<Url> {
        let uri = format!("https://{}/nuova", device.hostname);
        Url::parse(&uri)
            .map_err(|err| Error::InvalidEndpoint(format!("Invalid XML API URL `{uri}`: {err}")))
    }

    async fn try_open(&self, device: &DeviceDescriptor) -> Result<Session> {
        let url = Self::login_url(device)?;
        let body = format!(
            "<aaaLogin inName='{}' inPassword='{}' />",
            escape(device.username.as_str()),
            escape(device.password.expose_secret()),
        );

        let response = self
            .http
            .post(url.clone())
            .body(body)
            .timeout(Duration::from_secs(LOGIN_TIMEOUT))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(Error::api("POST", url.as_str(), status.as_u16()));
        }

        let text = response.text().await?;
        let Some(cookie) = parse_out_cookie(&text) else {
            return Err(Error::AuthenticationFailed(format!(
                "XML API login for {} returned no session cookie",
                device.hostname
            )));
        };

        debug!(hostname = %device.hostname, "XML API session established");
        Ok(Session::established(
            "ucsmcookie",
            format!("ucsm-cookie={cookie}"),
            cookie,
            url,
        ))
    }
}

#[async_trait::async_trait]
impl SessionClient for XmlApiSession {
    async fn open(&self, device: &DeviceDescriptor) -> Session {
        match self.try_open(device).await {
            Ok(session) => session,
            Err(err) => {
                warn!(hostname = %device.hostname, error = %err, "XML API login failed");
                Session::logged_out()
            }
        }
    }

    async fn close(&self, session: &mut Session) {
        let Some(auth) = session.invalidate() else {
            return;
        };

        let body = format!("<aaaLogout inCookie='{}' />", escape(auth.cookie()));
        match self.http.post(auth.logout_url().clone()).body(body).send().await {
            Ok(response) => {
                debug!(status = %response.status(), "XML API session closed");
            }
            Err(err) => {
                debug!(error = %err, "XML API logout failed; session left to expire");
            }
        }
    }
}

/// Extract the `outCookie` attribute from an XML API login response.
fn parse_out_cookie(xml: &str) -> Option<String> {
    use quick_xml::events::Event;
    use quick_xml::Reader;

    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);

    loop {
        match reader.read_event() {
            Ok(Event::Start(e) | Event::Empty(e)) => {
                for attr in e.attributes().flatten() {
                    if attr.key.as_ref() == b"outCookie" {
                        let value = attr.unescape_value().ok()?;
                        if value.is_empty() {
                            return None;
                        }
                        return Some(value.to_string());
                    }
                }
                // the root element carries the cookie; anything else is a
                // login failure response
                return None;
            }
            Ok(Event::Eof) | Err(_) => return None,
            Ok(_) => {}
        }
    }
}
