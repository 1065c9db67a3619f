//! Per-device claim sequence orchestration.
//!
//! Drives one device through the claim state sequence:
//! session open → administrative enable → access mode → connectivity wait →
//! claim code extraction, with the session torn down exactly once on every
//! exit path.

use crate::client::ConnectorClient;
use crate::session::{Session, SessionClient};
use crate::Result;
use intersight_core::config::DeviceDescriptor;
use intersight_core::types::ClaimCredential;
use intersight_core::Error;
use tracing::{info, warn};

/// Outcome of a device claim sequence.
#[derive(Debug, Clone)]
pub enum ClaimOutcome {
    /// Some account already owns the device; nothing to extract
    AlreadyClaimed,

    /// Device is claimable; credential ready for registration
    Claimable(ClaimCredential),
}

impl ClaimOutcome {
    /// Returns the credential for a claimable device.
    #[must_use]
    pub const fn credential(&self) -> Option<&ClaimCredential> {
        match self {
            Self::AlreadyClaimed => None,
            Self::Claimable(credential) => Some(credential),
        }
    }
}

/// Run the full claim sequence against one device.
///
/// The session is closed exactly once whether the login succeeded, any
/// stage failed, or the sequence completed. A failed login aborts before
/// any connector call with [`Error::AuthenticationFailed`].
pub async fn fetch_claim_credential(
    session_client: &dyn SessionClient,
    connector: &ConnectorClient,
    device: &DeviceDescriptor,
) -> Result<ClaimOutcome> {
    let mut session = session_client.open(device).await;
    let outcome = claim_sequence(connector, &session, device).await;
    session_client.close(&mut session).await;
    outcome
}

async fn claim_sequence(
    connector: &ConnectorClient,
    session: &Session,
    device: &DeviceDescriptor,
) -> Result<ClaimOutcome> {
    if !session.is_logged_in() {
        return Err(Error::AuthenticationFailed(device.hostname.clone()));
    }

    let mut status = connector.ensure_enabled(session).await?;
    if !status.admin_state {
        return Err(Error::Convergence(format!(
            "connector on {} still administratively disabled",
            device.hostname
        )));
    }

    if device.read_only {
        status = connector.configure_access_mode(session, true).await?;
        if !status.read_only_mode {
            warn!(hostname = %device.hostname, "read-only access mode did not stick");
        }
    }

    // wait for a connection to establish before checking claim state
    status = connector.await_connected(session, status).await?;
    info!(
        hostname = %device.hostname,
        admin_state = status.admin_state,
        connection_state = %status.connection_state,
        ownership_state = %status.ownership_state,
        "connector status"
    );
    if !status.connection_state.is_connected() {
        warn!(
            hostname = %device.hostname,
            connection_state = %status.connection_state,
            "connector not connected; claim codes may predate connectivity"
        );
    }

    if status.ownership_state.is_claimed() {
        info!(hostname = %device.hostname, "device already claimed");
        return Ok(ClaimOutcome::AlreadyClaimed);
    }

    let credential = connector.claim_codes(session).await?;
    Ok(ClaimOutcome::Claimable(credential))
}
