//! Device connector client for Intersight claiming.
//!
//! Provides the session dialects, the resilient request executor, state
//! polling, and claim credential extraction for UCS-managed device
//! connectors.

#![deny(missing_docs)]

pub mod claim;
pub mod client;
pub mod models;
pub mod session;

pub use claim::{fetch_claim_credential, ClaimOutcome};
pub use client::{ConnectorClient, ConnectorClientBuilder};
pub use models::{DeviceIdentifier, SecurityToken};
pub use session::{Session, SessionClient, XmlApiSession};

/// Convenient result alias that reuses the shared error type.
pub type Result<T> = intersight_core::Result<T>;
