//! Management-service REST client.
//!
//! Registers claimed devices and provisions the supporting organizational
//! objects: resource group, organization, permission, and role bindings.

#![deny(missing_docs)]

pub mod client;
pub mod models;

pub use client::{CloudClient, CloudClientBuilder};
pub use models::{ClaimedDevice, RoleRef};

/// Convenient result alias that reuses the shared error type.
pub type Result<T> = intersight_core::Result<T>;
