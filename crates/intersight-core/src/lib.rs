//! # intersight-core
//!
//! Core types and utilities for claiming UCS-managed devices into the
//! Intersight management service.
//!
//! ## Modules
//!
//! - [`error`] - Error types and status classification
//! - [`types`] - Connector state model, claim credential, and Moid
//! - [`config`] - Claim run configuration and file loading
//! - [`client`] - HTTP client configuration and the connector retry policy

#![deny(missing_docs)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod client;
pub mod config;
pub mod error;
pub mod types;

// Re-export commonly used types
pub use error::{Error, Result};
