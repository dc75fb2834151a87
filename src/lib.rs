//! Rust SDK for the Fly Machines API.
//!
//! This crate provides two modules:
//!
//! - [`api`]: Low-level typed client, one HTTP round trip per call
//! - [`sdk`]: High-level SDK for machine lifecycles and leases
//!
//! # Quick Start
//!
//! ```no_run
//! use std::time::Duration;
//!
//! use flaps::sdk::{FlapsBuilder, MachineHandle, types::*};
//!
//! # async fn example() -> flaps::sdk::Result<()> {
//! let client = FlapsBuilder::new("my-app").token("fo1_xxx").build()?;
//!
//! let machine = MachineHandle::attach(client, "148ed193b95089").await?;
//! machine.start().await?;
//! machine
//!     .wait_for(MachineState::Started, Duration::from_secs(60))
//!     .await?;
//! println!("VM state: {}", machine.machine().state);
//! # Ok(())
//! # }
//! ```

/// Low-level typed Machines API client.
///
/// Use this for direct control over each request, including raw lease
/// nonces and list filters.
pub use flaps_api as api;

/// High-level SDK for managing machines.
///
/// This module provides:
/// - [`sdk::FlapsBuilder`]: Client configuration, explicit or from the environment
/// - [`sdk::MachineHandle`]: Operations on one machine
/// - [`sdk::LeaseGuard`]: A held update lease
/// - [`sdk::types`]: Re-exported API types
pub use flaps_sdk as sdk;
