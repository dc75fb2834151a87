//! High-level SDK for managing Fly Machines.
//!
//! This crate wraps the low-level [`flaps_api`] client with a configuration
//! builder, a [`MachineHandle`] for post-launch operations, and a
//! [`LeaseGuard`] that carries a lease nonce to the calls that need it.
//!
//! # Quick Start
//!
//! ```no_run
//! use std::time::Duration;
//!
//! use flaps_sdk::{FlapsBuilder, MachineHandle, types::*};
//!
//! # async fn example() -> flaps_sdk::Result<()> {
//! let client = FlapsBuilder::from_env().build()?;
//!
//! let mut machine = MachineHandle::launch(
//!     client,
//!     &LaunchMachineInput {
//!         region: "ord".into(),
//!         config: MachineConfig {
//!             image: "nginx:latest".into(),
//!             ..Default::default()
//!         },
//!         ..Default::default()
//!     },
//! )
//! .await?;
//! machine
//!     .wait_for(MachineState::Started, Duration::from_secs(120))
//!     .await?;
//!
//! // Update under a lease
//! let lease = machine.lease(Some(60)).await?;
//! let mut config = machine.machine().config.clone().unwrap_or_default();
//! config.env.insert("LOG_LEVEL".into(), "debug".into());
//! machine
//!     .update(
//!         &lease,
//!         LaunchMachineInput {
//!             config,
//!             ..Default::default()
//!         },
//!     )
//!     .await?;
//! lease.release().await?;
//!
//! machine.destroy(true).await?;
//! # Ok(())
//! # }
//! ```

pub mod builder;
pub mod connection;
pub mod error;
pub mod lease;
pub mod machine;
pub mod wait;

pub use builder::FlapsBuilder;
pub use error::{Error, Result};
pub use lease::LeaseGuard;
pub use machine::MachineHandle;
pub use wait::{WAIT_RETRY_PAUSE, wait_for_state};

/// Re-export API types for convenience.
pub use flaps_api::types;

/// Re-export the low-level API client for advanced use cases.
pub use flaps_api::Client;
