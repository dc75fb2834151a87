//! Low-level typed client for the Fly Machines API.
//!
//! Every method on [`Client`] is exactly one HTTP round trip: the request is
//! assembled, handed to a [`Transport`], and the response is either decoded
//! or classified into an [`Error`]. Nothing is retried and nothing is cached.
//!
//! ```no_run
//! use flaps_api::{Client, types::*};
//!
//! # async fn example() -> flaps_api::Result<()> {
//! let client = Client::new("_api.internal", "fly-token", "personal", "my-app");
//!
//! let machine = client
//!     .launch(&LaunchMachineInput {
//!         region: "ord".into(),
//!         config: MachineConfig {
//!             image: "nginx:latest".into(),
//!             ..Default::default()
//!         },
//!         ..Default::default()
//!     })
//!     .await?;
//! client.wait(&machine, Some(MachineState::Started)).await?;
//!
//! let lease = client.get_lease(&machine.id, Some(60)).await?;
//! let nonce = lease.data.map(|d| d.nonce);
//! client.release_lease(&machine.id, nonce.as_deref()).await?;
//! # Ok(())
//! # }
//! ```

mod client;
mod error;
mod request;
mod response;
pub mod transport;
pub mod types;

pub use client::{Client, WAIT_TIMEOUT_SECS};
pub use error::{Error, Result};
pub use request::{FLAPS_PORT, NONCE_HEADER};
pub use transport::{HttpRequest, HttpResponse, ResponseBody, Transport, TransportError};
