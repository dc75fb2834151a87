use std::fmt;
use std::time::Duration;

use flaps_api::types::MachineState;
use reqwest::StatusCode;

/// Errors returned by the Machines SDK.
#[derive(Debug)]
pub enum Error {
    /// A Machines API call failed.
    Api(flaps_api::Error),

    /// The HTTP client could not be built.
    Http(reqwest::Error),

    /// Missing required configuration.
    MissingConfig(&'static str),

    /// The machine did not reach the requested state in time.
    WaitTimeout {
        machine_id: String,
        state: MachineState,
        timeout: Duration,
    },

    /// The server answered a lease request without granting a lease.
    LeaseUnavailable { machine_id: String, message: String },

    /// A lease was presented for a different machine than the one addressed.
    LeaseMismatch {
        machine_id: String,
        lease_machine_id: String,
    },
}

impl Error {
    /// HTTP status of the underlying API failure, if any.
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            Self::Api(e) => e.status(),
            _ => None,
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Api(e) => Some(e),
            Self::Http(e) => Some(e),
            _ => None,
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Api(e) => write!(f, "API error: {e}"),
            Self::Http(e) => write!(f, "HTTP error: {e}"),
            Self::MissingConfig(field) => write!(f, "missing required configuration: {field}"),
            Self::WaitTimeout {
                machine_id,
                state,
                timeout,
            } => write!(
                f,
                "timed out after {}s waiting for VM {machine_id} to reach {state}",
                timeout.as_secs()
            ),
            Self::LeaseUnavailable {
                machine_id,
                message,
            } => write!(f, "lease on VM {machine_id} not granted: {message}"),
            Self::LeaseMismatch {
                machine_id,
                lease_machine_id,
            } => write!(
                f,
                "lease is held on VM {lease_machine_id}, not on VM {machine_id}"
            ),
        }
    }
}

impl From<flaps_api::Error> for Error {
    fn from(err: flaps_api::Error) -> Self {
        Self::Api(err)
    }
}

impl From<reqwest::Error> for Error {
    fn from(err: reqwest::Error) -> Self {
        Self::Http(err)
    }
}

pub type Result<T> = std::result::Result<T, Error>;
