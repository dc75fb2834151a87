use std::sync::Arc;
use std::time::Duration;

use flaps_api::{Client, Transport};

use crate::connection::connect;
use crate::error::{Error, Result};

/// Host the Machines API is reachable on from inside the private network.
pub const DEFAULT_HOST: &str = "_api.internal";

/// Organization used when none is configured.
pub const DEFAULT_ORG: &str = "personal";

/// Builder for a [`Client`].
///
/// # Required Configuration
///
/// - app name, given to [`new()`](Self::new)
/// - [`token()`](Self::token): bearer token for the API
///
/// # Example
///
/// ```no_run
/// use flaps_sdk::FlapsBuilder;
///
/// # fn example() -> flaps_sdk::Result<()> {
/// let client = FlapsBuilder::new("my-app")
///     .token("fo1_xxx")
///     .org_slug("acme")
///     .build()?;
/// # Ok(())
/// # }
/// ```
pub struct FlapsBuilder {
    host: String,
    token: Option<String>,
    org_slug: String,
    app_name: Option<String>,
    transport: Option<Arc<dyn Transport>>,
    connect_timeout: Option<Duration>,
}

impl FlapsBuilder {
    /// Create a builder for the given application.
    pub fn new(app_name: impl Into<String>) -> Self {
        Self {
            host: DEFAULT_HOST.to_owned(),
            token: None,
            org_slug: DEFAULT_ORG.to_owned(),
            app_name: Some(app_name.into()),
            transport: None,
            connect_timeout: None,
        }
    }

    /// Create a builder from the process environment.
    ///
    /// Reads `FLY_API_TOKEN`, `FLY_APP_NAME`, `FLY_ORG_SLUG` and `FLAPS_HOST`.
    /// Unset variables leave the defaults in place; missing required values
    /// are reported by [`build()`](Self::build).
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub(crate) fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let present = |key: &str| lookup(key).filter(|v| !v.is_empty());
        Self {
            host: present("FLAPS_HOST").unwrap_or_else(|| DEFAULT_HOST.to_owned()),
            token: present("FLY_API_TOKEN"),
            org_slug: present("FLY_ORG_SLUG").unwrap_or_else(|| DEFAULT_ORG.to_owned()),
            app_name: present("FLY_APP_NAME"),
            transport: None,
            connect_timeout: None,
        }
    }

    /// Set the API host (name or IP address, without port).
    pub fn host(mut self, host: impl Into<String>) -> Self {
        self.host = host.into();
        self
    }

    /// Set the bearer token.
    pub fn token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    /// Set the organization slug.
    pub fn org_slug(mut self, org_slug: impl Into<String>) -> Self {
        self.org_slug = org_slug.into();
        self
    }

    /// Set the application name.
    pub fn app_name(mut self, app_name: impl Into<String>) -> Self {
        self.app_name = Some(app_name.into());
        self
    }

    /// Send requests through a custom transport instead of `reqwest`.
    pub fn transport(mut self, transport: Arc<dyn Transport>) -> Self {
        self.transport = Some(transport);
        self
    }

    /// Limit the time spent establishing a connection.
    ///
    /// Ignored when a custom [`transport()`](Self::transport) is set.
    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = Some(timeout);
        self
    }

    /// Validate the configuration and create the client.
    ///
    /// # Errors
    ///
    /// Returns [`Error::MissingConfig`] if the host, token or app name is
    /// missing or empty, and [`Error::Http`] if the default HTTP client
    /// cannot be built.
    pub fn build(self) -> Result<Client> {
        if self.host.is_empty() {
            return Err(Error::MissingConfig("host"));
        }
        let token = self
            .token
            .filter(|t| !t.is_empty())
            .ok_or(Error::MissingConfig("token"))?;
        let app_name = self
            .app_name
            .filter(|a| !a.is_empty())
            .ok_or(Error::MissingConfig("app_name"))?;

        let transport: Arc<dyn Transport> = match self.transport {
            Some(transport) => transport,
            None => Arc::new(connect(self.connect_timeout)?),
        };

        Ok(Client::new_with_transport(
            &self.host,
            &token,
            &self.org_slug,
            &app_name,
            transport,
        ))
    }
}
