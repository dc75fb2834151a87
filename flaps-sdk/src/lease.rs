use flaps_api::Client;
use flaps_api::types::{LaunchMachineInput, Machine, MachineLease};

use crate::error::{Error, Result};

/// A held lease on one machine.
///
/// The lease lives on the server; this guard only remembers its nonce and
/// attaches it to the calls that need it. Dropping the guard does not
/// release the lease: call [`release()`](Self::release), or let the TTL lapse.
#[derive(Debug)]
pub struct LeaseGuard {
    client: Client,
    machine_id: String,
    nonce: String,
    expires_at: i64,
    owner: String,
}

impl LeaseGuard {
    /// Acquire the lease on `machine_id`, optionally with a TTL in seconds.
    ///
    /// # Errors
    ///
    /// Returns [`Error::LeaseUnavailable`] when the server answers without
    /// lease data or nonce.
    #[tracing::instrument(skip(client), fields(app = client.app_name()))]
    pub async fn acquire(client: &Client, machine_id: &str, ttl: Option<u64>) -> Result<Self> {
        let lease = client.get_lease(machine_id, ttl).await?;
        let guard = Self::from_lease(client.clone(), machine_id, lease)?;
        tracing::debug!(expires_at = guard.expires_at, owner = %guard.owner, "lease acquired");
        Ok(guard)
    }

    fn from_lease(client: Client, machine_id: &str, lease: MachineLease) -> Result<Self> {
        let unavailable = |message: String| Error::LeaseUnavailable {
            machine_id: machine_id.to_owned(),
            message,
        };
        let data = lease.data.ok_or_else(|| {
            unavailable(
                lease
                    .message
                    .clone()
                    .unwrap_or_else(|| format!("status {:?}", lease.status)),
            )
        })?;
        if data.nonce.is_empty() {
            return Err(unavailable("lease carries no nonce".to_owned()));
        }

        Ok(Self {
            client,
            machine_id: machine_id.to_owned(),
            nonce: data.nonce,
            expires_at: data.expires_at,
            owner: data.owner,
        })
    }

    pub fn machine_id(&self) -> &str {
        &self.machine_id
    }

    /// Nonce to present on lease-scoped calls.
    pub fn nonce(&self) -> &str {
        &self.nonce
    }

    /// Unix timestamp (seconds) at which the server lets the lease lapse.
    pub fn expires_at(&self) -> i64 {
        self.expires_at
    }

    pub fn owner(&self) -> &str {
        &self.owner
    }

    /// Update the leased machine. `input.id` is set to the leased machine.
    pub async fn update(&self, mut input: LaunchMachineInput) -> Result<Machine> {
        input.id.clone_from(&self.machine_id);
        Ok(self.client.update(&input, Some(&self.nonce)).await?)
    }

    /// Release the lease.
    #[tracing::instrument(skip(self), fields(machine_id = %self.machine_id))]
    pub async fn release(self) -> Result<()> {
        self.client
            .release_lease(&self.machine_id, Some(&self.nonce))
            .await?;
        tracing::debug!("lease released");
        Ok(())
    }
}
