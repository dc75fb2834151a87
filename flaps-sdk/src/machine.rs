use std::time::Duration;

use flaps_api::Client;
use flaps_api::types::{
    LaunchMachineInput, Machine, MachineStartResponse, MachineState, RemoveMachineInput,
    StopMachineInput,
};

use crate::error::{Error, Result};
use crate::lease::LeaseGuard;
use crate::wait::wait_for_state;

/// Handle to one machine of an application.
///
/// Obtained from [`MachineHandle::launch()`] or [`MachineHandle::attach()`].
/// The cached [`Machine`] is only as fresh as the last call that returned it;
/// use [`refresh()`](Self::refresh) to re-read it.
#[derive(Debug, Clone)]
pub struct MachineHandle {
    client: Client,
    machine: Machine,
}

impl MachineHandle {
    /// Launch a new machine.
    #[tracing::instrument(skip_all, fields(app = client.app_name(), region = %input.region))]
    pub async fn launch(client: Client, input: &LaunchMachineInput) -> Result<Self> {
        let machine = client.launch(input).await?;
        tracing::info!(machine_id = %machine.id, "machine launched");
        Ok(Self { client, machine })
    }

    /// Attach to an existing machine.
    pub async fn attach(client: Client, machine_id: &str) -> Result<Self> {
        let machine = client.get(machine_id).await?;
        Ok(Self { client, machine })
    }

    pub fn id(&self) -> &str {
        &self.machine.id
    }

    /// The machine as of the last call that returned it.
    pub fn machine(&self) -> &Machine {
        &self.machine
    }

    /// Re-read the machine from the API.
    pub async fn refresh(&mut self) -> Result<&Machine> {
        self.machine = self.client.get(&self.machine.id).await?;
        Ok(&self.machine)
    }

    pub async fn start(&self) -> Result<MachineStartResponse> {
        Ok(self.client.start(&self.machine.id).await?)
    }

    pub async fn stop(&self) -> Result<()> {
        let input = StopMachineInput {
            id: self.machine.id.clone(),
            ..Default::default()
        };
        Ok(self.client.stop(&input).await?)
    }

    /// Wait until the machine reaches `state`, for up to `timeout`.
    pub async fn wait_for(&self, state: MachineState, timeout: Duration) -> Result<()> {
        wait_for_state(&self.client, &self.machine, state, timeout).await
    }

    /// Send SIGKILL.
    pub async fn kill(&self) -> Result<()> {
        Ok(self.client.kill(&self.machine.id).await?)
    }

    /// Acquire the update lease on this machine.
    pub async fn lease(&self, ttl: Option<u64>) -> Result<LeaseGuard> {
        LeaseGuard::acquire(&self.client, &self.machine.id, ttl).await
    }

    /// Update the machine under a held lease, and cache the result.
    ///
    /// # Errors
    ///
    /// Returns [`Error::LeaseMismatch`] without sending anything when `lease`
    /// is held on another machine.
    pub async fn update(&mut self, lease: &LeaseGuard, input: LaunchMachineInput) -> Result<&Machine> {
        if lease.machine_id() != self.id() {
            return Err(Error::LeaseMismatch {
                machine_id: self.machine.id.clone(),
                lease_machine_id: lease.machine_id().to_owned(),
            });
        }
        self.machine = lease.update(input).await?;
        Ok(&self.machine)
    }

    /// Destroy the machine, killing it first if `kill` is set.
    #[tracing::instrument(skip(self), fields(machine_id = %self.machine.id))]
    pub async fn destroy(self, kill: bool) -> Result<()> {
        let input = RemoveMachineInput {
            id: self.machine.id.clone(),
            kill,
        };
        self.client.destroy(&input).await?;
        tracing::info!("machine destroyed");
        Ok(())
    }

    /// Get a reference to the underlying API client.
    pub fn client(&self) -> &Client {
        &self.client
    }

    /// Consume the handle and return the underlying API client.
    pub fn into_client(self) -> Client {
        self.client
    }
}
