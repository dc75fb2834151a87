use std::fmt;
use std::sync::Arc;

use reqwest::Method;
use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::error::{Error, Result};
use crate::request::{self, Endpoint, Headers, NO_BODY};
use crate::response;
use crate::transport::{ReqwestTransport, ResponseBody, Transport};
use crate::types::{
    CreateAppRequest, LaunchMachineInput, Machine, MachineLease, MachineStartResponse,
    MachineState, RemoveMachineInput, SignalRequest, StopMachineInput,
};

/// Seconds the server holds a wait request open.
pub const WAIT_TIMEOUT_SECS: u64 = 30;

/// Client for the Machines API of one application.
///
/// Configuration is fixed at construction. Clones share the transport and
/// may be used concurrently.
#[derive(Clone)]
pub struct Client {
    host: String,
    token: String,
    org_slug: String,
    app_name: String,
    endpoint: Endpoint,
    transport: Arc<dyn Transport>,
}

impl fmt::Debug for Client {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Client")
            .field("host", &self.host)
            .field("org_slug", &self.org_slug)
            .field("app_name", &self.app_name)
            .finish_non_exhaustive()
    }
}

impl Client {
    /// Create a client using a default `reqwest` transport.
    pub fn new(host: &str, token: &str, org_slug: &str, app_name: &str) -> Self {
        Self::new_with_transport(
            host,
            token,
            org_slug,
            app_name,
            Arc::new(ReqwestTransport::default()),
        )
    }

    /// Create a client that sends every request through `transport`.
    pub fn new_with_transport(
        host: &str,
        token: &str,
        org_slug: &str,
        app_name: &str,
        transport: Arc<dyn Transport>,
    ) -> Self {
        Self {
            host: host.to_owned(),
            token: token.to_owned(),
            org_slug: org_slug.to_owned(),
            app_name: app_name.to_owned(),
            endpoint: Endpoint::new(host, app_name),
            transport,
        }
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn org_slug(&self) -> &str {
        &self.org_slug
    }

    pub fn app_name(&self) -> &str {
        &self.app_name
    }

    // =========================================================================
    // Apps
    // =========================================================================

    /// Create an application in an organization.
    pub async fn create_app(&self, name: &str, org: &str) -> Result<()> {
        let body = CreateAppRequest {
            app_name: name,
            org_slug: org,
        };
        let url = self.endpoint.apps();
        self.send_discard(Method::POST, &url, Some(&body), Headers::none())
            .await
            .map_err(|e| e.context(format!("failed to create app {name}")))
    }

    // =========================================================================
    // Machine Lifecycle
    // =========================================================================

    /// Create and start a machine. A non-empty `input.id` is placed in the path.
    pub async fn launch(&self, input: &LaunchMachineInput) -> Result<Machine> {
        let path = if input.id.is_empty() {
            String::new()
        } else {
            format!("/{}", input.id)
        };
        let url = self.endpoint.machines(&path);
        self.send(Method::POST, &url, Some(input), Headers::none())
            .await
            .map_err(|e| e.context("failed to launch VM"))
    }

    /// Update a machine's configuration, scoped to the lease `nonce` when given.
    pub async fn update(&self, input: &LaunchMachineInput, nonce: Option<&str>) -> Result<Machine> {
        let path = format!("/{}", input.id);
        let url = self.endpoint.machines(&path);
        self.send(Method::POST, &url, Some(input), Headers::lease_nonce(nonce))
            .await
            .map_err(|e| e.context(format!("failed to update VM {}", input.id)))
    }

    pub async fn start(&self, machine_id: &str) -> Result<MachineStartResponse> {
        let path = format!("/{machine_id}/start");
        let url = self.endpoint.machines(&path);
        self.send(Method::POST, &url, NO_BODY, Headers::none())
            .await
            .map_err(|e| e.context(format!("failed to start VM {machine_id}")))
    }

    /// Block until the machine reaches `state` (default `started`).
    ///
    /// This is a single request; the server gives up after
    /// [`WAIT_TIMEOUT_SECS`]. Call again for a longer wait.
    pub async fn wait(&self, machine: &Machine, state: Option<MachineState>) -> Result<()> {
        let state = state.unwrap_or(MachineState::Started);
        let path = wait_path(machine, state);
        let url = self.endpoint.machines(&path);
        self.send_discard(Method::GET, &url, NO_BODY, Headers::none())
            .await
            .map_err(|e| {
                e.context(format!(
                    "failed to wait for VM {} in {state} state",
                    machine.id
                ))
            })
    }

    pub async fn stop(&self, input: &StopMachineInput) -> Result<()> {
        let path = format!("/{}/stop", input.id);
        let url = self.endpoint.machines(&path);
        self.send_discard(Method::POST, &url, NO_BODY, Headers::none())
            .await
            .map_err(|e| e.context(format!("failed to stop VM {}", input.id)))
    }

    /// Fetch one machine. An empty id addresses the collection root.
    pub async fn get(&self, machine_id: &str) -> Result<Machine> {
        let path = if machine_id.is_empty() {
            String::new()
        } else {
            format!("/{machine_id}")
        };
        let url = self.endpoint.machines(&path);
        self.send(Method::GET, &url, NO_BODY, Headers::none())
            .await
            .map_err(|e| e.context(format!("failed to get VM {machine_id}")))
    }

    /// List machines. `filter` is a raw query string such as `state=started`.
    pub async fn list(&self, filter: &str) -> Result<Vec<Machine>> {
        let path = if filter.is_empty() {
            String::new()
        } else {
            format!("?{filter}")
        };
        let url = self.endpoint.machines(&path);
        let machines: Option<Vec<Machine>> = self
            .send(Method::GET, &url, NO_BODY, Headers::none())
            .await
            .map_err(|e| e.context("failed to list VMs"))?;
        Ok(machines.unwrap_or_default())
    }

    pub async fn destroy(&self, input: &RemoveMachineInput) -> Result<()> {
        let path = format!("/{}?kill={}", input.id, input.kill);
        let url = self.endpoint.machines(&path);
        self.send_discard(Method::DELETE, &url, NO_BODY, Headers::none())
            .await
            .map_err(|e| e.context(format!("failed to destroy VM {}", input.id)))
    }

    /// Send SIGKILL to the machine.
    pub async fn kill(&self, machine_id: &str) -> Result<()> {
        let url = self.endpoint.machines(&format!("/{machine_id}/signal"));
        self.send_discard(Method::POST, &url, Some(&SignalRequest::SIGKILL), Headers::none())
            .await
            .map_err(|e| e.context(format!("failed to kill VM {machine_id}")))
    }

    // =========================================================================
    // Leases
    // =========================================================================

    /// Acquire the update lease on a machine, optionally with a TTL in seconds.
    pub async fn get_lease(&self, machine_id: &str, ttl: Option<u64>) -> Result<MachineLease> {
        let path = match ttl {
            Some(ttl) => format!("/{machine_id}/lease?ttl={ttl}"),
            None => format!("/{machine_id}/lease"),
        };
        let url = self.endpoint.machines(&path);
        self.send(Method::POST, &url, NO_BODY, Headers::none())
            .await
            .map_err(|e| e.context(format!("failed to get lease on VM {machine_id}")))
    }

    pub async fn release_lease(&self, machine_id: &str, nonce: Option<&str>) -> Result<()> {
        let path = format!("/{machine_id}/lease");
        let url = self.endpoint.machines(&path);
        self.send_discard(Method::DELETE, &url, NO_BODY, Headers::lease_nonce(nonce))
            .await
            .map_err(|e| e.context(format!("failed to release lease on VM {machine_id}")))
    }

    // =========================================================================
    // Dispatch
    // =========================================================================

    /// Send a request and decode the success body.
    async fn send<B, T>(
        &self,
        method: Method,
        url: &str,
        body: Option<&B>,
        headers: Headers,
    ) -> Result<T>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let body = self.dispatch(method, url, body, headers).await?;
        response::decode(body).await
    }

    /// Send a request and discard the success body.
    async fn send_discard<B>(
        &self,
        method: Method,
        url: &str,
        body: Option<&B>,
        headers: Headers,
    ) -> Result<()>
    where
        B: Serialize + ?Sized,
    {
        let body = self.dispatch(method, url, body, headers).await?;
        body.drain().await.map_err(Error::Transport)
    }

    /// Assemble, execute, and classify. Returns the body of a 2xx response.
    async fn dispatch<B>(
        &self,
        method: Method,
        url: &str,
        body: Option<&B>,
        headers: Headers,
    ) -> Result<ResponseBody>
    where
        B: Serialize + ?Sized,
    {
        let request = request::assemble(method, url, body, &headers, &self.token)?;
        tracing::debug!(
            method = %request.method,
            url = %request.url,
            leased = headers.has_nonce(),
            "sending machines API request"
        );

        let response = self
            .transport
            .execute(request)
            .await
            .map_err(Error::Transport)?;
        tracing::debug!(status = %response.status, "machines API responded");

        if response.status.is_success() {
            Ok(response.body)
        } else {
            Err(response::classify(response).await)
        }
    }
}

/// `/{id}/wait?instance_id={version or instance id}&timeout=30&state={state}`
///
/// `instance_id` is omitted when the machine carries neither token.
fn wait_path(machine: &Machine, state: MachineState) -> String {
    let instance = if machine.version.is_empty() {
        &machine.instance_id
    } else {
        &machine.version
    };
    let mut path = format!("/{}/wait?", machine.id);
    if !instance.is_empty() {
        path.push_str(&format!("instance_id={instance}&"));
    }
    path.push_str(&format!("timeout={WAIT_TIMEOUT_SECS}&state={state}"));
    path
}

#[cfg(test)]
mod tests {
    use super::*;

    fn machine(id: &str, version: &str, instance_id: &str) -> Machine {
        Machine {
            id: id.into(),
            version: version.into(),
            instance_id: instance_id.into(),
            ..Default::default()
        }
    }

    #[test]
    fn test_wait_path_prefers_version() {
        assert_eq!(
            wait_path(&machine("m1", "v2", "i1"), MachineState::Started),
            "/m1/wait?instance_id=v2&timeout=30&state=started"
        );
    }

    #[test]
    fn test_wait_path_falls_back_to_instance_id() {
        assert_eq!(
            wait_path(&machine("m1", "", "i1"), MachineState::Stopped),
            "/m1/wait?instance_id=i1&timeout=30&state=stopped"
        );
    }

    #[test]
    fn test_wait_path_omits_missing_instance() {
        assert_eq!(
            wait_path(&machine("m1", "", ""), MachineState::Started),
            "/m1/wait?timeout=30&state=started"
        );
    }

    #[test]
    fn test_debug_hides_token() {
        let client = Client::new("_api.internal", "super-secret", "personal", "web");
        let debug = format!("{client:?}");
        assert!(debug.contains("web"));
        assert!(!debug.contains("super-secret"));
    }
}
