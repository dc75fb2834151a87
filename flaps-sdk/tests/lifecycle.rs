//! Machine handle, lease guard and state wait against a scripted transport.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use flaps_api::{HttpRequest, HttpResponse, NONCE_HEADER, ResponseBody, Transport, TransportError};
use flaps_sdk::types::{LaunchMachineInput, MachineConfig, MachineState};
use flaps_sdk::{
    Client, Error, FlapsBuilder, LeaseGuard, MachineHandle, WAIT_RETRY_PAUSE, wait_for_state,
};
use futures::future::BoxFuture;
use reqwest::header::HeaderMap;
use reqwest::{Method, StatusCode};

const MACHINE: &str = r#"{"id":"m1","state":"stopped","instance_id":"i1","version":"v1"}"#;
const LEASE: &str = r#"{"status":"success","data":{"nonce":"n1","expires_at":1700000060,"owner":"ops@example.com"}}"#;

/// Answers requests from a queue of `(status, body)` pairs.
#[derive(Default)]
struct ScriptedTransport {
    replies: Mutex<VecDeque<(u16, &'static str)>>,
    requests: Mutex<Vec<HttpRequest>>,
}

impl ScriptedTransport {
    fn new(replies: &[(u16, &'static str)]) -> Arc<Self> {
        Arc::new(Self {
            replies: Mutex::new(replies.iter().copied().collect()),
            requests: Mutex::default(),
        })
    }

    fn client(self: &Arc<Self>) -> Client {
        FlapsBuilder::new("web")
            .token("fo1_secret")
            .host("flaps.internal")
            .transport(self.clone())
            .build()
            .unwrap()
    }

    fn requests(&self) -> Vec<HttpRequest> {
        self.requests.lock().unwrap().clone()
    }
}

impl Transport for ScriptedTransport {
    fn execute(&self, request: HttpRequest) -> BoxFuture<'_, Result<HttpResponse, TransportError>> {
        self.requests.lock().unwrap().push(request);
        let reply = self.replies.lock().unwrap().pop_front();
        Box::pin(async move {
            let (status, body) = reply.ok_or("no scripted reply left")?;
            Ok(HttpResponse {
                status: StatusCode::from_u16(status)?,
                headers: HeaderMap::new(),
                body: ResponseBody::from_bytes(body),
            })
        })
    }
}

fn path(request: &HttpRequest) -> String {
    let url = request.url.as_str();
    let (_, suffix) = url.split_once("/machines").unwrap();
    suffix.to_owned()
}

#[tokio::test]
async fn test_handle_lifecycle() {
    let transport = ScriptedTransport::new(&[
        (200, MACHINE),
        (200, r#"{"status":"ok","previous_state":"stopped"}"#),
        (200, ""),
        (200, ""),
        (200, ""),
    ]);
    let machine = MachineHandle::attach(transport.client(), "m1").await.unwrap();
    assert_eq!(machine.id(), "m1");
    assert_eq!(machine.machine().state, MachineState::Stopped);

    let started = machine.start().await.unwrap();
    assert_eq!(started.previous_state, "stopped");
    machine
        .wait_for(MachineState::Started, Duration::from_secs(5))
        .await
        .unwrap();
    machine.stop().await.unwrap();
    machine.destroy(true).await.unwrap();

    let sent: Vec<_> = transport
        .requests()
        .iter()
        .map(|r| (r.method.clone(), path(r)))
        .collect();
    assert_eq!(
        sent,
        [
            (Method::GET, "/m1".to_owned()),
            (Method::POST, "/m1/start".to_owned()),
            (
                Method::GET,
                "/m1/wait?instance_id=v1&timeout=30&state=started".to_owned()
            ),
            (Method::POST, "/m1/stop".to_owned()),
            (Method::DELETE, "/m1?kill=true".to_owned()),
        ]
    );
}

#[tokio::test]
async fn test_lease_scoped_update_and_release() {
    let transport = ScriptedTransport::new(&[
        (200, MACHINE),
        (200, LEASE),
        (200, r#"{"id":"m1","state":"started","version":"v2"}"#),
        (200, ""),
    ]);
    let mut machine = MachineHandle::attach(transport.client(), "m1").await.unwrap();

    let lease = machine.lease(Some(60)).await.unwrap();
    assert_eq!(lease.nonce(), "n1");
    assert_eq!(lease.expires_at(), 1_700_000_060);
    assert_eq!(lease.owner(), "ops@example.com");

    let input = LaunchMachineInput {
        config: MachineConfig {
            image: "nginx:1.27".into(),
            ..Default::default()
        },
        ..Default::default()
    };
    let updated = machine.update(&lease, input).await.unwrap();
    assert_eq!(updated.version, "v2");
    assert_eq!(machine.machine().version, "v2");
    lease.release().await.unwrap();

    let requests = transport.requests();
    assert_eq!(path(&requests[1]), "/m1/lease?ttl=60");
    assert!(requests[1].headers.get(NONCE_HEADER).is_none());

    assert_eq!(path(&requests[2]), "/m1");
    assert_eq!(requests[2].headers[NONCE_HEADER], "n1");
    let body: serde_json::Value =
        serde_json::from_slice(requests[2].body.as_deref().unwrap()).unwrap();
    assert_eq!(body["id"], "m1");

    assert_eq!(requests[3].method, Method::DELETE);
    assert_eq!(path(&requests[3]), "/m1/lease");
    assert_eq!(requests[3].headers[NONCE_HEADER], "n1");
}

#[tokio::test]
async fn test_update_rejects_lease_on_another_machine() {
    const OTHER: &str = r#"{"id":"m2","state":"stopped"}"#;
    let transport = ScriptedTransport::new(&[(200, MACHINE), (200, OTHER), (200, LEASE)]);
    let mut machine = MachineHandle::attach(transport.client(), "m1").await.unwrap();
    let other = MachineHandle::attach(transport.client(), "m2").await.unwrap();
    let lease = other.lease(None).await.unwrap();
    assert_eq!(lease.machine_id(), "m2");

    let err = machine
        .update(&lease, LaunchMachineInput::default())
        .await
        .unwrap_err();
    match err {
        Error::LeaseMismatch {
            machine_id,
            lease_machine_id,
        } => {
            assert_eq!(machine_id, "m1");
            assert_eq!(lease_machine_id, "m2");
        }
        unexpected => panic!("expected LeaseMismatch, got: {unexpected}"),
    }

    assert_eq!(transport.requests().len(), 3);
    assert_eq!(machine.machine().id, "m1");
}

#[tokio::test]
async fn test_lease_without_data_is_unavailable() {
    let transport = ScriptedTransport::new(&[(
        200,
        r#"{"status":"failed","message":"lease currently held by deploy@example.com"}"#,
    )]);
    let err = LeaseGuard::acquire(&transport.client(), "m1", None)
        .await
        .unwrap_err();

    match err {
        Error::LeaseUnavailable {
            machine_id,
            message,
        } => {
            assert_eq!(machine_id, "m1");
            assert_eq!(message, "lease currently held by deploy@example.com");
        }
        other => panic!("expected LeaseUnavailable, got: {other}"),
    }
}

#[tokio::test]
async fn test_lease_conflict_surfaces_status() {
    let transport = ScriptedTransport::new(&[(
        409,
        r#"{"error":"machine already has a lease"}"#,
    )]);
    let err = LeaseGuard::acquire(&transport.client(), "m1", None)
        .await
        .unwrap_err();
    assert_eq!(err.status(), Some(StatusCode::CONFLICT));
}

#[tokio::test]
async fn test_wait_reissues_after_server_window() {
    let transport = ScriptedTransport::new(&[
        (408, r#"{"error":"deadline_exceeded"}"#),
        (408, r#"{"error":"deadline_exceeded"}"#),
        (200, ""),
    ]);
    let client = transport.client();
    let machine = flaps_sdk::types::Machine {
        id: "m1".into(),
        instance_id: "i1".into(),
        ..Default::default()
    };
    let started = tokio::time::Instant::now();
    wait_for_state(&client, &machine, MachineState::Stopped, Duration::from_secs(60))
        .await
        .unwrap();
    assert!(started.elapsed() >= WAIT_RETRY_PAUSE * 2);

    let waits: Vec<_> = transport.requests().iter().map(path).collect();
    assert_eq!(
        waits,
        ["/m1/wait?instance_id=i1&timeout=30&state=stopped"; 3]
    );
}

#[tokio::test]
async fn test_wait_gives_up_at_deadline() {
    let transport = ScriptedTransport::new(&[(408, r#"{"error":"deadline_exceeded"}"#)]);
    let machine = flaps_sdk::types::Machine {
        id: "m1".into(),
        ..Default::default()
    };
    let err = wait_for_state(
        &transport.client(),
        &machine,
        MachineState::Started,
        Duration::ZERO,
    )
    .await
    .unwrap_err();

    assert!(matches!(err, Error::WaitTimeout { .. }));
    assert_eq!(transport.requests().len(), 1);
}

#[tokio::test]
async fn test_wait_does_not_retry_other_errors() {
    let transport = ScriptedTransport::new(&[(404, r#"{"error":"machine not found"}"#)]);
    let machine = flaps_sdk::types::Machine {
        id: "m1".into(),
        ..Default::default()
    };
    let err = wait_for_state(
        &transport.client(),
        &machine,
        MachineState::Started,
        Duration::from_secs(60),
    )
    .await
    .unwrap_err();

    assert_eq!(err.status(), Some(StatusCode::NOT_FOUND));
    assert_eq!(transport.requests().len(), 1);
}
