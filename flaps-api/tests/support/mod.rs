//! In-memory transport for exercising the client without a network.

#![allow(dead_code)]

use std::pin::Pin;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::task::{Context, Poll};

use bytes::Bytes;
use flaps_api::{
    Client, HttpRequest, HttpResponse, ResponseBody, Transport, TransportError,
};
use futures::future::BoxFuture;
use futures::stream::{self, BoxStream, Stream, StreamExt};
use reqwest::StatusCode;
use reqwest::header::HeaderMap;

pub const HOST: &str = "flaps.internal";
pub const APP: &str = "web";
pub const TOKEN: &str = "fo1_secret";
pub const MACHINES_URL: &str = "http://flaps.internal:4280/v1/apps/web/machines";

/// What the fake answers with.
#[derive(Debug, Clone)]
pub enum Reply {
    Status(u16, &'static str),
    ConnectionRefused,
}

/// Replays one reply for every request and records what was sent.
pub struct FakeTransport {
    reply: Reply,
    requests: Mutex<Vec<HttpRequest>>,
    bodies_released: Arc<AtomicUsize>,
}

impl FakeTransport {
    pub fn new(reply: Reply) -> Arc<Self> {
        Arc::new(Self {
            reply,
            requests: Mutex::new(Vec::new()),
            bodies_released: Arc::new(AtomicUsize::new(0)),
        })
    }

    pub fn client(self: &Arc<Self>) -> Client {
        Client::new_with_transport(HOST, TOKEN, "personal", APP, self.clone())
    }

    pub fn requests(&self) -> Vec<HttpRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub fn last(&self) -> HttpRequest {
        self.requests().pop().expect("no request was sent")
    }

    /// The part of the last URL after `.../machines`.
    pub fn last_suffix(&self) -> String {
        let url = self.last().url.to_string();
        url.strip_prefix(MACHINES_URL)
            .unwrap_or_else(|| panic!("{url} is not machine-scoped"))
            .to_owned()
    }

    pub fn bodies_released(&self) -> usize {
        self.bodies_released.load(Ordering::SeqCst)
    }
}

impl Transport for FakeTransport {
    fn execute(&self, request: HttpRequest) -> BoxFuture<'_, Result<HttpResponse, TransportError>> {
        self.requests.lock().unwrap().push(request);
        let reply = self.reply.clone();
        let released = self.bodies_released.clone();
        Box::pin(async move {
            match reply {
                Reply::Status(status, body) => Ok(HttpResponse {
                    status: StatusCode::from_u16(status)?,
                    headers: HeaderMap::new(),
                    body: ResponseBody::new(TrackedBody {
                        inner: stream::iter([Ok(Bytes::from_static(body.as_bytes()))]).boxed(),
                        released,
                    }),
                }),
                Reply::ConnectionRefused => Err(Box::new(std::io::Error::new(
                    std::io::ErrorKind::ConnectionRefused,
                    "connection refused",
                )) as TransportError),
            }
        })
    }
}

/// Body stream that counts how often it is released.
struct TrackedBody {
    inner: BoxStream<'static, Result<Bytes, TransportError>>,
    released: Arc<AtomicUsize>,
}

impl Stream for TrackedBody {
    type Item = Result<Bytes, TransportError>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.get_mut().inner.poll_next_unpin(cx)
    }
}

impl Drop for TrackedBody {
    fn drop(&mut self) {
        self.released.fetch_add(1, Ordering::SeqCst);
    }
}
