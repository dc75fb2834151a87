//! Endpoint construction and request assembly.

use std::net::Ipv6Addr;

use bytes::Bytes;
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE, HeaderMap, HeaderName, HeaderValue};
use reqwest::{Method, Url};
use serde::Serialize;

use crate::error::{Error, Result};
use crate::transport::HttpRequest;

/// Port the Machines API listens on.
pub const FLAPS_PORT: u16 = 4280;

/// Header carrying the nonce of a held lease.
pub const NONCE_HEADER: &str = "fly-machine-lease-nonce";

/// Placeholder for calls without a request body.
pub(crate) const NO_BODY: Option<&()> = None;

/// Builds URLs under `http://{host}:4280/v1/apps`.
///
/// Path suffixes are appended verbatim: callers embed identifiers and
/// query strings already in URL-safe form. An identifier that URL parsing
/// would rewrite (dot segments, spaces, `#`, non-ASCII) is rejected by
/// [`assemble`] instead of being sent to a different path.
#[derive(Debug, Clone)]
pub(crate) struct Endpoint {
    base: String,
    app_name: String,
}

impl Endpoint {
    pub(crate) fn new(host: &str, app_name: &str) -> Self {
        let host = match host.parse::<Ipv6Addr>() {
            Ok(_) => format!("[{host}]"),
            Err(_) => host.to_owned(),
        };
        Self {
            base: format!("http://{host}:{FLAPS_PORT}/v1/apps"),
            app_name: app_name.to_owned(),
        }
    }

    /// `.../v1/apps/{app}/machines{suffix}`
    pub(crate) fn machines(&self, suffix: &str) -> String {
        format!("{}/{}/machines{suffix}", self.base, self.app_name)
    }

    /// `.../v1/apps`
    pub(crate) fn apps(&self) -> String {
        self.base.clone()
    }
}

/// Extra headers for a single call, applied before the defaults.
#[derive(Debug, Clone, Default)]
pub(crate) struct Headers(Vec<(HeaderName, String)>);

impl Headers {
    pub(crate) fn none() -> Self {
        Self::default()
    }

    /// The lease nonce header, or nothing when the nonce is absent or empty.
    pub(crate) fn lease_nonce(nonce: Option<&str>) -> Self {
        match nonce {
            Some(nonce) if !nonce.is_empty() => {
                Self(vec![(HeaderName::from_static(NONCE_HEADER), nonce.to_owned())])
            }
            _ => Self::none(),
        }
    }

    pub(crate) fn has_nonce(&self) -> bool {
        self.0.iter().any(|(name, _)| name == NONCE_HEADER)
    }
}

/// Assemble a transport request.
///
/// Caller headers go in first; `Content-Type` (only with a body) and
/// `Authorization` are applied last so they always win.
///
/// Fails with [`Error::InvalidRequest`] when the parsed URL's path and
/// query differ from the text given.
pub(crate) fn assemble<B>(
    method: Method,
    url: &str,
    body: Option<&B>,
    headers: &Headers,
    token: &str,
) -> Result<HttpRequest>
where
    B: Serialize + ?Sized,
{
    let body = body
        .map(|body| serde_json::to_vec(body).map(Bytes::from))
        .transpose()
        .map_err(Error::Serialization)?;

    let raw = url;
    let url = Url::parse(raw).map_err(|e| Error::InvalidRequest(format!("{raw}: {e}")))?;
    if target(&url) != raw_target(raw) {
        return Err(Error::InvalidRequest(format!(
            "{raw}: path would be sent as {}",
            target(&url)
        )));
    }

    let mut map = HeaderMap::new();
    for (name, value) in &headers.0 {
        let value = HeaderValue::from_str(value)
            .map_err(|e| Error::InvalidRequest(format!("header {name}: {e}")))?;
        map.append(name.clone(), value);
    }
    if body.is_some() {
        map.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
    }
    let mut auth = HeaderValue::from_str(&format!("Bearer {token}"))
        .map_err(|e| Error::InvalidRequest(format!("authorization token: {e}")))?;
    auth.set_sensitive(true);
    map.insert(AUTHORIZATION, auth);

    Ok(HttpRequest {
        method,
        url,
        headers: map,
        body,
    })
}

/// Path and query of a parsed URL, as it goes on the wire.
fn target(url: &Url) -> String {
    match url.query() {
        Some(query) => format!("{}?{query}", url.path()),
        None => url.path().to_owned(),
    }
}

/// Everything after the authority of an unparsed URL.
fn raw_target(raw: &str) -> &str {
    let rest = raw.split_once("://").map_or(raw, |(_, rest)| rest);
    match rest.find('/') {
        Some(start) => &rest[start..],
        None => "/",
    }
}
