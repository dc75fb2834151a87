//! Response handling: success decoding and error classification.

use serde::de::DeserializeOwned;

use crate::error::{Error, Result};
use crate::transport::{HttpResponse, ResponseBody};
use crate::types::ApiErrorBody;

/// Decode a success body as JSON.
pub(crate) async fn decode<T: DeserializeOwned>(body: ResponseBody) -> Result<T> {
    let bytes = body.collect().await.map_err(Error::Transport)?;
    serde_json::from_slice(&bytes).map_err(Error::Decode)
}

/// Turn a non-2xx response into an error. Consumes the body.
pub(crate) async fn classify(response: HttpResponse) -> Error {
    let status = response.status;
    match status.as_u16() / 100 {
        1 | 3 => Error::UnexpectedStatus(status.as_u16()),
        4 | 5 => {
            let parsed = match response.body.collect().await {
                Ok(bytes) => serde_json::from_slice::<ApiErrorBody>(&bytes).ok(),
                Err(_) => None,
            };
            let Some(body) = parsed else {
                return Error::UndecodableErrorBody(status.as_u16());
            };
            let message = if body.message.is_empty() {
                body.error
            } else {
                body.message
            };
            tracing::warn!(status = %status, %message, "machines API returned an error");
            Error::Api { status, message }
        }
        _ => Error::Unexpected,
    }
}
