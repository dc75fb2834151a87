use reqwest::StatusCode;

use crate::transport::TransportError;

/// Errors returned by the Machines API client.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The request payload could not be encoded as JSON. No request was sent.
    #[error("failed to encode request body: {0}")]
    Serialization(#[source] serde_json::Error),

    /// The request could not be assembled (bad URL or header value). No request was sent.
    #[error("could not create new request, {0}")]
    InvalidRequest(String),

    /// The transport failed. The error is carried as the transport produced it.
    #[error(transparent)]
    Transport(TransportError),

    /// A success response carried a body that is not the expected JSON.
    #[error("failed to decode response body: {0}")]
    Decode(#[source] serde_json::Error),

    /// The API rejected the request with a 4xx or 5xx status.
    ///
    /// The display text is the server-provided message alone.
    #[error("{message}")]
    Api { status: StatusCode, message: String },

    /// A 1xx or 3xx status, which this API never returns legitimately.
    #[error("API returned unexpected status, {0}")]
    UnexpectedStatus(u16),

    /// A 4xx or 5xx status whose body is not the API error shape.
    #[error("request returned non-2xx status, {0}")]
    UndecodableErrorBody(u16),

    /// A status outside every known class.
    #[error("something went terribly wrong")]
    Unexpected,

    /// Any of the above, annotated with the operation that failed.
    #[error("{context}: {source}")]
    Context {
        context: String,
        #[source]
        source: Box<Error>,
    },
}

impl Error {
    pub(crate) fn context(self, context: impl Into<String>) -> Self {
        Self::Context {
            context: context.into(),
            source: Box::new(self),
        }
    }

    /// The error beneath any operation context.
    pub fn root(&self) -> &Error {
        match self {
            Self::Context { source, .. } => source.root(),
            other => other,
        }
    }

    /// The HTTP status behind this error, if the server answered at all.
    pub fn status(&self) -> Option<StatusCode> {
        match self.root() {
            Self::Api { status, .. } => Some(*status),
            Self::UnexpectedStatus(code) | Self::UndecodableErrorBody(code) => {
                StatusCode::from_u16(*code).ok()
            }
            _ => None,
        }
    }

    /// The unmodified transport error, if the transport failed.
    pub fn transport(&self) -> Option<&TransportError> {
        match self.root() {
            Self::Transport(err) => Some(err),
            _ => None,
        }
    }

    /// Whether the server answered 404.
    pub fn is_not_found(&self) -> bool {
        self.status() == Some(StatusCode::NOT_FOUND)
    }
}

pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_context_preserves_root_and_status() {
        let err = Error::Api {
            status: StatusCode::CONFLICT,
            message: "lease held by another owner".into(),
        }
        .context("failed to update VM m1");

        assert_eq!(
            err.to_string(),
            "failed to update VM m1: lease held by another owner"
        );
        assert_eq!(err.status(), Some(StatusCode::CONFLICT));
        assert!(matches!(err.root(), Error::Api { .. }));
        assert!(err.transport().is_none());
    }

    #[test]
    fn test_transport_error_is_reachable_through_context() {
        let io = std::io::Error::new(std::io::ErrorKind::ConnectionRefused, "refused");
        let err = Error::Transport(Box::new(io)).context("failed to get VM m1");

        let source = err.transport().unwrap();
        let io = source.downcast_ref::<std::io::Error>().unwrap();
        assert_eq!(io.kind(), std::io::ErrorKind::ConnectionRefused);
        assert_eq!(err.status(), None);
    }
}
