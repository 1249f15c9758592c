//! Error types for the request builder and its promises.
//!
//! # Design
//! A single enum covers the three failure families: configuration errors
//! recorded while chaining, failures of the dispatched request (transport,
//! status, payload), and precondition failures raised by the `require_*`
//! accessors. The enum is `Clone` because a settled error is shared by every
//! observer of a promise.
//!
//! `NotFound` gets a dedicated variant because callers frequently distinguish
//! "the resource does not exist" from "the server returned an unexpected
//! status." All other non-2xx responses land in `HttpError` with the raw
//! status code and body for debugging.

use thiserror::Error;

/// Errors produced by `EchoBuilder` and `EchoPromise`.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EchoError {
    /// A chain method received a value it cannot use (unknown verb, bad
    /// placeholder name). Recorded on the builder and reported by `execute`.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// A `require_*` accessor was called while its field is absent.
    #[error("missing {0}")]
    PreconditionFailed(&'static str),

    /// The server returned 404.
    #[error("resource not found")]
    NotFound,

    /// The server returned a non-2xx status other than 404.
    #[error("HTTP {status}: {body}")]
    HttpError { status: u16, body: String },

    /// The transport could not complete the round-trip.
    #[error("transport failed: {0}")]
    Transport(String),

    /// The request body could not be serialized to JSON.
    #[error("serialization failed: {0}")]
    SerializationError(String),

    /// The response body could not be deserialized into the expected type.
    #[error("deserialization failed: {0}")]
    DeserializationError(String),

    /// `execute` was called outside of a tokio runtime.
    #[error("no async runtime available to dispatch the request")]
    NoRuntime,

    /// The settlement task was torn down before the request settled.
    #[error("request was dropped before it settled")]
    Aborted,
}

impl EchoError {
    /// Whether this error was recorded while configuring the builder, as
    /// opposed to produced by the dispatched request.
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            EchoError::InvalidArgument(_) | EchoError::SerializationError(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_includes_status_and_body() {
        let err = EchoError::HttpError {
            status: 503,
            body: "unavailable".to_string(),
        };
        assert_eq!(err.to_string(), "HTTP 503: unavailable");
    }

    #[test]
    fn precondition_names_missing_field() {
        assert_eq!(
            EchoError::PreconditionFailed("data").to_string(),
            "missing data"
        );
    }

    #[test]
    fn configuration_errors_are_classified() {
        assert!(EchoError::InvalidArgument("verb".into()).is_configuration());
        assert!(EchoError::SerializationError("x".into()).is_configuration());
        assert!(!EchoError::NotFound.is_configuration());
        assert!(!EchoError::Transport("reset".into()).is_configuration());
    }
}
