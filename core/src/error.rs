//! Error types for the users client.
//!
//! # Design
//! `TransportError` is what a `Transport` reports; the client passes it
//! through untouched inside `ApiError::Transport`. Everything else in
//! `ApiError` originates in the client: a missing id caught before any
//! request, or JSON that could not be encoded or decoded.

use thiserror::Error;

/// Failures reported by a `Transport` implementation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransportError {
    /// The server returned 404.
    #[error("resource not found")]
    NotFound,

    /// The server returned 401.
    #[error("unauthorized")]
    Unauthorized,

    /// The server returned another non-2xx status.
    #[error("HTTP {status}: {body}")]
    Status { status: u16, body: String },

    /// The request never produced a response.
    #[error("connection failed: {0}")]
    Connection(String),
}

impl TransportError {
    /// Map a response status to `Ok(())` or the matching variant.
    pub fn check_status(status: u16, body: &str) -> Result<(), TransportError> {
        match status {
            200..=299 => Ok(()),
            401 => Err(TransportError::Unauthorized),
            404 => Err(TransportError::NotFound),
            _ => Err(TransportError::Status {
                status,
                body: body.to_string(),
            }),
        }
    }
}

/// Errors returned by `UserClient` operations.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// `update` was called on a user without an id.
    #[error("no user id given")]
    MissingId,

    /// The request payload could not be serialized to JSON.
    #[error("serialization failed: {0}")]
    Serialization(#[source] serde_json::Error),

    /// The response body could not be deserialized into the expected type.
    #[error("deserialization failed: {0}")]
    Deserialization(#[source] serde_json::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn check_status_accepts_2xx() {
        assert!(TransportError::check_status(200, "").is_ok());
        assert!(TransportError::check_status(201, "").is_ok());
        assert!(TransportError::check_status(204, "").is_ok());
    }

    #[test]
    fn check_status_maps_known_failures() {
        assert_eq!(
            TransportError::check_status(404, ""),
            Err(TransportError::NotFound)
        );
        assert_eq!(
            TransportError::check_status(401, "nope"),
            Err(TransportError::Unauthorized)
        );
        assert_eq!(
            TransportError::check_status(500, "boom"),
            Err(TransportError::Status {
                status: 500,
                body: "boom".to_string()
            })
        );
    }

    #[test]
    fn transport_error_display_is_passed_through() {
        let err = ApiError::from(TransportError::Status {
            status: 503,
            body: "down".to_string(),
        });
        assert_eq!(err.to_string(), "HTTP 503: down");
        assert_eq!(ApiError::MissingId.to_string(), "no user id given");
    }
}
