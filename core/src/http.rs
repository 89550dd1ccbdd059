//! Request descriptors and the transport contract.
//!
//! # Design
//! The client never performs I/O itself. Each operation is described as a
//! `RequestDescriptor` and handed to a `Transport`, which owns the actual
//! HTTP round-trip, token acquisition, and status handling. Transports
//! return the raw response body; decoding stays in the client.

use std::sync::Arc;

use serde_json::Value;

use crate::error::TransportError;

/// HTTP method a transport should use for an `Operation`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HttpMethod {
    Get,
    Post,
    Put,
    Delete,
}

/// The four verbs of the transport contract.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    Read,
    Create,
    Update,
    Destroy,
}

impl Operation {
    pub fn method(self) -> HttpMethod {
        match self {
            Operation::Read => HttpMethod::Get,
            Operation::Create => HttpMethod::Post,
            Operation::Update => HttpMethod::Put,
            Operation::Destroy => HttpMethod::Delete,
        }
    }
}

/// How the transport should authenticate the request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthMethod {
    /// Attach an `Authorization: Bearer <token>` header.
    Bearer,
}

impl AuthMethod {
    pub fn as_str(self) -> &'static str {
        match self {
            AuthMethod::Bearer => "bearer",
        }
    }
}

/// One HTTP exchange described as plain data.
///
/// For `Operation::Read` the payload is expected to be a JSON object whose
/// fields the transport turns into query parameters; for the other
/// operations it is sent as the JSON body.
#[derive(Debug, Clone, PartialEq)]
pub struct RequestDescriptor {
    pub url: String,
    pub headers: Vec<(String, String)>,
    pub auth_method: AuthMethod,
    pub payload: Option<Value>,
}

impl RequestDescriptor {
    /// Bearer-authenticated JSON request with no payload.
    pub fn json(url: String) -> Self {
        Self {
            url,
            headers: vec![("Content-Type".to_string(), "application/json".to_string())],
            auth_method: AuthMethod::Bearer,
            payload: None,
        }
    }

    pub fn with_payload(mut self, payload: Value) -> Self {
        self.payload = Some(payload);
        self
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

/// Capability interface performing the actual I/O for `UserClient`.
///
/// Implementations return the raw response body on success and a
/// `TransportError` for anything else, including non-2xx statuses.
pub trait Transport {
    fn read(&self, request: RequestDescriptor) -> Result<Vec<u8>, TransportError>;
    fn create(&self, request: RequestDescriptor) -> Result<Vec<u8>, TransportError>;
    fn update(&self, request: RequestDescriptor) -> Result<Vec<u8>, TransportError>;
    fn destroy(&self, request: RequestDescriptor) -> Result<Vec<u8>, TransportError>;

    /// Dispatch by `Operation`.
    fn execute(
        &self,
        operation: Operation,
        request: RequestDescriptor,
    ) -> Result<Vec<u8>, TransportError> {
        match operation {
            Operation::Read => self.read(request),
            Operation::Create => self.create(request),
            Operation::Update => self.update(request),
            Operation::Destroy => self.destroy(request),
        }
    }
}

macro_rules! forward_transport {
    ($($ty:ty),*) => {$(
        impl<T: Transport + ?Sized> Transport for $ty {
            fn read(&self, request: RequestDescriptor) -> Result<Vec<u8>, TransportError> {
                (**self).read(request)
            }
            fn create(&self, request: RequestDescriptor) -> Result<Vec<u8>, TransportError> {
                (**self).create(request)
            }
            fn update(&self, request: RequestDescriptor) -> Result<Vec<u8>, TransportError> {
                (**self).update(request)
            }
            fn destroy(&self, request: RequestDescriptor) -> Result<Vec<u8>, TransportError> {
                (**self).destroy(request)
            }
        }
    )*};
}

forward_transport!(&T, Box<T>, Arc<T>);
