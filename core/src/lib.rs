//! Synchronous client binding for the `users` resource of an identity API.
//!
//! # Overview
//! `UserClient` translates typed calls (query, get_one, create, update,
//! destroy, logout) into `RequestDescriptor` values and hands them to an
//! injected `Transport`, then decodes the JSON body it returns. The crate
//! does no I/O of its own: HTTP, bearer tokens, and retries all belong to
//! the transport.
//!
//! # Design
//! - `Transport` is a trait so tests can substitute deterministic doubles.
//! - Decode failures are returned as `ApiError::Deserialization`.
//! - `create` and `update` return a new `User` rather than mutating the
//!   caller's value.
//! - Logout targets the v1 API (`/api/1/users/{id}/logout`); everything
//!   else targets `/api/2/users`.

pub mod client;
pub mod error;
pub mod http;
pub mod types;

pub use client::UserClient;
pub use error::{ApiError, TransportError};
pub use http::{AuthMethod, HttpMethod, Operation, RequestDescriptor, Transport};
pub use types::{User, UserQuery};
