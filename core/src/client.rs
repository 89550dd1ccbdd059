//! Typed operations on the users resource.
//!
//! # Design
//! `UserClient` holds a transport plus the two URLs it derives from the
//! host. Each operation is split into a `build_*` method producing the
//! `RequestDescriptor` and a call through the `Transport`, followed by JSON
//! decoding of the returned body. Create and update return a fresh `User`
//! instead of mutating the caller's value.

use serde_json::Value;
use tracing::{debug, warn};

use crate::error::ApiError;
use crate::http::{RequestDescriptor, Transport};
use crate::types::{User, UserQuery};

/// Client for `<host>/api/2/users`.
#[derive(Debug, Clone)]
pub struct UserClient<T> {
    transport: T,
    host: String,
    endpoint: String,
}

impl<T: Transport> UserClient<T> {
    pub fn new(transport: T, host: &str) -> Self {
        let host = host.trim_end_matches('/').to_string();
        Self {
            transport,
            endpoint: format!("{host}/api/2/users"),
            host,
        }
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn build_query(&self, query: &UserQuery) -> Result<RequestDescriptor, ApiError> {
        let payload = serde_json::to_value(query).map_err(ApiError::Serialization)?;
        Ok(RequestDescriptor::json(self.endpoint.clone()).with_payload(payload))
    }

    pub fn build_get_one(&self, id: i32) -> RequestDescriptor {
        RequestDescriptor::json(format!("{}/{id}", self.endpoint))
    }

    pub fn build_create(&self, user: &User) -> Result<RequestDescriptor, ApiError> {
        let payload = serde_json::to_value(user).map_err(ApiError::Serialization)?;
        Ok(RequestDescriptor::json(self.endpoint.clone()).with_payload(payload))
    }

    /// Fails with `ApiError::MissingId` when `user.id` is absent.
    pub fn build_update(&self, user: &User) -> Result<RequestDescriptor, ApiError> {
        let id = user.id.ok_or(ApiError::MissingId)?;
        let payload = serde_json::to_value(user).map_err(ApiError::Serialization)?;
        Ok(RequestDescriptor::json(format!("{}/{id}", self.endpoint)).with_payload(payload))
    }

    pub fn build_destroy(&self, id: i32) -> RequestDescriptor {
        RequestDescriptor::json(format!("{}/{id}", self.endpoint))
    }

    /// Logout lives under the v1 API, not the v2 endpoint.
    pub fn build_logout(&self, id: i32) -> RequestDescriptor {
        RequestDescriptor::json(format!("{}/api/1/users/{id}/logout", self.host))
    }

    /// List users matching `query`. An empty query returns every user.
    pub fn query(&self, query: &UserQuery) -> Result<Vec<User>, ApiError> {
        let req = self.build_query(query)?;
        debug!(url = %req.url, "querying users");
        let body = self.transport.read(req)?;
        decode(&body)
    }

    pub fn get_one(&self, id: i32) -> Result<User, ApiError> {
        let req = self.build_get_one(id);
        debug!(url = %req.url, id, "fetching user");
        let body = self.transport.read(req)?;
        decode(&body)
    }

    /// Create `user` remotely and return it with the server-assigned fields
    /// filled in.
    pub fn create(&self, user: &User) -> Result<User, ApiError> {
        let req = self.build_create(user)?;
        debug!(url = %req.url, "creating user");
        let body = self.transport.create(req)?;
        merge_response(user, &body)
    }

    /// Update `user` remotely and return the server's view of it.
    pub fn update(&self, user: &User) -> Result<User, ApiError> {
        let req = self.build_update(user).inspect_err(|e| {
            if matches!(e, ApiError::MissingId) {
                warn!("refusing to update user without an id");
            }
        })?;
        debug!(url = %req.url, "updating user");
        let body = self.transport.update(req)?;
        merge_response(user, &body)
    }

    pub fn destroy(&self, id: i32) -> Result<(), ApiError> {
        let req = self.build_destroy(id);
        debug!(url = %req.url, id, "deleting user");
        self.transport.destroy(req)?;
        Ok(())
    }

    /// Terminate every session of user `id`.
    pub fn logout(&self, id: i32) -> Result<(), ApiError> {
        let req = self.build_logout(id);
        debug!(url = %req.url, id, "logging out user");
        self.transport.update(req)?;
        Ok(())
    }
}

fn decode<D: serde::de::DeserializeOwned>(body: &[u8]) -> Result<D, ApiError> {
    serde_json::from_slice(body).map_err(|e| {
        warn!(error = %e, "could not decode users response");
        ApiError::Deserialization(e)
    })
}

/// Overlay the fields of a JSON object response onto `user`. Fields the
/// server leaves out keep the submitted values.
fn merge_response(user: &User, body: &[u8]) -> Result<User, ApiError> {
    let mut merged = serde_json::to_value(user).map_err(ApiError::Serialization)?;
    let response: Value = decode(body)?;
    match (merged.as_object_mut(), response) {
        (Some(fields), Value::Object(returned)) => fields.extend(returned),
        (_, other) => return serde_json::from_value(other).map_err(ApiError::Deserialization),
    }
    serde_json::from_value(merged).map_err(ApiError::Deserialization)
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use serde_json::json;

    use super::*;
    use crate::error::TransportError;
    use crate::http::{AuthMethod, Operation};

    const HOST: &str = "https://example.onelogin.com";

    /// Records every request and answers with a canned result.
    struct RecordingTransport {
        response: Result<Vec<u8>, TransportError>,
        calls: Mutex<Vec<(Operation, RequestDescriptor)>>,
    }

    impl RecordingTransport {
        fn ok(body: &str) -> Self {
            Self {
                response: Ok(body.as_bytes().to_vec()),
                calls: Mutex::new(Vec::new()),
            }
        }

        fn failing(err: TransportError) -> Self {
            Self {
                response: Err(err),
                calls: Mutex::new(Vec::new()),
            }
        }

        fn record(
            &self,
            op: Operation,
            req: RequestDescriptor,
        ) -> Result<Vec<u8>, TransportError> {
            self.calls.lock().unwrap().push((op, req));
            self.response.clone()
        }

        fn calls(&self) -> Vec<(Operation, RequestDescriptor)> {
            self.calls.lock().unwrap().clone()
        }
    }

    impl Transport for RecordingTransport {
        fn read(&self, req: RequestDescriptor) -> Result<Vec<u8>, TransportError> {
            self.record(Operation::Read, req)
        }
        fn create(&self, req: RequestDescriptor) -> Result<Vec<u8>, TransportError> {
            self.record(Operation::Create, req)
        }
        fn update(&self, req: RequestDescriptor) -> Result<Vec<u8>, TransportError> {
            self.record(Operation::Update, req)
        }
        fn destroy(&self, req: RequestDescriptor) -> Result<Vec<u8>, TransportError> {
            self.record(Operation::Destroy, req)
        }
    }

    fn client(transport: &RecordingTransport) -> UserClient<&RecordingTransport> {
        UserClient::new(transport, HOST)
    }

    fn only_call(transport: &RecordingTransport) -> (Operation, RequestDescriptor) {
        let mut calls = transport.calls();
        assert_eq!(calls.len(), 1, "expected exactly one transport call");
        calls.remove(0)
    }

    #[test]
    fn endpoint_is_derived_from_host() {
        let t = RecordingTransport::ok("");
        let c = UserClient::new(&t, "https://example.onelogin.com/");
        assert_eq!(c.host(), HOST);
        assert_eq!(c.endpoint(), "https://example.onelogin.com/api/2/users");
    }

    #[test]
    fn query_with_empty_criteria_sends_empty_payload() {
        let t = RecordingTransport::ok(r#"[{"id":1},{"id":2}]"#);
        let users = client(&t).query(&UserQuery::default()).unwrap();
        assert_eq!(users.len(), 2);
        assert_eq!(users[1].id, Some(2));

        let (op, req) = only_call(&t);
        assert_eq!(op, Operation::Read);
        assert_eq!(req.url, format!("{HOST}/api/2/users"));
        assert_eq!(req.payload, Some(json!({})));
    }

    #[test]
    fn query_sends_criteria_as_payload() {
        let t = RecordingTransport::ok("[]");
        let query = UserQuery {
            email: Some("jdoe@example.com".to_string()),
            ..UserQuery::default()
        };
        let users = client(&t).query(&query).unwrap();
        assert!(users.is_empty());
        let (_, req) = only_call(&t);
        assert_eq!(req.payload, Some(json!({"email": "jdoe@example.com"})));
    }

    #[test]
    fn query_surfaces_decode_failure() {
        let t = RecordingTransport::ok("not json");
        let err = client(&t).query(&UserQuery::default()).unwrap_err();
        assert!(matches!(err, ApiError::Deserialization(_)));
    }

    #[test]
    fn get_one_targets_id_url() {
        let t = RecordingTransport::ok(r#"{"id":7,"username":"seven"}"#);
        let user = client(&t).get_one(7).unwrap();
        assert_eq!(user.id, Some(7));
        assert_eq!(user.username.as_deref(), Some("seven"));

        let (op, req) = only_call(&t);
        assert_eq!(op, Operation::Read);
        assert_eq!(req.url, format!("{HOST}/api/2/users/7"));
        assert!(req.payload.is_none());
    }

    #[test]
    fn get_one_surfaces_decode_failure() {
        let t = RecordingTransport::ok(r#"{"id":"seven"}"#);
        let err = client(&t).get_one(7).unwrap_err();
        assert!(matches!(err, ApiError::Deserialization(_)));
    }

    #[test]
    fn create_returns_server_fields_merged_over_input() {
        let t = RecordingTransport::ok(r#"{"id":99,"status":1}"#);
        let mut input = User::new("jdoe", "jdoe@example.com");
        input.firstname = Some("Jane".to_string());

        let created = client(&t).create(&input).unwrap();
        assert_eq!(created.id, Some(99));
        assert_eq!(created.status, Some(1));
        assert_eq!(created.firstname.as_deref(), Some("Jane"));
        assert_eq!(created.email.as_deref(), Some("jdoe@example.com"));
        assert!(input.id.is_none(), "caller's value must not change");

        let (op, req) = only_call(&t);
        assert_eq!(op, Operation::Create);
        assert_eq!(req.url, format!("{HOST}/api/2/users"));
        assert_eq!(
            req.payload,
            Some(json!({"username": "jdoe", "email": "jdoe@example.com", "firstname": "Jane"}))
        );
    }

    #[test]
    fn create_null_in_response_clears_field() {
        let t = RecordingTransport::ok(r#"{"id":5,"comment":null}"#);
        let mut input = User::new("a", "a@b.c");
        input.comment = Some("temp".to_string());
        let created = client(&t).create(&input).unwrap();
        assert!(created.comment.is_none());
    }

    #[test]
    fn create_rejects_non_object_response() {
        let t = RecordingTransport::ok("\"ok\"");
        let err = client(&t).create(&User::new("a", "a@b.c")).unwrap_err();
        assert!(matches!(err, ApiError::Deserialization(_)));
    }

    #[test]
    fn update_without_id_fails_before_transport() {
        let t = RecordingTransport::ok("{}");
        let err = client(&t).update(&User::new("a", "a@b.c")).unwrap_err();
        assert!(matches!(err, ApiError::MissingId));
        assert!(t.calls().is_empty());
    }

    #[test]
    fn update_targets_exact_id() {
        let t = RecordingTransport::ok(r#"{"id":1234,"title":"Engineer"}"#);
        let mut user = User::new("a", "a@b.c");
        user.id = Some(1234);
        user.title = Some("Engineer".to_string());

        let updated = client(&t).update(&user).unwrap();
        assert_eq!(updated.title.as_deref(), Some("Engineer"));

        let (op, req) = only_call(&t);
        assert_eq!(op, Operation::Update);
        assert_eq!(req.url, format!("{HOST}/api/2/users/1234"));
        assert_eq!(req.payload.unwrap()["id"], 1234);
    }

    #[test]
    fn destroy_ignores_body() {
        let t = RecordingTransport::ok("not json at all");
        client(&t).destroy(3).unwrap();
        let (op, req) = only_call(&t);
        assert_eq!(op, Operation::Destroy);
        assert_eq!(req.url, format!("{HOST}/api/2/users/3"));
    }

    #[test]
    fn destroy_passes_transport_failure_through() {
        let t = RecordingTransport::failing(TransportError::NotFound);
        let err = client(&t).destroy(404).unwrap_err();
        assert!(matches!(err, ApiError::Transport(TransportError::NotFound)));
    }

    #[test]
    fn logout_uses_legacy_api_version() {
        let t = RecordingTransport::ok("");
        client(&t).logout(12).unwrap();
        let (op, req) = only_call(&t);
        assert_eq!(op, Operation::Update);
        assert_eq!(req.url, format!("{HOST}/api/1/users/12/logout"));
        assert!(!req.url.starts_with(client(&t).endpoint()));
        assert!(req.payload.is_none());
    }

    #[test]
    fn every_request_is_bearer_json() {
        let t = RecordingTransport::ok("{}");
        let c = client(&t);
        let mut user = User::new("a", "a@b.c");
        user.id = Some(1);
        let requests = vec![
            c.build_query(&UserQuery::default()).unwrap(),
            c.build_get_one(1),
            c.build_create(&user).unwrap(),
            c.build_update(&user).unwrap(),
            c.build_destroy(1),
            c.build_logout(1),
        ];
        for req in requests {
            assert_eq!(req.auth_method, AuthMethod::Bearer, "{}", req.url);
            assert_eq!(
                req.headers,
                vec![("Content-Type".to_string(), "application/json".to_string())]
            );
        }
    }

    #[test]
    fn transport_failures_propagate_unchanged() {
        let failure = TransportError::Status {
            status: 500,
            body: "internal error".to_string(),
        };
        let t = RecordingTransport::failing(failure.clone());
        let err = client(&t).get_one(1).unwrap_err();
        match err {
            ApiError::Transport(inner) => assert_eq!(inner, failure),
            other => panic!("unexpected error: {other}"),
        }
    }
}
