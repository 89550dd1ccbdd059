use std::{collections::HashMap, sync::Arc};

use axum::{
    extract::{Path, Query, State},
    http::{header, HeaderMap, StatusCode},
    routing::{get, put},
    Json, Router,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use tokio::{net::TcpListener, sync::RwLock};
use tracing::{debug, info};

/// Fields the server owns or never echoes back.
const RESERVED_FIELDS: &[&str] = &[
    "id",
    "created_at",
    "updated_at",
    "password",
    "password_confirmation",
    "password_algorithm",
    "salt",
];

/// Query parameters `GET /api/2/users` filters on.
const FILTER_FIELDS: &[&str] = &[
    "email",
    "username",
    "firstname",
    "lastname",
    "external_id",
    "directory_id",
];

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct User {
    pub id: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(flatten)]
    pub fields: Map<String, Value>,
}

impl User {
    fn matches(&self, key: &str, expected: &str) -> bool {
        match self.fields.get(key) {
            Some(Value::String(s)) => s == expected,
            Some(Value::Number(n)) => n.to_string() == expected,
            _ => false,
        }
    }
}

#[derive(Debug, Default)]
pub struct Store {
    pub users: HashMap<i32, User>,
    pub logouts: Vec<i32>,
    next_id: i32,
}

pub type Db = Arc<RwLock<Store>>;

pub fn new_db() -> Db {
    Arc::new(RwLock::new(Store::default()))
}

pub fn app() -> Router {
    app_with(new_db())
}

pub fn app_with(db: Db) -> Router {
    Router::new()
        .route("/api/2/users", get(list_users).post(create_user))
        .route(
            "/api/2/users/{id}",
            get(get_user).put(update_user).delete(delete_user),
        )
        .route("/api/1/users/{id}/logout", put(logout_user))
        .with_state(db)
}

pub async fn run(listener: TcpListener) -> Result<(), std::io::Error> {
    axum::serve(listener, app()).await
}

/// Any non-empty bearer token is accepted.
fn authorize(headers: &HeaderMap) -> Result<(), StatusCode> {
    let token = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::trim)
        .unwrap_or_default();
    if token.is_empty() {
        return Err(StatusCode::UNAUTHORIZED);
    }
    Ok(())
}

fn strip_reserved(mut input: Map<String, Value>) -> Map<String, Value> {
    for key in RESERVED_FIELDS {
        input.remove(*key);
    }
    input
}

async fn list_users(
    State(db): State<Db>,
    headers: HeaderMap,
    Query(params): Query<HashMap<String, String>>,
) -> Result<Json<Vec<User>>, StatusCode> {
    authorize(&headers)?;
    let limit = match params.get("limit") {
        Some(raw) => raw.parse::<usize>().map_err(|_| StatusCode::BAD_REQUEST)?,
        None => usize::MAX,
    };
    let store = db.read().await;
    let mut users: Vec<User> = store
        .users
        .values()
        .filter(|user| {
            FILTER_FIELDS
                .iter()
                .filter_map(|key| params.get(*key).map(|v| (*key, v)))
                .all(|(key, v)| user.matches(key, v))
        })
        .cloned()
        .collect();
    users.sort_by_key(|u| u.id);
    users.truncate(limit);
    debug!(count = users.len(), "listed users");
    Ok(Json(users))
}

async fn create_user(
    State(db): State<Db>,
    headers: HeaderMap,
    Json(input): Json<Map<String, Value>>,
) -> Result<(StatusCode, Json<User>), StatusCode> {
    authorize(&headers)?;
    if !input.contains_key("email") && !input.contains_key("username") {
        return Err(StatusCode::UNPROCESSABLE_ENTITY);
    }
    let mut store = db.write().await;
    store.next_id += 1;
    let now = Utc::now();
    let user = User {
        id: store.next_id,
        created_at: now,
        updated_at: now,
        fields: strip_reserved(input),
    };
    store.users.insert(user.id, user.clone());
    info!(id = user.id, "created user");
    Ok((StatusCode::CREATED, Json(user)))
}

async fn get_user(
    State(db): State<Db>,
    headers: HeaderMap,
    Path(id): Path<i32>,
) -> Result<Json<User>, StatusCode> {
    authorize(&headers)?;
    let store = db.read().await;
    store.users.get(&id).cloned().map(Json).ok_or(StatusCode::NOT_FOUND)
}

async fn update_user(
    State(db): State<Db>,
    headers: HeaderMap,
    Path(id): Path<i32>,
    Json(input): Json<Map<String, Value>>,
) -> Result<Json<User>, StatusCode> {
    authorize(&headers)?;
    let mut store = db.write().await;
    let user = store.users.get_mut(&id).ok_or(StatusCode::NOT_FOUND)?;
    for (key, value) in strip_reserved(input) {
        if value.is_null() {
            user.fields.remove(&key);
        } else {
            user.fields.insert(key, value);
        }
    }
    user.updated_at = Utc::now();
    info!(id, "updated user");
    Ok(Json(user.clone()))
}

async fn delete_user(
    State(db): State<Db>,
    headers: HeaderMap,
    Path(id): Path<i32>,
) -> Result<StatusCode, StatusCode> {
    authorize(&headers)?;
    let mut store = db.write().await;
    store.users.remove(&id).ok_or(StatusCode::NOT_FOUND)?;
    info!(id, "deleted user");
    Ok(StatusCode::NO_CONTENT)
}

async fn logout_user(
    State(db): State<Db>,
    headers: HeaderMap,
    Path(id): Path<i32>,
) -> Result<Json<Value>, StatusCode> {
    authorize(&headers)?;
    let mut store = db.write().await;
    if !store.users.contains_key(&id) {
        return Err(StatusCode::NOT_FOUND);
    }
    store.logouts.push(id);
    info!(id, "logged out user");
    Ok(Json(json!({
        "status": {"error": false, "code": 200, "type": "success", "message": "Success"}
    })))
}
