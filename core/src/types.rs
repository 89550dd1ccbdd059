//! DTOs for the users resource.
//!
//! # Design
//! Every field is optional: the same `User` is used as a create payload
//! (no id yet), a partial update, and a decoded response. Absent fields are
//! left out of the JSON so the server never sees explicit nulls. Response
//! fields this crate does not model are ignored on decode.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// An account in the remote directory.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct User {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub firstname: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lastname: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub department: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub company: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    /// 0 unapproved, 1 approved, 2 rejected, 3 unlicensed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub state: Option<i32>,
    /// 0 unactivated, 1 active, 2 suspended, 3 locked, 4 password expired,
    /// 5 awaiting password reset, 7 password pending, 8 security questions
    /// required.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub group_id: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub role_ids: Option<Vec<i32>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub directory_id: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub trusted_idp_id: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub manager_ad_id: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub manager_user_id: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub samaccountname: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub member_of: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub userprincipalname: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub distinguished_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub external_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub openid_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub preferred_locale_code: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub invalid_login_attempts: Option<i32>,

    // Write-only credentials; the server never echoes these back.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub password_confirmation: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub password_algorithm: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub salt: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub activated_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_login: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub password_changed_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub locked_until: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub invitation_sent_at: Option<DateTime<Utc>>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub custom_attributes: Option<HashMap<String, String>>,
}

impl User {
    /// A user carrying only the fields required to create one.
    pub fn new(username: &str, email: &str) -> Self {
        Self {
            username: Some(username.to_string()),
            email: Some(email.to_string()),
            ..Self::default()
        }
    }
}

/// Search criteria for listing users. `UserQuery::default()` matches every
/// user.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct UserQuery {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub limit: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cursor: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_since: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_until: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub updated_since: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub updated_until: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_login_since: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_login_until: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub firstname: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lastname: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub samaccountname: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub directory_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub external_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub app_id: Option<String>,
    /// Comma-separated list of ids.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_ids: Option<String>,
    /// Comma-separated list of fields to return.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fields: Option<String>,
}
