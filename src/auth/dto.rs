use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::auth::repo::User;

/// Raw registration body. Fields are optional so validation can report every
/// missing field at once instead of failing on the first.
#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub email: Option<String>,
    pub username: Option<String>,
    pub password: Option<String>,
    #[serde(rename = "confirmPassword")]
    pub confirm_password: Option<String>,
    pub name: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: Option<String>,
    pub password: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct RefreshRequest {
    pub refresh_token: Option<String>,
}

/// Registration body after shape validation.
#[derive(Debug)]
pub struct RegisterPayload {
    pub email: String,
    pub username: String,
    pub password: String,
    pub confirm_password: String,
    pub name: String,
}

#[derive(Debug)]
pub struct LoginPayload {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct RegisterResponse {
    pub success: bool,
    pub message: String,
}

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub success: bool,
    pub message: String,
    pub access_token: String,
    pub refresh_token: String,
}

#[derive(Debug, Serialize)]
pub struct RefreshResponse {
    pub success: bool,
    pub access_token: String,
}

/// Public part of a user returned to the client. No password material.
#[derive(Debug, Serialize)]
pub struct PublicUser {
    pub id: Uuid,
    pub email: String,
    pub username: String,
    pub name: String,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

impl From<User> for PublicUser {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            email: user.email,
            username: user.username,
            name: user.name,
            created_at: user.created_at,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct MeResponse {
    pub success: bool,
    #[serde(flatten)]
    pub user: PublicUser,
}
