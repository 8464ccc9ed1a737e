use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::models::user;

#[derive(Debug, Serialize, Deserialize, Validate)]
pub struct SignupReq {
    #[validate(email(message = "Enter a valid email address."))]
    pub email: String,
    pub username: String,
    #[validate(length(min = 8, message = "This password is too short. It must contain at least 8 characters."))]
    pub password: String,
    #[serde(default)]
    #[validate(length(max = 150))]
    pub first_name: String,
    #[serde(default)]
    #[validate(length(max = 150))]
    pub last_name: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct LoginReq {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct UserPublic {
    pub id: i64,
    pub email: String,
    pub username: String,
    pub first_name: String,
    pub last_name: String,
    pub created_at: String,
}

impl From<&user::Model> for UserPublic {
    fn from(m: &user::Model) -> Self {
        Self {
            id: m.id,
            email: m.email.clone(),
            username: m.username.clone(),
            first_name: m.first_name.clone(),
            last_name: m.last_name.clone(),
            created_at: m.created_at.to_rfc3339(),
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct AuthResp {
    pub user: UserPublic,
    /// short-lived access token (JWT)
    pub token: String,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Claims {
    pub sub: i64,
    pub username: String,
    pub token_type: String, // "access" | "refresh"
    pub jti: Uuid,
    pub sid: Uuid,
    pub iat: i64,
    pub exp: i64,
    pub iss: String,
    pub aud: String,
}
