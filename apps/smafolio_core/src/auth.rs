//! Bearer-token identity: JWT issue/verify and the request extractors the
//! portfolio views use to learn who is asking.

use std::convert::Infallible;

use axum::{
    extract::FromRequestParts,
    http::{header, request::Parts, HeaderMap},
};
use chrono::{Duration as ChronoDuration, Utc};
use jsonwebtoken::{Algorithm, Header as JwtHeader, Validation};
use sea_orm::{ActiveModelTrait, ActiveValue::NotSet, ConnectionTrait, Set};
use uuid::Uuid;

use crate::error::AppError;
use crate::models::refresh_token::ActiveModel as RTActive;
use crate::serializers::user_auth::Claims;
use crate::AppState;

const ISSUER: &str = "smafolio";
const AUDIENCE: &str = "smafolio-app";

/// An authenticated request. Rejects with 401 when no valid access token is
/// presented.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AuthUser {
    pub id: i64,
    pub username: String,
}

impl FromRequestParts<AppState> for AuthUser {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let claims = auth_from_header(state, &parts.headers)?;
        Ok(AuthUser {
            id: claims.sub,
            username: claims.username,
        })
    }
}

/// Whoever is looking at a public page; anonymous when the token is absent
/// or unusable.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Viewer(pub Option<AuthUser>);

impl Viewer {
    pub fn id(&self) -> Option<i64> {
        self.0.as_ref().map(|u| u.id)
    }
}

impl FromRequestParts<AppState> for Viewer {
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        Ok(Viewer(
            AuthUser::from_request_parts(parts, state).await.ok(),
        ))
    }
}

pub fn auth_from_header(state: &AppState, headers: &HeaderMap) -> Result<Claims, AppError> {
    let token = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|h| h.strip_prefix("Bearer "))
        .ok_or(AppError::Unauthenticated)?;
    let claims = decode_validated(token, state).map_err(|_| AppError::Unauthenticated)?;
    if claims.token_type != "access" {
        return Err(AppError::Unauthenticated);
    }
    Ok(claims)
}

fn base_claims(
    user_id: i64,
    username: &str,
    token_type: &str,
    ttl: ChronoDuration,
    sid: Uuid,
) -> Claims {
    let now = Utc::now();
    Claims {
        sub: user_id,
        username: username.to_string(),
        token_type: token_type.to_string(),
        jti: Uuid::new_v4(),
        sid,
        iat: now.timestamp(),
        exp: (now + ttl).timestamp(),
        iss: ISSUER.into(),
        aud: AUDIENCE.into(),
    }
}

pub fn issue_access_jwt(
    user_id: i64,
    username: &str,
    state: &AppState,
    sid: Uuid,
) -> Result<String, jsonwebtoken::errors::Error> {
    let claims = base_claims(user_id, username, "access", state.jwt_cfg.access_ttl, sid);
    jsonwebtoken::encode(&JwtHeader::new(Algorithm::HS256), &claims, &state.jwt_enc)
}

/// Issue a refresh token and persist its row so it can be rotated or revoked.
pub async fn issue_refresh_jwt_and_store<C: ConnectionTrait>(
    db: &C,
    user_id: i64,
    username: &str,
    state: &AppState,
    sid: Uuid,
) -> Result<(String, Claims), AppError> {
    let now = Utc::now();
    let claims = base_claims(user_id, username, "refresh", state.jwt_cfg.refresh_ttl, sid);
    let token = jsonwebtoken::encode(&JwtHeader::new(Algorithm::HS256), &claims, &state.jwt_enc)
        .map_err(AppError::internal)?;

    RTActive {
        id: NotSet,
        user_id: Set(user_id),
        jti: Set(claims.jti),
        session_id: Set(sid),
        issued_at: Set(now),
        expires_at: Set(now + state.jwt_cfg.refresh_ttl),
        revoked_at: Set(None),
        replaced_by: Set(None),
    }
    .insert(db)
    .await?;
    Ok((token, claims))
}

pub fn decode_validated(
    token: &str,
    state: &AppState,
) -> Result<Claims, jsonwebtoken::errors::Error> {
    let mut v = Validation::new(Algorithm::HS256);
    v.validate_exp = true;
    v.set_audience(&[AUDIENCE]);
    v.set_issuer(&[ISSUER]);
    jsonwebtoken::decode::<Claims>(token, &state.jwt_dec, &v).map(|d| d.claims)
}
