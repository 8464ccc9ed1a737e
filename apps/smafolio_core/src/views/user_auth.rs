use axum::{
    extract::State,
    http::{header, HeaderMap, HeaderValue, StatusCode},
    Json,
};
use chrono::Utc;
use cookie::{Cookie, SameSite};
use rand::rngs::OsRng;
use sea_orm::ActiveValue::NotSet;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, EntityTrait, IntoActiveModel, QueryFilter, Set,
    TransactionTrait,
};
use tracing::info;
use uuid::Uuid;
use validator::Validate;

use crate::auth::{decode_validated, issue_access_jwt, issue_refresh_jwt_and_store, AuthUser};
use crate::error::AppError;
use crate::forms::FieldErrors;
use crate::models::refresh_token::{Column as RTCol, Entity as RT};
use crate::models::user::{self, username_problem, Column as UserCol, Entity as User};
use crate::models::profile;
use crate::serializers::user_auth::{AuthResp, LoginReq, SignupReq, UserPublic};
use crate::AppState;

use argon2::{
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Algorithm as ArgonAlgorithm, Argon2, Params, Version,
};

// ---------- handlers ----------

/// Create the account and its profile together; a user never exists
/// without a profile.
pub async fn signup(
    State(state): State<AppState>,
    Json(req): Json<SignupReq>,
) -> Result<(StatusCode, HeaderMap, Json<AuthResp>), AppError> {
    let mut errors = match req.validate() {
        Ok(()) => FieldErrors::new(),
        Err(e) => e.into(),
    };
    let email = req.email.trim().to_lowercase();
    let username = req.username.trim().to_string();
    if let Some(problem) = username_problem(&username) {
        errors.add("username", problem);
    }
    errors.into_result()?;

    let hash = hash_password(&req.password).map_err(internal)?;
    let now = Utc::now();

    let txn = state.db.begin().await?;
    if User::find()
        .filter(UserCol::Email.eq(&email))
        .one(&txn)
        .await?
        .is_some()
    {
        return Err(conflict("email already exists"));
    }
    if User::find()
        .filter(UserCol::Username.eq(&username))
        .one(&txn)
        .await?
        .is_some()
    {
        return Err(conflict("username already exists"));
    }

    let created = user::ActiveModel {
        id: NotSet,
        email: Set(email),
        username: Set(username),
        first_name: Set(req.first_name.trim().to_string()),
        last_name: Set(req.last_name.trim().to_string()),
        password_hash: Set(hash),
        created_at: Set(now),
        updated_at: Set(now),
    }
    .insert(&txn)
    .await?;

    profile::default_for(created.id).insert(&txn).await?;

    let sid = Uuid::new_v4();
    let access = issue_access_jwt(created.id, &created.username, &state, sid).map_err(internal)?;
    let (refresh, _) =
        issue_refresh_jwt_and_store(&txn, created.id, &created.username, &state, sid).await?;
    txn.commit().await?;

    info!(user_id = created.id, username = %created.username, "user signed up");

    let mut headers = HeaderMap::new();
    headers.insert(header::SET_COOKIE, refresh_cookie(&refresh, &state)?);
    Ok((
        StatusCode::CREATED,
        headers,
        Json(AuthResp {
            user: UserPublic::from(&created),
            token: access,
        }),
    ))
}

pub async fn login(
    State(state): State<AppState>,
    Json(req): Json<LoginReq>,
) -> Result<(StatusCode, HeaderMap, Json<AuthResp>), AppError> {
    let email = req.email.trim().to_lowercase();
    let Some(found) = User::find()
        .filter(UserCol::Email.eq(&email))
        .one(&state.db)
        .await?
    else {
        return Err(unauth());
    };

    if !verify_password(&found.password_hash, &req.password).map_err(internal)? {
        return Err(unauth());
    }

    let sid = Uuid::new_v4();
    let access = issue_access_jwt(found.id, &found.username, &state, sid).map_err(internal)?;
    let (refresh, _) =
        issue_refresh_jwt_and_store(&state.db, found.id, &found.username, &state, sid).await?;

    info!(user_id = found.id, "user logged in");

    let mut headers = HeaderMap::new();
    headers.insert(header::SET_COOKIE, refresh_cookie(&refresh, &state)?);
    Ok((
        StatusCode::OK,
        headers,
        Json(AuthResp {
            user: UserPublic::from(&found),
            token: access,
        }),
    ))
}

pub async fn me(
    State(state): State<AppState>,
    actor: AuthUser,
) -> Result<Json<UserPublic>, AppError> {
    let found = User::find_by_id(actor.id)
        .one(&state.db)
        .await?
        .ok_or(AppError::Unauthenticated)?;
    Ok(Json(UserPublic::from(&found)))
}

/// Rotate the refresh cookie and hand out a fresh access token.
pub async fn refresh(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<(StatusCode, HeaderMap, Json<serde_json::Value>), AppError> {
    let refresh_token =
        cookie_value(&headers, &state.jwt_cfg.cookie_name).ok_or(AppError::Unauthenticated)?;

    let claims = decode_validated(&refresh_token, &state).map_err(|_| AppError::Unauthenticated)?;
    if claims.token_type != "refresh" {
        return Err(AppError::Unauthenticated);
    }

    let row = RT::find()
        .filter(RTCol::Jti.eq(claims.jti))
        .one(&state.db)
        .await?
        .ok_or(AppError::Unauthenticated)?;
    if !row.is_usable(Utc::now()) {
        return Err(AppError::Unauthenticated);
    }

    // the token may predate a username change
    let user = User::find_by_id(claims.sub)
        .one(&state.db)
        .await?
        .ok_or(AppError::Unauthenticated)?;

    let txn = state.db.begin().await?;
    let access = issue_access_jwt(user.id, &user.username, &state, claims.sid).map_err(internal)?;
    let (new_refresh, new_claims) =
        issue_refresh_jwt_and_store(&txn, user.id, &user.username, &state, claims.sid).await?;
    let mut am = row.into_active_model();
    am.replaced_by = Set(Some(new_claims.jti));
    am.revoked_at = Set(Some(Utc::now()));
    am.update(&txn).await?;
    txn.commit().await?;

    let mut out_headers = HeaderMap::new();
    out_headers.insert(header::SET_COOKIE, refresh_cookie(&new_refresh, &state)?);
    Ok((
        StatusCode::OK,
        out_headers,
        Json(serde_json::json!({ "access_token": access })),
    ))
}

pub async fn logout(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<(StatusCode, HeaderMap, Json<serde_json::Value>), AppError> {
    if let Some(refresh_token) = cookie_value(&headers, &state.jwt_cfg.cookie_name) {
        if let Ok(claims) = decode_validated(&refresh_token, &state) {
            if claims.token_type == "refresh" {
                if let Some(found) = RT::find()
                    .filter(RTCol::Jti.eq(claims.jti))
                    .one(&state.db)
                    .await?
                {
                    let mut am = found.into_active_model();
                    am.revoked_at = Set(Some(Utc::now()));
                    am.update(&state.db).await?;
                }
            }
        }
    }
    let mut out = HeaderMap::new();
    out.insert(header::SET_COOKIE, clear_refresh_cookie(&state)?);
    Ok((StatusCode::OK, out, Json(serde_json::json!({ "ok": true }))))
}

// ---------- password hashing ----------
pub(crate) fn hash_password(password: &str) -> Result<String, anyhow::Error> {
    let salt = SaltString::generate(&mut OsRng);
    let argon = argon2_instance()?;
    Ok(argon.hash_password(password.as_bytes(), &salt)?.to_string())
}

pub(crate) fn verify_password(phc: &str, password: &str) -> Result<bool, anyhow::Error> {
    let parsed = PasswordHash::new(phc)?;
    let argon = argon2_instance()?;
    Ok(argon.verify_password(password.as_bytes(), &parsed).is_ok())
}

fn argon2_instance() -> Result<Argon2<'static>, anyhow::Error> {
    // Argon2id, ~19 MiB memory, 2 passes
    let params = Params::new(19456, 2, 1, None)?;
    Ok(Argon2::new(ArgonAlgorithm::Argon2id, Version::V0x13, params))
}

// ---------- cookies ----------
fn cookie_value(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|raw| raw.split(';'))
        .find_map(|kv| {
            kv.trim()
                .strip_prefix(name)
                .and_then(|rest| rest.strip_prefix('='))
                .map(str::to_owned)
        })
}

fn refresh_cookie(value: &str, state: &AppState) -> Result<HeaderValue, AppError> {
    let mut c = Cookie::build((state.jwt_cfg.cookie_name.clone(), value.to_string()))
        .http_only(true)
        .same_site(SameSite::Lax)
        .path("/accounts/")
        .max_age(time::Duration::seconds(state.jwt_cfg.refresh_ttl.num_seconds()))
        .build();
    if state.jwt_cfg.cookie_secure {
        c.set_secure(true);
    }
    if let Some(ref d) = state.jwt_cfg.cookie_domain {
        c.set_domain(d.clone());
    }
    HeaderValue::from_str(&c.to_string()).map_err(internal)
}

fn clear_refresh_cookie(state: &AppState) -> Result<HeaderValue, AppError> {
    let mut c = Cookie::build((state.jwt_cfg.cookie_name.clone(), String::new()))
        .http_only(true)
        .same_site(SameSite::Lax)
        .path("/accounts/")
        .expires(time::OffsetDateTime::UNIX_EPOCH)
        .build();
    if state.jwt_cfg.cookie_secure {
        c.set_secure(true);
    }
    if let Some(ref d) = state.jwt_cfg.cookie_domain {
        c.set_domain(d.clone());
    }
    HeaderValue::from_str(&c.to_string()).map_err(internal)
}

// ---------- small helpers ----------
fn conflict(msg: &str) -> AppError {
    AppError::Conflict(msg.into())
}
fn unauth() -> AppError {
    AppError::Unauthenticated
}
fn internal<E: std::fmt::Display>(e: E) -> AppError {
    AppError::internal(e)
}
