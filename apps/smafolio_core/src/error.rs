use std::collections::BTreeMap;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use sea_orm::DbErr;
use serde::{Deserialize, Serialize};
use tracing::error;

use crate::forms::FieldErrors;
use crate::media::MediaError;

/// JSON error body shared by every endpoint.
#[derive(Debug, Serialize, Deserialize)]
pub struct ApiError {
    pub error: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fields: Option<BTreeMap<String, Vec<String>>>,
}

impl ApiError {
    pub fn new(error: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            message: message.into(),
            fields: None,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("authentication required")]
    Unauthenticated,

    #[error("you do not have permission to {0}")]
    Forbidden(&'static str),

    #[error("{0} not found")]
    NotFound(&'static str),

    /// Target exists but its owner keeps the portfolio private.
    #[error("this portfolio is private")]
    Private,

    #[error("{0}")]
    Conflict(String),

    #[error("{0}")]
    BadRequest(String),

    #[error("invalid form input")]
    Validation(FieldErrors),

    #[error(transparent)]
    Media(#[from] MediaError),

    #[error(transparent)]
    Db(#[from] DbErr),

    #[error("{0}")]
    Internal(String),
}

impl AppError {
    pub fn internal<E: std::fmt::Display>(e: E) -> Self {
        Self::Internal(e.to_string())
    }

    fn status_and_code(&self) -> (StatusCode, &'static str) {
        match self {
            AppError::Unauthenticated => (StatusCode::UNAUTHORIZED, "unauthenticated"),
            AppError::Forbidden(_) => (StatusCode::FORBIDDEN, "forbidden"),
            AppError::NotFound(_) => (StatusCode::NOT_FOUND, "not_found"),
            AppError::Private => (StatusCode::NOT_FOUND, "portfolio_private"),
            AppError::Conflict(_) => (StatusCode::CONFLICT, "conflict"),
            AppError::BadRequest(_) => (StatusCode::BAD_REQUEST, "bad_request"),
            AppError::Validation(_) => (StatusCode::BAD_REQUEST, "validation_error"),
            AppError::Media(MediaError::Decode(_)) => {
                (StatusCode::UNPROCESSABLE_ENTITY, "invalid_image")
            }
            AppError::Media(_) | AppError::Db(_) | AppError::Internal(_) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "internal")
            }
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code) = self.status_and_code();
        if status.is_server_error() {
            error!(error = %self, "request failed");
            // internals stay in the log
            return (status, Json(ApiError::new(code, "internal server error"))).into_response();
        }
        let mut body = ApiError::new(code, self.to_string());
        if let AppError::Validation(fields) = self {
            body.fields = Some(fields.into_inner());
        }
        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn private_and_not_found_share_status_but_not_code() {
        let (s1, c1) = AppError::Private.status_and_code();
        let (s2, c2) = AppError::NotFound("user").status_and_code();
        assert_eq!(s1, s2);
        assert_ne!(c1, c2);
    }

    #[test]
    fn decode_failures_are_unprocessable() {
        let err = AppError::from(MediaError::Decode("bad header".into()));
        assert_eq!(err.status_and_code().0, StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[test]
    fn forbidden_message_names_the_action() {
        assert_eq!(
            AppError::Forbidden("edit this item").to_string(),
            "you do not have permission to edit this item"
        );
    }
}
