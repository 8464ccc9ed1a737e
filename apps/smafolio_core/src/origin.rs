use axum::{
    extract::FromRequestParts,
    http::{header, request::Parts},
};

use crate::error::AppError;
use crate::AppState;

/// Scheme and host the client used to reach us, for building absolute links
/// back to this deployment.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RequestOrigin {
    pub scheme: String,
    pub host: String,
}

impl RequestOrigin {
    /// Absolute URL of `path` (which must start with `/`).
    pub fn absolute(&self, path: &str) -> String {
        format!("{}://{}{}", self.scheme, self.host, path)
    }

    /// `<scheme>://<host>/<username>/`
    pub fn public_portfolio_url(&self, username: &str) -> String {
        self.absolute(&format!("/{username}/"))
    }
}

impl FromRequestParts<AppState> for RequestOrigin {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let host = parts
            .headers
            .get(header::HOST)
            .and_then(|v| v.to_str().ok())
            .map(str::trim)
            .filter(|h| !h.is_empty())
            .or_else(|| parts.uri.authority().map(|a| a.as_str()))
            .ok_or_else(|| AppError::BadRequest("missing Host header".into()))?;

        if !state.settings.host_allowed(host) {
            return Err(AppError::BadRequest(format!("invalid Host header: {host:?}")));
        }

        let forwarded = parts
            .headers
            .get("x-forwarded-proto")
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.split(',').next())
            .map(|v| v.trim().to_ascii_lowercase())
            .filter(|v| v == "http" || v == "https");
        let scheme = forwarded.unwrap_or_else(|| {
            if state.settings.debug { "http" } else { "https" }.to_string()
        });

        Ok(RequestOrigin {
            scheme,
            host: host.to_ascii_lowercase(),
        })
    }
}
