use axum::{
    routing::{get, post},
    Router,
};

use crate::views::{
    home::{healthz, home},
    profile::{edit_profile, edit_profile_form},
    user_auth::{login, logout, me, refresh, signup},
};
use crate::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(home))
        .route("/healthz", get(healthz))
        .route("/accounts/signup/", post(signup))
        .route("/accounts/login/", post(login))
        .route("/accounts/me/", get(me))
        .route("/accounts/refresh/", post(refresh))
        .route("/accounts/logout/", post(logout))
        .route("/profile/edit/", get(edit_profile_form).post(edit_profile))
}
