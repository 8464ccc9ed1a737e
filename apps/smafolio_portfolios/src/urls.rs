use axum::{routing::get, Router};

use smafolio_core::AppState;

use crate::views::{
    dashboard::dashboard,
    export::download_pdf,
    portfolio::{create, create_form, delete, delete_confirm, edit, edit_form},
    public::{portfolio_detail, portfolio_view},
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/dashboard/", get(dashboard))
        .route("/dashboard/download-pdf/", get(download_pdf))
        .route("/portfolio/create/", get(create_form).post(create))
        .route("/portfolio/edit/{id}/", get(edit_form).post(edit))
        .route("/portfolio/delete/{id}/", get(delete_confirm).post(delete))
}

/// Username-addressed pages. `/{username}/` matches any single segment, so
/// this router is merged after every fixed route.
pub fn public_router() -> Router<AppState> {
    Router::new()
        .route("/{username}/item/{id}/", get(portfolio_detail))
        .route("/{username}/", get(portfolio_view))
}
