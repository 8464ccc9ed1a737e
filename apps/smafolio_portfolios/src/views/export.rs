use axum::{
    extract::State,
    http::{header, HeaderValue},
    response::{IntoResponse, Response},
};
use sea_orm::EntityTrait;

use smafolio_core::auth::AuthUser;
use smafolio_core::error::AppError;
use smafolio_core::models::user::Entity as User;
use smafolio_core::origin::RequestOrigin;
use smafolio_core::AppState;

use crate::export::generate_pdf;

/// The requester's portfolio as an inline PDF.
pub async fn download_pdf(
    State(state): State<AppState>,
    actor: AuthUser,
    origin: RequestOrigin,
) -> Result<Response, AppError> {
    let found = User::find_by_id(actor.id)
        .one(&state.db)
        .await?
        .ok_or(AppError::Unauthenticated)?;
    let pdf = generate_pdf(&state, &found, &origin).await?;

    let disposition = format!("inline; filename=\"Portfolio_{}.pdf\"", found.username);
    Ok((
        [
            (header::CONTENT_TYPE, HeaderValue::from_static("application/pdf")),
            (
                header::CONTENT_DISPOSITION,
                HeaderValue::from_str(&disposition).map_err(AppError::internal)?,
            ),
        ],
        pdf,
    )
        .into_response())
}
