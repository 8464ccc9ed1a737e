use axum::{extract::State, Json};
use sea_orm::{ColumnTrait, EntityTrait, QueryFilter};

use smafolio_core::auth::AuthUser;
use smafolio_core::error::AppError;
use smafolio_core::models::profile::{Column as ProfileCol, Entity as Profile};
use smafolio_core::models::user::Entity as User;
use smafolio_core::serializers::profile::ProfileOut;
use smafolio_core::serializers::user_auth::UserPublic;
use smafolio_core::AppState;

use crate::models::portfolio_item;
use crate::serializers::portfolio::DashboardOut;
use crate::views::items_out;

/// The requester's own items, newest first, each with its gallery.
pub async fn dashboard(
    State(state): State<AppState>,
    actor: AuthUser,
) -> Result<Json<DashboardOut>, AppError> {
    let found = User::find_by_id(actor.id)
        .one(&state.db)
        .await?
        .ok_or(AppError::Unauthenticated)?;
    let profile = Profile::find()
        .filter(ProfileCol::UserId.eq(found.id))
        .one(&state.db)
        .await?;
    let items = portfolio_item::find_for_owner(found.id).all(&state.db).await?;
    let items = items_out(&state.db, &state.media, &items).await?;

    Ok(Json(DashboardOut {
        public_path: format!("/{}/", found.username),
        user: UserPublic::from(&found),
        profile: profile.as_ref().map(|p| ProfileOut::new(p, &state.media)),
        items,
    }))
}
