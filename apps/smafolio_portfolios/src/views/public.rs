use axum::{
    extract::{Path, State},
    Json,
};
use sea_orm::{ColumnTrait, EntityTrait, QueryFilter};
use tracing::debug;

use smafolio_core::auth::Viewer;
use smafolio_core::error::AppError;
use smafolio_core::models::profile::{self, Column as ProfileCol, Entity as Profile};
use smafolio_core::models::user::{self, Column as UserCol, Entity as User};
use smafolio_core::serializers::profile::OwnerOut;
use smafolio_core::AppState;

use crate::models::portfolio_item::{self, Column as ItemCol, Entity as Item};
use crate::permissions::is_visible_to;
use crate::serializers::portfolio::{ItemDetailOut, ItemOut, PublicPortfolioOut};
use crate::views::items_out;

/// A user's public portfolio, grouped by category.
pub async fn portfolio_view(
    State(state): State<AppState>,
    viewer: Viewer,
    Path(username): Path<String>,
) -> Result<Json<PublicPortfolioOut>, AppError> {
    let owner = find_owner(&state, &username).await?;
    let profile = find_profile(&state, owner.id).await?;
    if !is_visible_to(&viewer, &owner, profile.as_ref()) {
        debug!(owner_id = owner.id, "private portfolio requested");
        return Err(AppError::Private);
    }

    let items = portfolio_item::find_for_owner(owner.id).all(&state.db).await?;
    let mut items = items_out(&state.db, &state.media, &items).await?;
    sort_by_category(&mut items);

    Ok(Json(PublicPortfolioOut::new(
        OwnerOut::new(&owner, profile.as_ref(), &state.media),
        items,
    )))
}

/// One item, which must belong to `username`.
pub async fn portfolio_detail(
    State(state): State<AppState>,
    viewer: Viewer,
    Path((username, id)): Path<(String, i64)>,
) -> Result<Json<ItemDetailOut>, AppError> {
    let owner = find_owner(&state, &username).await?;
    let item = Item::find_by_id(id)
        .filter(ItemCol::OwnerId.eq(owner.id))
        .one(&state.db)
        .await?
        .ok_or(AppError::NotFound("portfolio item"))?;
    let profile = find_profile(&state, owner.id).await?;
    if !is_visible_to(&viewer, &owner, profile.as_ref()) {
        return Err(AppError::Private);
    }

    let item = items_out(&state.db, &state.media, std::slice::from_ref(&item))
        .await?
        .pop()
        .ok_or_else(|| AppError::internal("serialized item missing"))?;
    Ok(Json(ItemDetailOut {
        owner: OwnerOut::new(&owner, profile.as_ref(), &state.media),
        item,
    }))
}

async fn find_owner(state: &AppState, username: &str) -> Result<user::Model, AppError> {
    User::find()
        .filter(UserCol::Username.eq(username))
        .one(&state.db)
        .await?
        .ok_or(AppError::NotFound("user"))
}

async fn find_profile(state: &AppState, user_id: i64) -> Result<Option<profile::Model>, AppError> {
    Ok(Profile::find()
        .filter(ProfileCol::UserId.eq(user_id))
        .one(&state.db)
        .await?)
}

/// Category name order with uncategorized items last. The sort is stable,
/// so the date order within a category is kept.
fn sort_by_category(items: &mut [ItemOut]) {
    items.sort_by(|a, b| {
        let key = |i: &ItemOut| {
            (
                i.category.is_none(),
                i.category.as_ref().map(|c| (c.name.clone(), c.id)),
            )
        };
        key(a).cmp(&key(b))
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::serializers::portfolio::CategoryOut;

    fn item(id: i64, category: Option<(i64, &str)>) -> ItemOut {
        ItemOut {
            id,
            owner_id: 1,
            title: format!("item {id}"),
            description: String::new(),
            category: category.map(|(cid, name)| CategoryOut {
                id: cid,
                name: name.into(),
                slug: name.to_lowercase(),
            }),
            cover_image: String::new(),
            cover_image_url: String::new(),
            video_link: None,
            embed_url: None,
            event_date: None,
            created_at: String::new(),
            updated_at: String::new(),
            images: Vec::new(),
        }
    }

    #[test]
    fn uncategorized_items_sort_last_and_ties_keep_order() {
        let mut items = vec![
            item(1, None),
            item(2, Some((5, "Sports"))),
            item(3, Some((4, "Academic"))),
            item(4, Some((5, "Sports"))),
            item(5, None),
        ];
        sort_by_category(&mut items);
        let ids: Vec<i64> = items.iter().map(|i| i.id).collect();
        assert_eq!(ids, [3, 2, 4, 1, 5]);
    }
}
