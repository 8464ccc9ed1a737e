use axum::{
    extract::{Multipart, Path, State},
    http::StatusCode,
    Json,
};
use sea_orm::{EntityTrait, TransactionTrait};
use tracing::info;

use smafolio_core::auth::AuthUser;
use smafolio_core::error::AppError;
use smafolio_core::forms::FormData;
use smafolio_core::AppState;

use crate::forms::{gallery_uploads, GalleryEdit, ItemForm};
use crate::models::{category, portfolio_image, portfolio_item};
use crate::permissions::ensure_owner;
use crate::serializers::portfolio::{DeleteConfirmOut, DeletedOut, ItemFormOut, ItemOut};
use crate::views::{both, items_out};

// ---------- create ----------

pub async fn create_form(
    State(state): State<AppState>,
    _actor: AuthUser,
) -> Result<Json<ItemFormOut>, AppError> {
    let categories = category::list(&state.db).await?;
    Ok(Json(ItemFormOut::empty(&categories)))
}

pub async fn create(
    State(state): State<AppState>,
    actor: AuthUser,
    multipart: Multipart,
) -> Result<(StatusCode, Json<ItemOut>), AppError> {
    let form = FormData::from_multipart(multipart).await?;
    let out = create_item(&state, &actor, &form).await?;
    Ok((StatusCode::CREATED, Json(out)))
}

/// Persist a new item owned by `actor` and its gallery in one transaction.
pub async fn create_item(
    state: &AppState,
    actor: &AuthUser,
    form: &FormData,
) -> Result<ItemOut, AppError> {
    let categories = category::list(&state.db).await?;
    let (cleaned, gallery) = both(
        ItemForm::from_form_data(form).clean(&categories, true),
        gallery_uploads(form),
    )?;

    let txn = state.db.begin().await?;
    let item = portfolio_item::save(
        &txn,
        &state.media,
        actor.id,
        None,
        cleaned.fields,
        cleaned.cover,
    )
    .await?;
    for upload in gallery {
        portfolio_image::save(&txn, &state.media, item.id, None, upload).await?;
    }
    let out = single_out(&txn, state, &item).await?;
    txn.commit().await?;

    info!(item_id = item.id, owner_id = actor.id, images = out.images.len(), "portfolio item created");
    Ok(out)
}

// ---------- edit ----------

pub async fn edit_form(
    State(state): State<AppState>,
    actor: AuthUser,
    Path(id): Path<i64>,
) -> Result<Json<ItemFormOut>, AppError> {
    let item = load_owned(&state, &actor, id, "edit this item").await?;
    let categories = category::list(&state.db).await?;
    let out = single_out(&state.db, &state, &item).await?;
    Ok(Json(ItemFormOut::initial(&categories, out)))
}

pub async fn edit(
    State(state): State<AppState>,
    actor: AuthUser,
    Path(id): Path<i64>,
    multipart: Multipart,
) -> Result<Json<ItemOut>, AppError> {
    let form = FormData::from_multipart(multipart).await?;
    edit_item(&state, &actor, id, &form).await.map(Json)
}

/// Apply an edit to item `id`. Ownership is checked before anything is read
/// from the form.
pub async fn edit_item(
    state: &AppState,
    actor: &AuthUser,
    id: i64,
    form: &FormData,
) -> Result<ItemOut, AppError> {
    let item = load_owned(state, actor, id, "edit this item").await?;
    let categories = category::list(&state.db).await?;
    let existing = portfolio_image::for_item(&state.db, item.id).await?;
    let (cleaned, gallery) = both(
        ItemForm::from_form_data(form).clean(&categories, false),
        GalleryEdit::from_form_data(form).and_then(|g| g.check(&existing)),
    )?;

    let txn = state.db.begin().await?;
    let saved = portfolio_item::save(
        &txn,
        &state.media,
        item.owner_id,
        Some(item.id),
        cleaned.fields,
        cleaned.cover,
    )
    .await?;
    let removed = portfolio_image::delete_many(&txn, saved.id, &gallery.remove).await?;
    for (image_id, upload) in gallery.replace {
        portfolio_image::save(&txn, &state.media, saved.id, Some(image_id), upload).await?;
    }
    for upload in gallery.add {
        portfolio_image::save(&txn, &state.media, saved.id, None, upload).await?;
    }
    let out = single_out(&txn, state, &saved).await?;
    txn.commit().await?;

    info!(item_id = saved.id, removed, images = out.images.len(), "portfolio item updated");
    Ok(out)
}

// ---------- delete ----------

/// Confirmation step; reads only.
pub async fn delete_confirm(
    State(state): State<AppState>,
    actor: AuthUser,
    Path(id): Path<i64>,
) -> Result<Json<DeleteConfirmOut>, AppError> {
    let item = load_owned(&state, &actor, id, "delete this item").await?;
    let out = single_out(&state.db, &state, &item).await?;
    Ok(Json(DeleteConfirmOut {
        prompt: format!("Delete \"{}\"? This cannot be undone.", out.title),
        item: out,
    }))
}

pub async fn delete(
    State(state): State<AppState>,
    actor: AuthUser,
    Path(id): Path<i64>,
) -> Result<Json<DeletedOut>, AppError> {
    let item = load_owned(&state, &actor, id, "delete this item").await?;
    portfolio_item::delete(&state.db, item).await?;
    Ok(Json(DeletedOut {
        deleted: id,
        message: "Portfolio item deleted.".into(),
    }))
}

// ---------- helpers ----------

async fn load_owned(
    state: &AppState,
    actor: &AuthUser,
    id: i64,
    action: &'static str,
) -> Result<portfolio_item::Model, AppError> {
    let item = portfolio_item::Entity::find_by_id(id)
        .one(&state.db)
        .await?
        .ok_or(AppError::NotFound("portfolio item"))?;
    ensure_owner(actor, &item, action)?;
    Ok(item)
}

async fn single_out<C: sea_orm::ConnectionTrait>(
    db: &C,
    state: &AppState,
    item: &portfolio_item::Model,
) -> Result<ItemOut, AppError> {
    items_out(db, &state.media, std::slice::from_ref(item))
        .await?
        .pop()
        .ok_or_else(|| AppError::internal("serialized item missing"))
}
