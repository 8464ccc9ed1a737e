use chrono::Utc;
use sea_orm::entity::prelude::*;
use sea_orm::sea_query::NullOrdering;
use sea_orm::{ActiveValue::NotSet, DatabaseConnection, Order, QueryOrder, Select, Set, TransactionTrait};
use tracing::info;

use smafolio_core::error::AppError;
use smafolio_core::forms::FieldErrors;
use smafolio_core::media::{MediaStorage, UploadDir, UploadedImage};

use super::store_image_field;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "portfolio_items")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = true)]
    pub id: i64,

    pub owner_id: i64,

    pub title: String,

    #[sea_orm(column_type = "Text")]
    pub description: String,

    pub category_id: Option<i64>,

    /// Stored media path under `portfolio_covers/`.
    pub cover_image: String,

    pub video_link: Option<String>,

    pub event_date: Option<Date>,

    pub created_at: ChronoDateTimeUtc,
    pub updated_at: ChronoDateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "smafolio_core::models::user::Entity",
        from = "Column::OwnerId",
        to = "smafolio_core::models::user::Column::Id",
        on_delete = "Cascade"
    )]
    Owner,

    #[sea_orm(
        belongs_to = "super::category::Entity",
        from = "Column::CategoryId",
        to = "super::category::Column::Id",
        on_delete = "SetNull"
    )]
    Category,

    #[sea_orm(has_many = "super::portfolio_image::Entity")]
    Images,
}

impl Related<smafolio_core::models::user::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Owner.def()
    }
}

impl Related<super::category::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Category.def()
    }
}

impl Related<super::portfolio_image::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Images.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

pub const TITLE_MAX_CHARS: usize = 200;

/// Everything an item write carries apart from the cover image.
#[derive(Clone, Debug, PartialEq)]
pub struct ItemFields {
    pub title: String,
    pub description: String,
    pub category_id: Option<i64>,
    pub video_link: Option<String>,
    pub event_date: Option<Date>,
}

/// An owner's items, newest event first; undated items after dated ones,
/// then by creation time.
pub fn find_for_owner(owner_id: i64) -> Select<Entity> {
    Entity::find()
        .filter(Column::OwnerId.eq(owner_id))
        .order_by_with_nulls(Column::EventDate, Order::Desc, NullOrdering::Last)
        .order_by_desc(Column::CreatedAt)
        .order_by_desc(Column::Id)
}

/// Insert (`id == None`) or update an item.
///
/// The stored record is re-read by primary key so the cover comparison is
/// made against what is persisted, not against what the caller loaded
/// earlier. A cover is required once the write completes.
pub async fn save<C: ConnectionTrait>(
    db: &C,
    media: &MediaStorage,
    owner_id: i64,
    id: Option<i64>,
    fields: ItemFields,
    cover: Option<UploadedImage>,
) -> Result<Model, AppError> {
    let prior = match id {
        Some(id) => Some(
            Entity::find_by_id(id)
                .one(db)
                .await?
                .ok_or(AppError::NotFound("portfolio item"))?,
        ),
        None => None,
    };

    let stored_cover = prior.as_ref().map(|p| p.cover_image.as_str());
    let Some(cover_image) = store_image_field(media, UploadDir::Covers, stored_cover, cover).await?
    else {
        let mut errors = FieldErrors::new();
        errors.add("cover_image", "This field is required.");
        return Err(AppError::Validation(errors));
    };

    let now = Utc::now();
    let saved = match prior {
        Some(prior) => {
            let mut am: ActiveModel = prior.into();
            am.title = Set(fields.title);
            am.description = Set(fields.description);
            am.category_id = Set(fields.category_id);
            am.cover_image = Set(cover_image);
            am.video_link = Set(fields.video_link);
            am.event_date = Set(fields.event_date);
            am.updated_at = Set(now);
            am.update(db).await?
        }
        None => {
            ActiveModel {
                id: NotSet,
                owner_id: Set(owner_id),
                title: Set(fields.title),
                description: Set(fields.description),
                category_id: Set(fields.category_id),
                cover_image: Set(cover_image),
                video_link: Set(fields.video_link),
                event_date: Set(fields.event_date),
                created_at: Set(now),
                updated_at: Set(now),
            }
            .insert(db)
            .await?
        }
    };
    Ok(saved)
}

/// Delete an item together with its gallery rows.
pub async fn delete(db: &DatabaseConnection, item: Model) -> Result<(), AppError> {
    let txn = db.begin().await?;
    let images = super::portfolio_image::Entity::delete_many()
        .filter(super::portfolio_image::Column::PortfolioItemId.eq(item.id))
        .exec(&txn)
        .await?;
    Entity::delete_by_id(item.id).exec(&txn).await?;
    txn.commit().await?;
    info!(
        item_id = item.id,
        owner_id = item.owner_id,
        images = images.rows_affected,
        "portfolio item deleted"
    );
    Ok(())
}
