use std::collections::HashMap;

use sea_orm::entity::prelude::*;
use sea_orm::{ActiveValue::NotSet, QueryOrder, Set};

use smafolio_core::error::AppError;
use smafolio_core::media::{MediaStorage, UploadDir, UploadedImage};

use super::store_image_field;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "portfolio_images")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = true)]
    pub id: i64,
    pub portfolio_item_id: i64,
    /// Stored media path under `portfolio_gallery/`.
    pub image: String,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::portfolio_item::Entity",
        from = "Column::PortfolioItemId",
        to = "super::portfolio_item::Column::Id",
        on_delete = "Cascade"
    )]
    PortfolioItem,
}

impl Related<super::portfolio_item::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::PortfolioItem.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

/// Insert a gallery image for `item_id`, or replace the file of image `id`.
/// The upload is always recompressed and saved as a new file.
pub async fn save<C: ConnectionTrait>(
    db: &C,
    media: &MediaStorage,
    item_id: i64,
    id: Option<i64>,
    upload: UploadedImage,
) -> Result<Model, AppError> {
    let prior = match id {
        Some(id) => Some(
            Entity::find_by_id(id)
                .filter(Column::PortfolioItemId.eq(item_id))
                .one(db)
                .await?
                .ok_or(AppError::NotFound("gallery image"))?,
        ),
        None => None,
    };

    let stored = prior.as_ref().map(|p| p.image.as_str());
    let image = store_image_field(media, UploadDir::Gallery, stored, Some(upload))
        .await?
        .ok_or_else(|| AppError::internal("gallery upload produced no image"))?;

    match prior {
        Some(prior) => {
            let mut am: ActiveModel = prior.into();
            am.image = Set(image);
            Ok(am.update(db).await?)
        }
        None => Ok(ActiveModel {
            id: NotSet,
            portfolio_item_id: Set(item_id),
            image: Set(image),
        }
        .insert(db)
        .await?),
    }
}

pub async fn for_item<C: ConnectionTrait>(db: &C, item_id: i64) -> Result<Vec<Model>, DbErr> {
    Entity::find()
        .filter(Column::PortfolioItemId.eq(item_id))
        .order_by_asc(Column::Id)
        .all(db)
        .await
}

/// Gallery rows of several items at once, grouped by item id.
pub async fn for_items<C: ConnectionTrait>(
    db: &C,
    item_ids: &[i64],
) -> Result<HashMap<i64, Vec<Model>>, DbErr> {
    let mut grouped: HashMap<i64, Vec<Model>> = HashMap::new();
    if item_ids.is_empty() {
        return Ok(grouped);
    }
    let rows = Entity::find()
        .filter(Column::PortfolioItemId.is_in(item_ids.iter().copied()))
        .order_by_asc(Column::Id)
        .all(db)
        .await?;
    for row in rows {
        grouped.entry(row.portfolio_item_id).or_default().push(row);
    }
    Ok(grouped)
}

pub async fn delete_many<C: ConnectionTrait>(
    db: &C,
    item_id: i64,
    ids: &[i64],
) -> Result<u64, DbErr> {
    if ids.is_empty() {
        return Ok(0);
    }
    let res = Entity::delete_many()
        .filter(Column::PortfolioItemId.eq(item_id))
        .filter(Column::Id.is_in(ids.iter().copied()))
        .exec(db)
        .await?;
    Ok(res.rows_affected)
}
