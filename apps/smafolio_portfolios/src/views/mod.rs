pub mod dashboard;
pub mod export;
pub mod portfolio;
pub mod public;

use std::collections::HashMap;

use sea_orm::ConnectionTrait;

use smafolio_core::error::AppError;
use smafolio_core::forms::FieldErrors;
use smafolio_core::media::MediaStorage;

use crate::models::{category, portfolio_image, portfolio_item};
use crate::serializers::portfolio::ItemOut;

/// Serialize items with their category and gallery, keeping their order.
pub(crate) async fn items_out<C: ConnectionTrait>(
    db: &C,
    media: &MediaStorage,
    items: &[portfolio_item::Model],
) -> Result<Vec<ItemOut>, AppError> {
    let ids: Vec<i64> = items.iter().map(|i| i.id).collect();
    let mut galleries = portfolio_image::for_items(db, &ids).await?;
    let categories: HashMap<i64, category::Model> = category::list(db)
        .await?
        .into_iter()
        .map(|c| (c.id, c))
        .collect();
    Ok(items
        .iter()
        .map(|item| {
            let images = galleries.remove(&item.id).unwrap_or_default();
            let cat = item.category_id.and_then(|id| categories.get(&id));
            ItemOut::new(item, cat, &images, media)
        })
        .collect())
}

/// Both halves of a form must be valid; errors from either are reported
/// together.
pub(crate) fn both<A, B>(
    a: Result<A, FieldErrors>,
    b: Result<B, FieldErrors>,
) -> Result<(A, B), AppError> {
    match (a, b) {
        (Ok(a), Ok(b)) => Ok((a, b)),
        (a, b) => {
            let mut errors = FieldErrors::new();
            if let Err(e) = a {
                errors.merge(e);
            }
            if let Err(e) = b {
                errors.merge(e);
            }
            Err(AppError::Validation(errors))
        }
    }
}
