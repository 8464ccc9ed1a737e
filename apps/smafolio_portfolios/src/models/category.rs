use sea_orm::entity::prelude::*;
use sea_orm::sea_query::Expr;
use sea_orm::{ActiveValue::NotSet, DatabaseConnection, QueryOrder, Set, TransactionTrait, Value};
use tracing::info;

use smafolio_core::error::AppError;
use smafolio_core::forms::FieldErrors;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "categories")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = true)]
    pub id: i64,
    pub name: String,
    #[sea_orm(unique)]
    pub slug: String,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::portfolio_item::Entity")]
    PortfolioItems,
}

impl Related<super::portfolio_item::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::PortfolioItems.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

pub const NAME_MAX_CHARS: usize = 100;
pub const SLUG_MAX_CHARS: usize = 50;

/// URL-safe slug: ASCII letters, digits, `_` and `-`, lowercased, runs of
/// whitespace and hyphens collapsed to a single `-`.
pub fn slugify(name: &str) -> String {
    let mut out = String::new();
    let mut pending_dash = false;
    for c in name.chars() {
        if c.is_ascii_alphanumeric() || c == '_' {
            if pending_dash && !out.is_empty() {
                out.push('-');
            }
            pending_dash = false;
            out.push(c.to_ascii_lowercase());
        } else if c.is_whitespace() || c == '-' {
            pending_dash = true;
        }
    }
    let trimmed = out.trim_matches(|c| c == '-' || c == '_');
    trimmed.chars().take(SLUG_MAX_CHARS).collect::<String>().trim_end_matches('-').to_string()
}

/// Create a category. A blank slug is derived from the name.
pub async fn create<C: ConnectionTrait>(
    db: &C,
    name: &str,
    slug: Option<&str>,
) -> Result<Model, AppError> {
    let name = name.trim();
    let mut errors = FieldErrors::new();
    if name.is_empty() {
        errors.add("name", "This field is required.");
    } else if name.chars().count() > NAME_MAX_CHARS {
        errors.add("name", "Ensure this value has at most 100 characters.");
    }
    let slug = match slug.map(str::trim).filter(|s| !s.is_empty()) {
        Some(s) => s.to_string(),
        None => slugify(name),
    };
    if slug.is_empty() || slug.chars().count() > SLUG_MAX_CHARS || slug != slugify(&slug) {
        errors.add("slug", "Enter a valid slug.");
    }
    errors.into_result()?;

    if Entity::find()
        .filter(Column::Slug.eq(&slug))
        .one(db)
        .await?
        .is_some()
    {
        return Err(AppError::Conflict(format!("category slug {slug:?} already exists")));
    }

    let created = ActiveModel {
        id: NotSet,
        name: Set(name.to_string()),
        slug: Set(slug),
    }
    .insert(db)
    .await?;
    info!(category_id = created.id, slug = %created.slug, "category created");
    Ok(created)
}

pub async fn list<C: ConnectionTrait>(db: &C) -> Result<Vec<Model>, DbErr> {
    Entity::find()
        .order_by_asc(Column::Name)
        .order_by_asc(Column::Id)
        .all(db)
        .await
}

/// Delete a category. Items filed under it stay, uncategorized.
pub async fn delete(db: &DatabaseConnection, id: i64) -> Result<(), AppError> {
    let txn = db.begin().await?;
    let detached = super::portfolio_item::Entity::update_many()
        .col_expr(
            super::portfolio_item::Column::CategoryId,
            Expr::value(Value::BigInt(None)),
        )
        .filter(super::portfolio_item::Column::CategoryId.eq(id))
        .exec(&txn)
        .await?;
    let res = Entity::delete_by_id(id).exec(&txn).await?;
    if res.rows_affected == 0 {
        return Err(AppError::NotFound("category"));
    }
    txn.commit().await?;
    info!(category_id = id, detached = detached.rows_affected, "category deleted");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("Volunteer Work", "volunteer-work")]
    #[case("  Academic -- Awards ", "academic-awards")]
    #[case("Sports & Games!", "sports-games")]
    #[case("snake_case name", "snake_case-name")]
    #[case("กิจกรรม", "")]
    fn slugify_cases(#[case] name: &str, #[case] expected: &str) {
        assert_eq!(slugify(name), expected);
    }

    #[test]
    fn slug_is_capped() {
        assert_eq!(slugify(&"a".repeat(80)).len(), SLUG_MAX_CHARS);
    }
}
