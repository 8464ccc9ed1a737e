use sea_orm_migration::prelude::*;

#[derive(DeriveIden)]
enum Categories {
    Table,
    Id,
    Name,
    Slug,
}

#[derive(DeriveIden)]
enum PortfolioItems {
    Table,
    Id,
    OwnerId,
    Title,
    Description,
    CategoryId,
    CoverImage,
    VideoLink,
    EventDate,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum PortfolioImages {
    Table,
    Id,
    PortfolioItemId,
    Image,
}

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Categories::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Categories::Id)
                            .big_integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Categories::Name).string_len(100).not_null())
                    .col(ColumnDef::new(Categories::Slug).string_len(50).not_null().unique_key())
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(PortfolioItems::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(PortfolioItems::Id)
                            .big_integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(PortfolioItems::OwnerId).big_integer().not_null())
                    .col(ColumnDef::new(PortfolioItems::Title).string_len(200).not_null())
                    .col(ColumnDef::new(PortfolioItems::Description).text().not_null())
                    .col(ColumnDef::new(PortfolioItems::CategoryId).big_integer().null())
                    .col(ColumnDef::new(PortfolioItems::CoverImage).string().not_null())
                    .col(ColumnDef::new(PortfolioItems::VideoLink).string().null())
                    .col(ColumnDef::new(PortfolioItems::EventDate).date().null())
                    .col(
                        ColumnDef::new(PortfolioItems::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(
                        ColumnDef::new(PortfolioItems::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_portfolio_items_owner")
                            .from(PortfolioItems::Table, PortfolioItems::OwnerId)
                            .to(Alias::new("users"), Alias::new("id"))
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_portfolio_items_category")
                            .from(PortfolioItems::Table, PortfolioItems::CategoryId)
                            .to(Categories::Table, Categories::Id)
                            .on_delete(ForeignKeyAction::SetNull),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_portfolio_items_owner")
                    .table(PortfolioItems::Table)
                    .col(PortfolioItems::OwnerId)
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(PortfolioImages::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(PortfolioImages::Id)
                            .big_integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(PortfolioImages::PortfolioItemId).big_integer().not_null())
                    .col(ColumnDef::new(PortfolioImages::Image).string().not_null())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_portfolio_images_item")
                            .from(PortfolioImages::Table, PortfolioImages::PortfolioItemId)
                            .to(PortfolioItems::Table, PortfolioItems::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_portfolio_images_item")
                    .table(PortfolioImages::Table)
                    .col(PortfolioImages::PortfolioItemId)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(PortfolioImages::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(PortfolioItems::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Categories::Table).to_owned())
            .await
    }
}
