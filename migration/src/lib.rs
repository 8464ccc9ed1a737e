use sea_orm_migration::prelude::*;

mod m2026_01_05_000001_create_users_profiles;
mod m2026_01_05_000002_create_refresh_tokens;
mod m2026_01_05_000003_create_portfolios;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            // users must exist before anything that points at users.id
            Box::new(m2026_01_05_000001_create_users_profiles::Migration),
            Box::new(m2026_01_05_000002_create_refresh_tokens::Migration),
            Box::new(m2026_01_05_000003_create_portfolios::Migration),
        ]
    }
}
