use sea_orm_migration::prelude::*;

mod m20260301_000001_create_accounts;
mod m20260301_000002_create_clinical;
mod m20260308_000001_create_commerce;
mod m20260315_000001_create_transport;
mod m20260322_000001_create_support;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20260301_000001_create_accounts::Migration),
            Box::new(m20260301_000002_create_clinical::Migration),
            Box::new(m20260308_000001_create_commerce::Migration),
            Box::new(m20260315_000001_create_transport::Migration),
            Box::new(m20260322_000001_create_support::Migration),
        ]
    }
}
