pub use sea_orm_migration::prelude::*;

mod m20260105_000001_create_tiers;
mod m20260105_000002_create_customers;
mod m20260112_000003_create_rewards;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20260105_000001_create_tiers::Migration),
            Box::new(m20260105_000002_create_customers::Migration),
            Box::new(m20260112_000003_create_rewards::Migration),
        ]
    }
}
