pub use sea_orm_migration::prelude::*;

mod m20250726_000001_add_daily_pools_and_balances;
mod m20250726_000002_add_awards_and_transactions;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20250726_000001_add_daily_pools_and_balances::Migration),
            Box::new(m20250726_000002_add_awards_and_transactions::Migration),
        ]
    }
}
