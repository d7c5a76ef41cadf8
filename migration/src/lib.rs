pub use sea_orm_migration::prelude::*;

mod m20251201_000001_crm_core;
mod m20251201_000002_deal_constraints;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20251201_000001_crm_core::Migration),
            Box::new(m20251201_000002_deal_constraints::Migration),
        ]
    }
}
