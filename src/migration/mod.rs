//! SeaORM database migrations.

pub use sea_orm_migration::prelude::*;

mod m20260210_000001_create_printers;
mod m20260210_000002_create_print_jobs;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20260210_000001_create_printers::Migration),
            Box::new(m20260210_000002_create_print_jobs::Migration),
        ]
    }
}
