//! SeaORM migrations for SQLite and PostgreSQL

use sea_orm_migration::prelude::*;

pub mod m20260301_000001_create_books;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![Box::new(m20260301_000001_create_books::Migration)]
    }
}
