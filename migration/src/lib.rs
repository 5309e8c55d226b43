pub use sea_orm_migration::prelude::*;

pub mod entities;
mod m20260715_000001_short_links;
mod m20260715_000002_quota_counters;
mod m20260801_000001_click_events;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20260715_000001_short_links::Migration),
            Box::new(m20260715_000002_quota_counters::Migration),
            Box::new(m20260801_000001_click_events::Migration),
        ]
    }
}
