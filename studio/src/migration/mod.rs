pub use sea_orm_migration::prelude::*;

mod m20250901_000001_create_stream_sessions_table;
mod m20250901_000002_create_active_slot_table;
mod m20250905_000001_create_archive_entries_table;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20250901_000001_create_stream_sessions_table::Migration),
            Box::new(m20250901_000002_create_active_slot_table::Migration),
            Box::new(m20250905_000001_create_archive_entries_table::Migration),
        ]
    }
}
