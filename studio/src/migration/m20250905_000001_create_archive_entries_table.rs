use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(ArchiveEntries::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(ArchiveEntries::Id)
                            .string()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(ArchiveEntries::Title).string().not_null())
                    .col(
                        ColumnDef::new(ArchiveEntries::Description)
                            .text()
                            .not_null()
                            .default(""),
                    )
                    .col(
                        ColumnDef::new(ArchiveEntries::ThumbnailUrl)
                            .string()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(ArchiveEntries::RecordingPath)
                            .string()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(ArchiveEntries::DurationSeconds)
                            .big_integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(ArchiveEntries::StartedAt)
                            .big_integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(ArchiveEntries::EndedAt)
                            .big_integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(ArchiveEntries::IsVisible)
                            .boolean()
                            .not_null()
                            .default(true),
                    )
                    .col(
                        ColumnDef::new(ArchiveEntries::Lifecycle)
                            .string()
                            .not_null()
                            .default("active"),
                    )
                    .col(ColumnDef::new(ArchiveEntries::TrashedAt).big_integer().null())
                    .col(
                        ColumnDef::new(ArchiveEntries::CreatedAt)
                            .big_integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(ArchiveEntries::UpdatedAt)
                            .big_integer()
                            .not_null(),
                    )
                    .to_owned(),
            )
            .await?;

        // listing pages: lifecycle filter, newest first
        manager
            .create_index(
                Index::create()
                    .name("idx_archive_entries_lifecycle_started")
                    .table(ArchiveEntries::Table)
                    .col(ArchiveEntries::Lifecycle)
                    .col(ArchiveEntries::StartedAt)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(ArchiveEntries::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum ArchiveEntries {
    Table,
    Id,
    Title,
    Description,
    ThumbnailUrl,
    RecordingPath,
    DurationSeconds,
    StartedAt,
    EndedAt,
    IsVisible,
    Lifecycle,
    TrashedAt,
    CreatedAt,
    UpdatedAt,
}
