use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(StreamSessions::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(StreamSessions::Id)
                            .string()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(StreamSessions::Title).string().not_null())
                    .col(
                        ColumnDef::new(StreamSessions::Description)
                            .text()
                            .not_null()
                            .default(""),
                    )
                    .col(
                        ColumnDef::new(StreamSessions::State)
                            .string()
                            .not_null()
                            .default("idle"),
                    )
                    .col(
                        ColumnDef::new(StreamSessions::IngestEndpoint)
                            .string()
                            .not_null(),
                    )
                    .col(ColumnDef::new(StreamSessions::IngestKey).text().not_null())
                    .col(
                        ColumnDef::new(StreamSessions::CreatedAt)
                            .big_integer()
                            .not_null(),
                    )
                    .col(ColumnDef::new(StreamSessions::StartedAt).big_integer().null())
                    .col(ColumnDef::new(StreamSessions::EndedAt).big_integer().null())
                    .col(
                        ColumnDef::new(StreamSessions::DurationSeconds)
                            .big_integer()
                            .null(),
                    )
                    .col(
                        ColumnDef::new(StreamSessions::UpdatedAt)
                            .big_integer()
                            .not_null(),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_stream_sessions_state")
                    .table(StreamSessions::Table)
                    .col(StreamSessions::State)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(StreamSessions::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum StreamSessions {
    Table,
    Id,
    Title,
    Description,
    State,
    IngestEndpoint,
    IngestKey,
    CreatedAt,
    StartedAt,
    EndedAt,
    DurationSeconds,
    UpdatedAt,
}
