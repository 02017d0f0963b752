use sea_orm_migration::prelude::*;

use crate::entity::active_slot::SLOT_ID;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(ActiveSlot::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(ActiveSlot::Id)
                            .integer()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(ActiveSlot::SessionId).string().null())
                    .col(
                        ColumnDef::new(ActiveSlot::UpdatedAt)
                            .big_integer()
                            .not_null()
                            .default(0),
                    )
                    .to_owned(),
            )
            .await?;

        // the one well-known row every create/end compares against
        let seed = Query::insert()
            .into_table(ActiveSlot::Table)
            .columns([ActiveSlot::Id, ActiveSlot::UpdatedAt])
            .values_panic([SLOT_ID.into(), 0i64.into()])
            .to_owned();
        manager.exec_stmt(seed).await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(ActiveSlot::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum ActiveSlot {
    Table,
    Id,
    SessionId,
    UpdatedAt,
}
