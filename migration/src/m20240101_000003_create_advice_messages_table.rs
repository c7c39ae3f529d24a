use sea_orm_migration::prelude::*;

use crate::m20240101_000002_create_advice_threads_table::AdviceThreads;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(AdviceMessages::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(AdviceMessages::Id).uuid().not_null().primary_key())
                    .col(ColumnDef::new(AdviceMessages::ThreadId).uuid().not_null())
                    .col(ColumnDef::new(AdviceMessages::Role).string().not_null())
                    .col(ColumnDef::new(AdviceMessages::Content).text().not_null())
                    .col(
                        ColumnDef::new(AdviceMessages::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_advice_messages_thread_id")
                            .from(AdviceMessages::Table, AdviceMessages::ThreadId)
                            .to(AdviceThreads::Table, AdviceThreads::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        // Messages are read per thread in created_at, id order
        manager
            .create_index(
                Index::create()
                    .name("idx_advice_messages_thread_created")
                    .table(AdviceMessages::Table)
                    .col(AdviceMessages::ThreadId)
                    .col(AdviceMessages::CreatedAt)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(AdviceMessages::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum AdviceMessages {
    Table,
    Id,
    ThreadId,
    Role,
    Content,
    CreatedAt,
}
