use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(AdviceThreads::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(AdviceThreads::Id).uuid().not_null().primary_key())
                    .col(ColumnDef::new(AdviceThreads::UserId).string().not_null())
                    .col(ColumnDef::new(AdviceThreads::Title).string().not_null())
                    .col(ColumnDef::new(AdviceThreads::Model).string().not_null())
                    .col(
                        ColumnDef::new(AdviceThreads::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_advice_threads_user_id")
                    .table(AdviceThreads::Table)
                    .col(AdviceThreads::UserId)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(AdviceThreads::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
pub(crate) enum AdviceThreads {
    Table,
    Id,
    UserId,
    Title,
    Model,
    CreatedAt,
}
