use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(ScoreRecords::Table)
                    .if_not_exists()
                    // history: {game}-{timestamp}-{user}, best: {game}-best-{user}
                    .col(
                        ColumnDef::new(ScoreRecords::Key)
                            .string()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(ScoreRecords::UserId).string().not_null())
                    .col(ColumnDef::new(ScoreRecords::GameId).string().not_null())
                    .col(ColumnDef::new(ScoreRecords::Score).integer().not_null())
                    .col(
                        ColumnDef::new(ScoreRecords::Timestamp)
                            .big_integer()
                            .not_null(),
                    )
                    .col(ColumnDef::new(ScoreRecords::Kind).string().not_null())
                    .to_owned(),
            )
            .await?;

        // Leaderboard queries: best records for one game by score
        manager
            .create_index(
                Index::create()
                    .name("idx_score_records_game_kind_score")
                    .table(ScoreRecords::Table)
                    .col(ScoreRecords::GameId)
                    .col(ScoreRecords::Kind)
                    .col(ScoreRecords::Score)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_score_records_user_id")
                    .table(ScoreRecords::Table)
                    .col(ScoreRecords::UserId)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(ScoreRecords::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum ScoreRecords {
    Table,
    Key,
    UserId,
    GameId,
    Score,
    Timestamp,
    Kind,
}
