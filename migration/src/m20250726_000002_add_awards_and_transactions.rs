use sea_orm_migration::prelude::*;

#[derive(DeriveIden)]
enum AwardRecords {
    Table,
    Id,
    UserKey,
    AwardDate,
    Kind,
    Amount,
    TicketNumber,
    DrawReference,
    AwardedAt,
}

#[derive(DeriveIden)]
enum RewardTransactions {
    Table,
    Id,
    Reference,
    UserKey,
    Kind,
    TransactionType,
    Amount,
    BalanceBefore,
    BalanceAfter,
    TicketNumber,
    DrawReference,
    CheckDate,
    PoolDate,
    Description,
    CreatedAt,
}

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(AwardRecords::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(AwardRecords::Id)
                            .big_integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(AwardRecords::UserKey).string_len(20).not_null())
                    .col(ColumnDef::new(AwardRecords::AwardDate).date().not_null())
                    .col(ColumnDef::new(AwardRecords::Kind).string_len(16).not_null())
                    .col(ColumnDef::new(AwardRecords::Amount).big_integer().not_null())
                    .col(
                        ColumnDef::new(AwardRecords::TicketNumber)
                            .string_len(50)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(AwardRecords::DrawReference)
                            .string_len(200)
                            .null(),
                    )
                    .col(
                        ColumnDef::new(AwardRecords::AwardedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .to_owned(),
            )
            .await?;

        // 每个用户每天最多一条奖励（不区分 cash / points）
        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("uq_award_records_user_date")
                    .table(AwardRecords::Table)
                    .col(AwardRecords::UserKey)
                    .col(AwardRecords::AwardDate)
                    .unique()
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_award_records_date_kind")
                    .table(AwardRecords::Table)
                    .col(AwardRecords::AwardDate)
                    .col(AwardRecords::Kind)
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(RewardTransactions::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(RewardTransactions::Id)
                            .big_integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(RewardTransactions::Reference).uuid().not_null())
                    .col(
                        ColumnDef::new(RewardTransactions::UserKey)
                            .string_len(20)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(RewardTransactions::Kind)
                            .string_len(16)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(RewardTransactions::TransactionType)
                            .string_len(20)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(RewardTransactions::Amount)
                            .big_integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(RewardTransactions::BalanceBefore)
                            .big_integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(RewardTransactions::BalanceAfter)
                            .big_integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(RewardTransactions::TicketNumber)
                            .string_len(50)
                            .null(),
                    )
                    .col(
                        ColumnDef::new(RewardTransactions::DrawReference)
                            .string_len(200)
                            .null(),
                    )
                    .col(ColumnDef::new(RewardTransactions::CheckDate).date().null())
                    .col(ColumnDef::new(RewardTransactions::PoolDate).date().null())
                    .col(ColumnDef::new(RewardTransactions::Description).text().null())
                    .col(
                        ColumnDef::new(RewardTransactions::CreatedAt)
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
                    .if_not_exists()
                    .name("uq_reward_transactions_reference")
                    .table(RewardTransactions::Table)
                    .col(RewardTransactions::Reference)
                    .unique()
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_reward_transactions_user_created")
                    .table(RewardTransactions::Table)
                    .col(RewardTransactions::UserKey)
                    .col(RewardTransactions::CreatedAt)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_reward_transactions_pool_date")
                    .table(RewardTransactions::Table)
                    .col(RewardTransactions::PoolDate)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(
                Table::drop()
                    .if_exists()
                    .table(RewardTransactions::Table)
                    .to_owned(),
            )
            .await?;

        manager
            .drop_table(
                Table::drop()
                    .if_exists()
                    .table(AwardRecords::Table)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }
}
