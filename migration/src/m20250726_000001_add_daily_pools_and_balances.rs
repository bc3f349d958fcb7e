use sea_orm_migration::prelude::*;

/// Daily Pools (每日预算池，按日期与奖励类型各一条)
#[derive(DeriveIden)]
enum DailyPools {
    Table,
    Id,
    PoolDate,
    Kind,
    TotalBudget,
    Distributed,
    Remaining,
    UsersAwarded,
    MaxUsers,
    CreatedAt,
    UpdatedAt,
}

/// User Balances (用户累计余额，按奖励类型各一条)
#[derive(DeriveIden)]
enum UserBalances {
    Table,
    Id,
    UserKey,
    Kind,
    TotalBalance,
    LifetimeEarned,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveMigrationName)]
pub struct Migration;

/// kind 取值: 'cash' (金额单位 paise) / 'points'
/// 约束:
/// - daily_pools (pool_date, kind) 唯一，保证并发 get-or-create 不会产生重复行
/// - user_balances (user_key, kind) 唯一
#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(DailyPools::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(DailyPools::Id)
                            .big_integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(DailyPools::PoolDate).date().not_null())
                    .col(ColumnDef::new(DailyPools::Kind).string_len(16).not_null())
                    .col(
                        ColumnDef::new(DailyPools::TotalBudget)
                            .big_integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(DailyPools::Distributed)
                            .big_integer()
                            .not_null()
                            .default(0),
                    )
                    .col(ColumnDef::new(DailyPools::Remaining).big_integer().not_null())
                    .col(
                        ColumnDef::new(DailyPools::UsersAwarded)
                            .integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(DailyPools::MaxUsers)
                            .integer()
                            .null(), // NULL = 不限制人数
                    )
                    .col(
                        ColumnDef::new(DailyPools::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(
                        ColumnDef::new(DailyPools::UpdatedAt)
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
                    .name("uq_daily_pools_date_kind")
                    .table(DailyPools::Table)
                    .col(DailyPools::PoolDate)
                    .col(DailyPools::Kind)
                    .unique()
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(UserBalances::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(UserBalances::Id)
                            .big_integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(UserBalances::UserKey)
                            .string_len(20)
                            .not_null(),
                    )
                    .col(ColumnDef::new(UserBalances::Kind).string_len(16).not_null())
                    .col(
                        ColumnDef::new(UserBalances::TotalBalance)
                            .big_integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(UserBalances::LifetimeEarned)
                            .big_integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(UserBalances::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(
                        ColumnDef::new(UserBalances::UpdatedAt)
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
                    .name("uq_user_balances_user_kind")
                    .table(UserBalances::Table)
                    .col(UserBalances::UserKey)
                    .col(UserBalances::Kind)
                    .unique()
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
                    .table(UserBalances::Table)
                    .to_owned(),
            )
            .await?;

        manager
            .drop_table(Table::drop().if_exists().table(DailyPools::Table).to_owned())
            .await?;

        Ok(())
    }
}
