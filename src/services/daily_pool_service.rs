use crate::config::TierConfig;
use crate::entities::{RewardKind, daily_pool_entity as pools};
use crate::error::{AppError, AppResult};
use chrono::{NaiveDate, Utc};
use sea_orm::sea_query::{Expr, OnConflict, Query};
use sea_orm::{
    ColumnTrait, Condition, ConnectionTrait, DatabaseConnection, DbErr, EntityTrait, QueryFilter,
    QueryOrder, UpdateResult,
};

/// 每日预算池
///
/// 并发策略（乐观）:
/// - 创建: INSERT .. ON CONFLICT (pool_date, kind) DO NOTHING 后重新读取，不会产生重复行
/// - 扣减: 单条条件 UPDATE (remaining >= amount 且人数未满)，rows_affected 为 0 即失败
///   行锁由 UPDATE 自身持有至事务结束，调用方负责重读重试
#[derive(Clone)]
pub struct DailyPoolService {
    pool: DatabaseConnection,
    cash: TierConfig,
    points: TierConfig,
}

impl DailyPoolService {
    pub fn new(pool: DatabaseConnection, cash: TierConfig, points: TierConfig) -> Self {
        Self { pool, cash, points }
    }

    pub fn tier(&self, kind: RewardKind) -> &TierConfig {
        match kind {
            RewardKind::Cash => &self.cash,
            RewardKind::Points => &self.points,
        }
    }

    pub async fn find_pool<C: ConnectionTrait>(
        &self,
        conn: &C,
        date: NaiveDate,
        kind: RewardKind,
    ) -> Result<Option<pools::Model>, DbErr> {
        pools::Entity::find()
            .filter(pools::Column::PoolDate.eq(date))
            .filter(pools::Column::Kind.eq(kind))
            .one(conn)
            .await
    }

    /// 获取指定日期的预算池，不存在则按配置创建
    pub async fn get_or_create_pool<C: ConnectionTrait>(
        &self,
        conn: &C,
        date: NaiveDate,
        kind: RewardKind,
    ) -> Result<pools::Model, DbErr> {
        if let Some(m) = self.find_pool(conn, date, kind).await? {
            return Ok(m);
        }

        let tier = self.tier(kind);
        let insert = Query::insert()
            .into_table(pools::Entity)
            .columns([
                pools::Column::PoolDate,
                pools::Column::Kind,
                pools::Column::TotalBudget,
                pools::Column::Distributed,
                pools::Column::Remaining,
                pools::Column::UsersAwarded,
                pools::Column::MaxUsers,
            ])
            .values_panic([
                date.into(),
                kind.to_string().into(),
                tier.daily_budget.into(),
                0i64.into(),
                tier.daily_budget.into(),
                0i32.into(),
                tier.max_users.into(),
            ])
            .on_conflict(
                OnConflict::columns([pools::Column::PoolDate, pools::Column::Kind])
                    .do_nothing()
                    .to_owned(),
            )
            .to_owned();
        let stmt = conn.get_database_backend().build(&insert);
        let res = conn.execute(stmt).await?;
        if res.rows_affected() > 0 {
            log::info!(
                "Created {kind} pool for {date}: budget {}, max users {:?}",
                tier.daily_budget,
                tier.max_users
            );
        }

        // 无论是否由本次插入创建，都以数据库中的行为准
        self.find_pool(conn, date, kind)
            .await?
            .ok_or_else(|| DbErr::RecordNotFound(format!("{kind} pool for {date}")))
    }

    pub async fn get_or_create_today_pool(
        &self,
        today: NaiveDate,
        kind: RewardKind,
    ) -> AppResult<pools::Model> {
        Ok(self.get_or_create_pool(&self.pool, today, kind).await?)
    }

    /// 原子扣减预算: 成功返回 true；预算不足或人数已满返回 false（业务结果，不是错误）
    pub async fn reserve<C: ConnectionTrait>(
        &self,
        conn: &C,
        pool: &pools::Model,
        amount: i64,
    ) -> Result<bool, DbErr> {
        if amount <= 0 {
            return Ok(false);
        }

        let result: UpdateResult = pools::Entity::update_many()
            .col_expr(
                pools::Column::Distributed,
                Expr::col(pools::Column::Distributed).add(amount),
            )
            .col_expr(
                pools::Column::Remaining,
                Expr::col(pools::Column::Remaining).sub(amount),
            )
            .col_expr(
                pools::Column::UsersAwarded,
                Expr::col(pools::Column::UsersAwarded).add(1),
            )
            .col_expr(pools::Column::UpdatedAt, Expr::value(Utc::now()))
            .filter(pools::Column::Id.eq(pool.id))
            .filter(pools::Column::Remaining.gte(amount))
            .filter(
                Condition::any()
                    .add(pools::Column::MaxUsers.is_null())
                    .add(
                        Expr::col(pools::Column::UsersAwarded)
                            .lt(Expr::col(pools::Column::MaxUsers)),
                    ),
            )
            .exec(conn)
            .await?;

        Ok(result.rows_affected == 1)
    }

    pub async fn pools_on(&self, date: NaiveDate) -> AppResult<Vec<pools::Model>> {
        Ok(pools::Entity::find()
            .filter(pools::Column::PoolDate.eq(date))
            .order_by_asc(pools::Column::Kind)
            .all(&self.pool)
            .await?)
    }

    pub async fn pools_since(&self, since: NaiveDate) -> AppResult<Vec<pools::Model>> {
        Ok(pools::Entity::find()
            .filter(pools::Column::PoolDate.gte(since))
            .order_by_desc(pools::Column::PoolDate)
            .order_by_asc(pools::Column::Kind)
            .all(&self.pool)
            .await?)
    }

    /// 将某日预算池重置为当前配置（管理操作）
    pub async fn reset(&self, date: NaiveDate, kind: RewardKind) -> AppResult<pools::Model> {
        let existing = self.get_or_create_pool(&self.pool, date, kind).await?;
        let tier = self.tier(kind);

        pools::Entity::update_many()
            .col_expr(pools::Column::TotalBudget, Expr::value(tier.daily_budget))
            .col_expr(pools::Column::Distributed, Expr::value(0i64))
            .col_expr(pools::Column::Remaining, Expr::value(tier.daily_budget))
            .col_expr(pools::Column::UsersAwarded, Expr::value(0i32))
            .col_expr(pools::Column::MaxUsers, Expr::value(tier.max_users))
            .col_expr(pools::Column::UpdatedAt, Expr::value(Utc::now()))
            .filter(pools::Column::Id.eq(existing.id))
            .exec(&self.pool)
            .await?;

        log::info!(
            "Reset {kind} pool for {date}: was {}/{} distributed, now {} available",
            existing.distributed,
            existing.total_budget,
            tier.daily_budget
        );

        pools::Entity::find_by_id(existing.id)
            .one(&self.pool)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("{kind} pool for {date}")))
    }

    /// 删除早于 before 的预算池；before 之后（含当天）的池不受影响
    pub async fn cleanup_before(&self, before: NaiveDate) -> AppResult<u64> {
        let res = pools::Entity::delete_many()
            .filter(pools::Column::PoolDate.lt(before))
            .exec(&self.pool)
            .await?;
        Ok(res.rows_affected)
    }
}
