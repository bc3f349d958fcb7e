use crate::entities::{RewardKind, user_balance_entity as balances};
use crate::error::{AppError, AppResult};
use chrono::Utc;
use sea_orm::sea_query::{Expr, OnConflict, Query};
use sea_orm::{
    ColumnTrait, ConnectionTrait, DatabaseConnection, DbErr, EntityTrait, QueryFilter, QueryOrder,
};

/// 一次余额变动的前后快照
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BalanceChange {
    pub balance_before: i64,
    pub balance_after: i64,
    /// 本次是否新建了余额行
    pub created: bool,
}

/// 用户余额账本
///
/// 更新采用比较并交换: `UPDATE .. WHERE id = ? AND total_balance = <读到的值>`，
/// 冲突时重读重试，次数有上限。
#[derive(Clone)]
pub struct BalanceLedger {
    pool: DatabaseConnection,
    max_attempts: u32,
}

impl BalanceLedger {
    pub fn new(pool: DatabaseConnection, max_attempts: u32) -> Self {
        Self {
            pool,
            max_attempts: max_attempts.max(1),
        }
    }

    pub async fn find<C: ConnectionTrait>(
        &self,
        conn: &C,
        user_key: &str,
        kind: RewardKind,
    ) -> Result<Option<balances::Model>, DbErr> {
        balances::Entity::find()
            .filter(balances::Column::UserKey.eq(user_key))
            .filter(balances::Column::Kind.eq(kind))
            .one(conn)
            .await
    }

    /// 获取余额行，不存在则以 0 创建。返回 (行, 是否新建)
    pub async fn get_or_create<C: ConnectionTrait>(
        &self,
        conn: &C,
        user_key: &str,
        kind: RewardKind,
    ) -> Result<(balances::Model, bool), DbErr> {
        if let Some(m) = self.find(conn, user_key, kind).await? {
            return Ok((m, false));
        }

        let insert = Query::insert()
            .into_table(balances::Entity)
            .columns([
                balances::Column::UserKey,
                balances::Column::Kind,
                balances::Column::TotalBalance,
                balances::Column::LifetimeEarned,
            ])
            .values_panic([
                user_key.into(),
                kind.to_string().into(),
                0i64.into(),
                0i64.into(),
            ])
            .on_conflict(
                OnConflict::columns([balances::Column::UserKey, balances::Column::Kind])
                    .do_nothing()
                    .to_owned(),
            )
            .to_owned();
        let stmt = conn.get_database_backend().build(&insert);
        let created = conn.execute(stmt).await?.rows_affected() > 0;

        let model = self
            .find(conn, user_key, kind)
            .await?
            .ok_or_else(|| DbErr::RecordNotFound(format!("{kind} balance for {user_key}")))?;
        Ok((model, created))
    }

    /// 变更余额（正数为入账，负数为扣减），必须与流水写入处于同一事务。
    /// 正数同时累加 lifetime_earned；扣减后余额不得为负。
    pub async fn add_balance<C: ConnectionTrait>(
        &self,
        conn: &C,
        user_key: &str,
        kind: RewardKind,
        amount: i64,
    ) -> AppResult<BalanceChange> {
        if amount == 0 {
            return Err(AppError::ValidationError(
                "Balance change amount must be non-zero".into(),
            ));
        }

        let (_, created) = self.get_or_create(conn, user_key, kind).await?;
        let earned = amount.max(0);

        for attempt in 1..=self.max_attempts {
            let current = self
                .find(conn, user_key, kind)
                .await?
                .ok_or_else(|| AppError::NotFound(format!("{kind} balance for {user_key}")))?;

            if current.total_balance < 0 {
                return Err(AppError::IntegrityViolation(format!(
                    "{kind} balance for {user_key} is negative ({})",
                    current.total_balance
                )));
            }

            let balance_after = current.total_balance.checked_add(amount).ok_or_else(|| {
                AppError::IntegrityViolation(format!("{kind} balance overflow for {user_key}"))
            })?;
            if balance_after < 0 {
                return Err(AppError::ValidationError(format!(
                    "Insufficient {kind} balance: have {}, need {}",
                    current.total_balance, -amount
                )));
            }

            let result = balances::Entity::update_many()
                .col_expr(balances::Column::TotalBalance, Expr::value(balance_after))
                .col_expr(
                    balances::Column::LifetimeEarned,
                    Expr::col(balances::Column::LifetimeEarned).add(earned),
                )
                .col_expr(balances::Column::UpdatedAt, Expr::value(Utc::now()))
                .filter(balances::Column::Id.eq(current.id))
                .filter(balances::Column::TotalBalance.eq(current.total_balance))
                .exec(conn)
                .await?;

            if result.rows_affected == 1 {
                return Ok(BalanceChange {
                    balance_before: current.total_balance,
                    balance_after,
                    created,
                });
            }
            log::debug!(
                "{kind} balance for {user_key} changed concurrently (attempt {attempt}/{}), retrying",
                self.max_attempts
            );
        }

        Err(AppError::TransientConflict(format!(
            "{kind} balance for {user_key} kept changing"
        )))
    }

    /// 用户全部余额（不存在的类型不返回）
    pub async fn balances_for(&self, user_key: &str) -> AppResult<Vec<balances::Model>> {
        Ok(balances::Entity::find()
            .filter(balances::Column::UserKey.eq(user_key))
            .order_by_asc(balances::Column::Kind)
            .all(&self.pool)
            .await?)
    }
}
