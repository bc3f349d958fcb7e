use crate::config::{RetentionConfig, RewardsConfig};
use crate::entities::{
    RewardKind, TransactionType, award_record_entity as awards, user_balance_entity as balances,
};
use crate::error::{AppError, AppResult};
use crate::models::{
    ActiveUserRank, AdjustBalanceRequest, AwardSummary, BalanceResponse, CleanupReport,
    CleanupRequest, KindTotals, PoolStatusResponse, RewardStatusResponse, StatsWindowQuery,
    TopUsersResponse, TransactionResponse, UserRank, UserRewardStats, WindowEarnings,
};
use crate::services::{
    AwardRegistry, BalanceLedger, DailyPoolService, NewTransaction, TransactionLog,
};
use crate::utils::{CountCache, REWARD_USER_COUNT, RewardCalendar, normalize_user_key};
use chrono::{Duration, NaiveDate, TimeDelta};
use sea_orm::sea_query::{Alias, Expr, Func};
use sea_orm::{
    ColumnTrait, DatabaseConnection, EntityTrait, FromQueryResult, Order, PaginatorTrait,
    QueryFilter, QueryOrder, QuerySelect, TransactionTrait,
};

const TOP_USERS_LIMIT: u64 = 10;
const RECENT_TRANSACTIONS: u64 = 10;
const DEFAULT_WINDOW_DAYS: i64 = 30;
/// 保留天数上限（约 10 年）
const MAX_RETENTION_DAYS: i64 = 3650;

/// 跨后端一致的 SUM: Postgres 对 bigint 求和得到 numeric，统一转回 bigint
fn sum_bigint<C: ColumnTrait>(col: C) -> sea_orm::sea_query::SimpleExpr {
    Func::cast_as(Expr::col(col).sum(), Alias::new("bigint")).into()
}

/// 运营管理: 状态总览、重置、清理、用户统计与人工调账
#[derive(Clone)]
pub struct AdminService {
    pool: DatabaseConnection,
    calendar: RewardCalendar,
    pools: DailyPoolService,
    registry: AwardRegistry,
    ledger: BalanceLedger,
    log: TransactionLog,
    counts: CountCache,
    retention: RetentionConfig,
}

impl AdminService {
    pub fn new(
        pool: DatabaseConnection,
        rewards: &RewardsConfig,
        retention: RetentionConfig,
        calendar: RewardCalendar,
        counts: CountCache,
    ) -> Self {
        Self {
            pools: DailyPoolService::new(
                pool.clone(),
                rewards.cash.clone(),
                rewards.points.clone(),
            ),
            registry: AwardRegistry::new(pool.clone()),
            ledger: BalanceLedger::new(pool.clone(), rewards.reserve_attempts),
            log: TransactionLog::new(pool.clone()),
            pool,
            calendar,
            counts,
            retention,
        }
    }

    /// 确保今天两种预算池都存在（定时任务调用）
    pub async fn ensure_today_pools(&self) -> AppResult<()> {
        let today = self.calendar.today();
        for kind in [RewardKind::Cash, RewardKind::Points] {
            self.pools.get_or_create_today_pool(today, kind).await?;
        }
        Ok(())
    }

    pub async fn status(&self) -> AppResult<RewardStatusResponse> {
        let today = self.calendar.today();

        let today_pools = self
            .pools
            .pools_on(today)
            .await?
            .into_iter()
            .map(PoolStatusResponse::from)
            .collect();

        #[derive(Debug, FromQueryResult)]
        struct AwardRow {
            kind: RewardKind,
            users_awarded: i64,
            total_awarded: Option<i64>,
        }
        let today_awards = awards::Entity::find()
            .filter(awards::Column::AwardDate.eq(today))
            .select_only()
            .column(awards::Column::Kind)
            .column_as(Expr::val(1).count(), "users_awarded")
            .column_as(sum_bigint(awards::Column::Amount), "total_awarded")
            .group_by(awards::Column::Kind)
            .into_model::<AwardRow>()
            .all(&self.pool)
            .await?
            .into_iter()
            .map(|r| AwardSummary {
                kind: r.kind,
                users_awarded: r.users_awarded,
                total_awarded: r.total_awarded.unwrap_or(0),
            })
            .collect();

        #[derive(Debug, FromQueryResult)]
        struct TotalsRow {
            kind: RewardKind,
            lifetime_earned: Option<i64>,
            current_balance: Option<i64>,
        }
        let totals = balances::Entity::find()
            .select_only()
            .column(balances::Column::Kind)
            .column_as(sum_bigint(balances::Column::LifetimeEarned), "lifetime_earned")
            .column_as(sum_bigint(balances::Column::TotalBalance), "current_balance")
            .group_by(balances::Column::Kind)
            .into_model::<TotalsRow>()
            .all(&self.pool)
            .await?
            .into_iter()
            .map(|r| KindTotals {
                kind: r.kind,
                lifetime_earned: r.lifetime_earned.unwrap_or(0),
                current_balance: r.current_balance.unwrap_or(0),
            })
            .collect();

        let reward_users = self.reward_user_count().await?;

        let recent_pools = self
            .pools
            .pools_since(today - Duration::days(6))
            .await?
            .into_iter()
            .map(PoolStatusResponse::from)
            .collect();

        Ok(RewardStatusResponse {
            date: today,
            today_pools,
            today_awards,
            reward_users,
            totals,
            recent_pools,
        })
    }

    /// 有余额记录的用户数（缓存）
    pub async fn reward_user_count(&self) -> AppResult<i64> {
        let pool = self.pool.clone();
        self.counts
            .get_or_recount(REWARD_USER_COUNT, || async move {
                let n = balances::Entity::find()
                    .select_only()
                    .column(balances::Column::UserKey)
                    .distinct()
                    .count(&pool)
                    .await?;
                Ok::<i64, AppError>(n as i64)
            })
            .await
    }

    pub async fn reset_today(&self, kind: RewardKind) -> AppResult<PoolStatusResponse> {
        let today = self.calendar.today();
        let pool = self.pools.reset(today, kind).await?;
        log::warn!("Admin reset of today's {kind} pool ({today})");
        Ok(pool.into())
    }

    /// 按保留天数清理历史数据；今天的预算池与奖励登记永远不会被删除
    pub async fn cleanup(&self, request: &CleanupRequest) -> AppResult<CleanupReport> {
        let award_days = request.award_days.unwrap_or(self.retention.award_days);
        let transaction_days = request
            .transaction_days
            .unwrap_or(self.retention.transaction_days);
        let pool_days = request.pool_days.unwrap_or(self.retention.pool_days);

        for (name, days) in [
            ("award_days", award_days),
            ("transaction_days", transaction_days),
            ("pool_days", pool_days),
        ] {
            if !(1..=MAX_RETENTION_DAYS).contains(&days) {
                return Err(AppError::ValidationError(format!(
                    "{name} must be between 1 and {MAX_RETENTION_DAYS}, got {days}"
                )));
            }
        }

        let now = self.calendar.now();
        let today = self.calendar.date_of(now);

        let transactions_before = now
            .checked_sub_signed(retention_window("transaction_days", transaction_days)?)
            .ok_or_else(|| out_of_range("transaction_days"))?;
        let awards_before = today
            .checked_sub_signed(retention_window("award_days", award_days)?)
            .ok_or_else(|| out_of_range("award_days"))?;
        let pools_before = today
            .checked_sub_signed(retention_window("pool_days", pool_days)?)
            .ok_or_else(|| out_of_range("pool_days"))?;

        let report = CleanupReport {
            transactions_deleted: self.log.cleanup_before(transactions_before).await?,
            awards_deleted: self.registry.cleanup_before(awards_before).await?,
            pools_deleted: self.pools.cleanup_before(pools_before).await?,
        };

        log::info!(
            "Reward cleanup: {} transactions, {} awards, {} pools deleted",
            report.transactions_deleted,
            report.awards_deleted,
            report.pools_deleted
        );
        Ok(report)
    }

    pub async fn user_stats(
        &self,
        phone: &str,
        query: &StatsWindowQuery,
    ) -> AppResult<UserRewardStats> {
        let user_key = normalize_user_key(phone)?;
        let window_days = window_days(query.days)?;
        let since = self.calendar.today() - Duration::days(window_days - 1);

        let rows = self.ledger.balances_for(&user_key).await?;
        let member_since = rows.iter().map(|b| b.created_at).min();
        let balances = rows.into_iter().map(BalanceResponse::from).collect();

        let recent_transactions = self
            .log
            .recent(&user_key, RECENT_TRANSACTIONS)
            .await?
            .into_iter()
            .map(TransactionResponse::from)
            .collect();

        let awards = self.registry.awards_since(&user_key, since).await?;
        let window = [RewardKind::Cash, RewardKind::Points]
            .into_iter()
            .map(|kind| {
                let of_kind = awards.iter().filter(|a| a.kind == kind);
                WindowEarnings {
                    kind,
                    earned: of_kind.clone().map(|a| a.amount).sum(),
                    active_days: of_kind.count() as i64,
                }
            })
            .collect();

        Ok(UserRewardStats {
            user_key,
            balances,
            member_since,
            recent_transactions,
            window_days,
            window,
        })
    }

    pub async fn top_users(&self, query: &StatsWindowQuery) -> AppResult<TopUsersResponse> {
        let kind = query.kind.unwrap_or(RewardKind::Points);
        let window_days = window_days(query.days)?;
        let since: NaiveDate = self.calendar.today() - Duration::days(window_days - 1);

        let by_lifetime = self
            .ranked_balances(kind, balances::Column::LifetimeEarned)
            .await?
            .into_iter()
            .map(|b| UserRank {
                user_key: b.user_key,
                value: b.lifetime_earned,
            })
            .collect();

        let by_balance = self
            .ranked_balances(kind, balances::Column::TotalBalance)
            .await?
            .into_iter()
            .map(|b| UserRank {
                user_key: b.user_key,
                value: b.total_balance,
            })
            .collect();

        #[derive(Debug, FromQueryResult)]
        struct ActiveRow {
            user_key: String,
            days_active: i64,
            total_earned: Option<i64>,
        }
        let most_active = awards::Entity::find()
            .filter(awards::Column::Kind.eq(kind))
            .filter(awards::Column::AwardDate.gte(since))
            .select_only()
            .column(awards::Column::UserKey)
            .column_as(Expr::val(1).count(), "days_active")
            .column_as(sum_bigint(awards::Column::Amount), "total_earned")
            .group_by(awards::Column::UserKey)
            .order_by(Expr::cust("days_active"), Order::Desc)
            .order_by(Expr::cust("total_earned"), Order::Desc)
            .order_by_asc(awards::Column::UserKey)
            .limit(TOP_USERS_LIMIT)
            .into_model::<ActiveRow>()
            .all(&self.pool)
            .await?
            .into_iter()
            .map(|r| ActiveUserRank {
                user_key: r.user_key,
                days_active: r.days_active,
                total_earned: r.total_earned.unwrap_or(0),
            })
            .collect();

        Ok(TopUsersResponse {
            kind,
            window_days,
            by_lifetime,
            by_balance,
            most_active,
        })
    }

    async fn ranked_balances(
        &self,
        kind: RewardKind,
        order: balances::Column,
    ) -> AppResult<Vec<balances::Model>> {
        Ok(balances::Entity::find()
            .filter(balances::Column::Kind.eq(kind))
            .filter(order.gt(0))
            .order_by_desc(order)
            .order_by_asc(balances::Column::UserKey)
            .limit(TOP_USERS_LIMIT)
            .all(&self.pool)
            .await?)
    }

    /// 人工调账: bonus 只能为正，redemption 只能为负，adjustment 可正可负；
    /// 查票奖励只能由奖励引擎产生
    pub async fn adjust_balance(
        &self,
        phone: &str,
        request: &AdjustBalanceRequest,
    ) -> AppResult<TransactionResponse> {
        let user_key = normalize_user_key(phone)?;

        if request.amount == 0 {
            return Err(AppError::ValidationError("Amount must be non-zero".into()));
        }
        match request.transaction_type {
            TransactionType::LotteryCheck => {
                return Err(AppError::ValidationError(
                    "lottery_check transactions are created by reward evaluation only".into(),
                ));
            }
            TransactionType::Bonus if request.amount < 0 => {
                return Err(AppError::ValidationError("Bonus amount must be positive".into()));
            }
            TransactionType::Redemption if request.amount > 0 => {
                return Err(AppError::ValidationError(
                    "Redemption amount must be negative".into(),
                ));
            }
            _ => {}
        }

        let now = self.calendar.now();
        let txn = self.pool.begin().await?;

        let change = self
            .ledger
            .add_balance(&txn, &user_key, request.kind, request.amount)
            .await?;
        let entry = self
            .log
            .append(
                &txn,
                NewTransaction {
                    user_key: user_key.clone(),
                    kind: request.kind,
                    transaction_type: request.transaction_type,
                    amount: request.amount,
                    balance_before: change.balance_before,
                    balance_after: change.balance_after,
                    ticket_number: None,
                    draw_reference: None,
                    check_date: None,
                    pool_date: None,
                    description: request.description.clone(),
                    created_at: now,
                },
            )
            .await?;

        txn.commit().await?;

        if change.created {
            self.counts.invalidate(REWARD_USER_COUNT).await;
        }

        log::info!(
            "Admin {} of {} {} for {user_key}: balance {} -> {}",
            request.transaction_type,
            request.amount,
            request.kind,
            change.balance_before,
            change.balance_after
        );

        Ok(entry.into())
    }
}

fn retention_window(name: &str, days: i64) -> AppResult<TimeDelta> {
    TimeDelta::try_days(days).ok_or_else(|| out_of_range(name))
}

fn out_of_range(name: &str) -> AppError {
    AppError::ValidationError(format!("{name} is out of range"))
}

fn window_days(days: Option<i64>) -> AppResult<i64> {
    let days = days.unwrap_or(DEFAULT_WINDOW_DAYS);
    if !(1..=366).contains(&days) {
        return Err(AppError::ValidationError(
            "days must be between 1 and 366".into(),
        ));
    }
    Ok(days)
}
