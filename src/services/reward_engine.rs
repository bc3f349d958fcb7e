use crate::config::RewardsConfig;
use crate::entities::{RewardKind, TransactionType};
use crate::error::{AppError, AppResult};
use crate::models::{DeclineReason, RewardOutcome, TicketCheckRequest};
use crate::services::{
    AwardRegistry, BalanceLedger, DailyPoolService, NewAward, NewTransaction, TransactionLog,
};
use crate::utils::{AmountDraw, CountCache, REWARD_USER_COUNT, RewardCalendar, normalize_user_key};
use chrono::{DateTime, NaiveDate, Utc};
use sea_orm::{DatabaseConnection, DatabaseTransaction, TransactionTrait};
use std::sync::Arc;

/// 一次成功的预算扣减
#[derive(Debug, Clone, Copy)]
struct Reservation {
    kind: RewardKind,
    amount: i64,
    drawn: i64,
}

/// 奖励决策引擎
///
/// 流程:
/// 1. 资格检查: 未中奖 / 查询日期为今天 / 已过截止时间 / 今天未获奖
/// 2. 确保今日 cash、points 预算池存在（事务外 get-or-create）
/// 3. 单一事务内: 先尝试 cash 档扣减，失败则 points 档；登记奖励；入账；写流水
/// 4. 奖励登记遇唯一约束冲突视为今日已获奖，整个事务回滚（包括预算扣减）
///
/// 发放金额在区间内随机抽取，超过剩余预算时按剩余预算发放（封顶而非拒绝）。
#[derive(Clone)]
pub struct RewardEngine {
    pool: DatabaseConnection,
    calendar: RewardCalendar,
    draw: Arc<dyn AmountDraw>,
    pools: DailyPoolService,
    registry: AwardRegistry,
    ledger: BalanceLedger,
    log: TransactionLog,
    counts: CountCache,
    reserve_attempts: u32,
}

impl RewardEngine {
    pub fn new(
        pool: DatabaseConnection,
        config: &RewardsConfig,
        calendar: RewardCalendar,
        draw: Arc<dyn AmountDraw>,
        counts: CountCache,
    ) -> Self {
        Self {
            pools: DailyPoolService::new(pool.clone(), config.cash.clone(), config.points.clone()),
            registry: AwardRegistry::new(pool.clone()),
            ledger: BalanceLedger::new(pool.clone(), config.reserve_attempts),
            log: TransactionLog::new(pool.clone()),
            pool,
            calendar,
            draw,
            counts,
            reserve_attempts: config.reserve_attempts.max(1),
        }
    }

    /// 查票接口的唯一入口
    pub async fn evaluate_reward(&self, check: &TicketCheckRequest) -> AppResult<RewardOutcome> {
        let user_key = normalize_user_key(&check.phone)?;
        let ticket_number = check.ticket_number.trim();
        if ticket_number.is_empty() {
            return Err(AppError::ValidationError("Ticket number is required".into()));
        }

        let now = self.calendar.now();
        let today = self.calendar.date_of(now);

        if let Some(reason) = self.eligibility(check, today, now) {
            log::debug!("Reward declined for {user_key} ticket {ticket_number}: {reason}");
            return Ok(RewardOutcome::declined(reason));
        }

        // 快速预检，唯一约束才是最终保障
        if self.registry.has_awarded_today(&user_key, today).await? {
            log::debug!("Reward declined for {user_key}: already awarded on {today}");
            return Ok(RewardOutcome::declined(DeclineReason::AlreadyAwardedToday));
        }

        for kind in [RewardKind::Cash, RewardKind::Points] {
            self.pools.get_or_create_today_pool(today, kind).await?;
        }

        let txn = self.pool.begin().await?;

        let reservation = match self.reserve_tier(&txn, today, RewardKind::Cash).await? {
            Some(r) => r,
            None => match self.reserve_tier(&txn, today, RewardKind::Points).await? {
                Some(r) => r,
                None => {
                    txn.rollback().await?;
                    log::debug!("Reward declined for {user_key}: both pools exhausted on {today}");
                    return Ok(RewardOutcome::declined(DeclineReason::BudgetExhausted));
                }
            },
        };

        let award = NewAward {
            user_key: user_key.clone(),
            award_date: today,
            kind: reservation.kind,
            amount: reservation.amount,
            ticket_number: ticket_number.to_string(),
            draw_reference: check.draw.clone(),
            awarded_at: now,
        };
        if !self.registry.record_award(&txn, &award).await? {
            // 并发请求已先行登记，回滚本次预算扣减
            txn.rollback().await?;
            log::warn!(
                "Concurrent award for {user_key} on {today} detected at insert, {} reservation rolled back",
                reservation.kind
            );
            return Ok(RewardOutcome::declined(DeclineReason::AlreadyAwardedToday));
        }

        let change = self
            .ledger
            .add_balance(&txn, &user_key, reservation.kind, reservation.amount)
            .await?;

        self.log
            .append(
                &txn,
                NewTransaction {
                    user_key: user_key.clone(),
                    kind: reservation.kind,
                    transaction_type: TransactionType::LotteryCheck,
                    amount: reservation.amount,
                    balance_before: change.balance_before,
                    balance_after: change.balance_after,
                    ticket_number: Some(ticket_number.to_string()),
                    draw_reference: check.draw.clone(),
                    check_date: Some(check.check_date),
                    pool_date: Some(today),
                    description: Some(format!("Daily {} reward", reservation.kind)),
                    created_at: now,
                },
            )
            .await?;

        txn.commit().await?;

        if change.created {
            self.counts.invalidate(REWARD_USER_COUNT).await;
        }

        log::info!(
            "Awarded {} {} to {user_key} for ticket {ticket_number} (drawn {}, balance {} -> {})",
            reservation.amount,
            reservation.kind,
            reservation.drawn,
            change.balance_before,
            change.balance_after
        );

        Ok(RewardOutcome::granted(reservation.kind, reservation.amount))
    }

    fn eligibility(
        &self,
        check: &TicketCheckRequest,
        today: NaiveDate,
        now: DateTime<Utc>,
    ) -> Option<DeclineReason> {
        if check.won_prize {
            Some(DeclineReason::AlreadyWinner)
        } else if check.check_date != today {
            Some(DeclineReason::NotToday)
        } else if !self.calendar.is_past_cutoff(now) {
            Some(DeclineReason::BeforeCutoff)
        } else {
            None
        }
    }

    /// 尝试在某一档位扣减预算。档位耗尽返回 None；
    /// 条件更新持续冲突超过重试次数返回 TransientConflict。
    async fn reserve_tier(
        &self,
        txn: &DatabaseTransaction,
        date: NaiveDate,
        kind: RewardKind,
    ) -> AppResult<Option<Reservation>> {
        let tier = self.pools.tier(kind);
        let drawn = self.draw.draw(tier.min_amount, tier.max_amount);

        for attempt in 1..=self.reserve_attempts {
            let pool = self
                .pools
                .find_pool(txn, date, kind)
                .await?
                .ok_or_else(|| AppError::InternalError(format!("{kind} pool for {date} missing")))?;

            if !pool.is_consistent() {
                log::error!(
                    "{kind} pool {date} violates budget invariant: total {}, distributed {}, remaining {}, users {}/{:?}",
                    pool.total_budget,
                    pool.distributed,
                    pool.remaining,
                    pool.users_awarded,
                    pool.max_users
                );
                return Err(AppError::IntegrityViolation(format!(
                    "{kind} pool for {date} is inconsistent"
                )));
            }

            if pool.is_exhausted() {
                log::debug!(
                    "{kind} pool for {date} exhausted (remaining {}, users {}/{:?})",
                    pool.remaining,
                    pool.users_awarded,
                    pool.max_users
                );
                return Ok(None);
            }

            let amount = drawn.min(pool.remaining);
            if self.pools.reserve(txn, &pool, amount).await? {
                return Ok(Some(Reservation {
                    kind,
                    amount,
                    drawn,
                }));
            }

            log::debug!(
                "{kind} pool reservation of {amount} conflicted (attempt {attempt}/{}), retrying",
                self.reserve_attempts
            );
        }

        Err(AppError::TransientConflict(format!(
            "{kind} pool for {date} kept changing during reservation"
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::TierConfig;
    use crate::database::memory_pool;
    use crate::entities::{
        award_record_entity as awards, daily_pool_entity as pools,
        reward_transaction_entity as txs, user_balance_entity as balances,
    };
    use crate::utils::{FixedClock, FixedDraw};
    use chrono::{FixedOffset, NaiveTime, TimeZone};
    use futures_util::future::join_all;
    use rust_decimal::Decimal;
    use sea_orm::{ColumnTrait, ConnectionTrait, EntityTrait, QueryFilter};

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 7, 26).unwrap()
    }

    /// IST 当天 hh:mm 对应的 UTC 时刻
    fn ist(hour: u32, minute: u32) -> DateTime<Utc> {
        FixedOffset::east_opt(330 * 60)
            .unwrap()
            .with_ymd_and_hms(2025, 7, 26, hour, minute, 0)
            .unwrap()
            .with_timezone(&Utc)
    }

    fn rewards_config(cash: TierConfig, points: TierConfig) -> RewardsConfig {
        RewardsConfig {
            cash,
            points,
            ..RewardsConfig::default()
        }
    }

    fn engine(
        db: &DatabaseConnection,
        now: DateTime<Utc>,
        draw: i64,
        config: RewardsConfig,
    ) -> RewardEngine {
        let calendar = RewardCalendar::new(
            Arc::new(FixedClock(now)),
            FixedOffset::east_opt(330 * 60).unwrap(),
            NaiveTime::from_hms_opt(15, 0, 0).unwrap(),
        );
        RewardEngine::new(
            db.clone(),
            &config,
            calendar,
            Arc::new(FixedDraw(draw)),
            CountCache::default(),
        )
    }

    fn check(phone: &str) -> TicketCheckRequest {
        TicketCheckRequest {
            phone: phone.to_string(),
            ticket_number: "PA 123456".to_string(),
            check_date: today(),
            won_prize: false,
            draw: Some("Karunya KR-712".to_string()),
        }
    }

    fn phone(i: usize) -> String {
        format!("98765432{i:02}")
    }

    async fn pool_row(db: &DatabaseConnection, kind: RewardKind) -> pools::Model {
        pools::Entity::find()
            .filter(pools::Column::PoolDate.eq(today()))
            .filter(pools::Column::Kind.eq(kind))
            .one(db)
            .await
            .unwrap()
            .unwrap()
    }

    #[tokio::test]
    async fn test_winner_is_never_rewarded() {
        let db = memory_pool().await;
        let engine = engine(&db, ist(16, 0), 500, RewardsConfig::default());
        let mut req = check("9876543210");
        req.won_prize = true;

        let outcome = engine.evaluate_reward(&req).await.unwrap();
        assert_eq!(outcome, RewardOutcome::declined(DeclineReason::AlreadyWinner));
        // 未触碰任何表
        assert!(pools::Entity::find().all(&db).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_cutoff_boundary() {
        let db = memory_pool().await;
        let before = engine(&db, ist(14, 59), 500, RewardsConfig::default());
        let outcome = before.evaluate_reward(&check("9876543210")).await.unwrap();
        assert_eq!(outcome, RewardOutcome::declined(DeclineReason::BeforeCutoff));

        let at = engine(&db, ist(15, 0), 500, RewardsConfig::default());
        let outcome = at.evaluate_reward(&check("9876543210")).await.unwrap();
        assert_eq!(outcome.kind(), Some(RewardKind::Cash));
    }

    #[tokio::test]
    async fn test_previous_day_check_is_declined() {
        let db = memory_pool().await;
        let engine = engine(&db, ist(18, 0), 500, RewardsConfig::default());
        let mut req = check("9876543210");
        req.check_date = today().pred_opt().unwrap();

        let outcome = engine.evaluate_reward(&req).await.unwrap();
        assert_eq!(outcome, RewardOutcome::declined(DeclineReason::NotToday));
    }

    #[tokio::test]
    async fn test_cash_award_writes_all_records() {
        let db = memory_pool().await;
        let engine = engine(&db, ist(16, 0), 500, RewardsConfig::default());

        let outcome = engine.evaluate_reward(&check("9876543210")).await.unwrap();
        assert_eq!(
            outcome,
            RewardOutcome::Cash {
                amount: Decimal::new(500, 2)
            }
        );

        let pool = pool_row(&db, RewardKind::Cash).await;
        assert_eq!(pool.distributed, 500);
        assert_eq!(pool.remaining, 9_500);
        assert_eq!(pool.users_awarded, 1);

        let award = awards::Entity::find().one(&db).await.unwrap().unwrap();
        assert_eq!(award.user_key, "+919876543210");
        assert_eq!(award.kind, RewardKind::Cash);
        assert_eq!(award.amount, 500);
        assert_eq!(award.ticket_number, "PA 123456");

        let balance = balances::Entity::find().one(&db).await.unwrap().unwrap();
        assert_eq!(balance.total_balance, 500);
        assert_eq!(balance.lifetime_earned, 500);

        let tx = txs::Entity::find().one(&db).await.unwrap().unwrap();
        assert_eq!(tx.balance_before, 0);
        assert_eq!(tx.balance_after, 500);
        assert_eq!(tx.transaction_type, TransactionType::LotteryCheck);
        assert_eq!(tx.pool_date, Some(today()));
    }

    #[tokio::test]
    async fn test_award_is_capped_by_remaining_budget() {
        let db = memory_pool().await;
        let config = rewards_config(
            TierConfig {
                daily_budget: 500,
                ..TierConfig::cash_default()
            },
            TierConfig::points_default(),
        );
        let engine = engine(&db, ist(16, 0), 800, config);

        let outcome = engine.evaluate_reward(&check("9876543210")).await.unwrap();
        assert_eq!(
            outcome,
            RewardOutcome::Cash {
                amount: Decimal::new(500, 2)
            }
        );
        let pool = pool_row(&db, RewardKind::Cash).await;
        assert_eq!(pool.remaining, 0);
        assert_eq!(pool.distributed, 500);
    }

    #[tokio::test]
    async fn test_second_check_same_day_is_declined() {
        let db = memory_pool().await;
        let engine = engine(&db, ist(16, 0), 20, RewardsConfig::default());

        let first = engine.evaluate_reward(&check("9876543210")).await.unwrap();
        assert!(first.kind().is_some());

        let mut again = check("+91 98765 43210");
        again.ticket_number = "PB 654321".into();
        let second = engine.evaluate_reward(&again).await.unwrap();
        assert_eq!(
            second,
            RewardOutcome::declined(DeclineReason::AlreadyAwardedToday)
        );
    }

    #[tokio::test]
    async fn test_falls_back_to_points_when_cash_cap_reached() {
        let db = memory_pool().await;
        let config = rewards_config(
            TierConfig {
                max_users: Some(1),
                ..TierConfig::cash_default()
            },
            TierConfig::points_default(),
        );
        let engine = engine(&db, ist(16, 0), 30, config);

        let first = engine.evaluate_reward(&check(&phone(1))).await.unwrap();
        assert_eq!(first.kind(), Some(RewardKind::Cash));

        let second = engine.evaluate_reward(&check(&phone(2))).await.unwrap();
        assert_eq!(second, RewardOutcome::Points { amount: 30 });

        let cash = pool_row(&db, RewardKind::Cash).await;
        assert_eq!(cash.users_awarded, 1);
        let points = pool_row(&db, RewardKind::Points).await;
        assert_eq!(points.distributed, 30);
    }

    #[tokio::test]
    async fn test_falls_back_to_points_when_cash_budget_empty() {
        let db = memory_pool().await;
        let config = rewards_config(
            TierConfig {
                daily_budget: 100,
                ..TierConfig::cash_default()
            },
            TierConfig::points_default(),
        );
        let engine = engine(&db, ist(16, 0), 100, config);

        assert_eq!(
            engine.evaluate_reward(&check(&phone(1))).await.unwrap().kind(),
            Some(RewardKind::Cash)
        );
        assert_eq!(
            engine.evaluate_reward(&check(&phone(2))).await.unwrap().kind(),
            Some(RewardKind::Points)
        );
    }

    #[tokio::test]
    async fn test_no_reward_when_both_pools_exhausted() {
        let db = memory_pool().await;
        let config = rewards_config(
            TierConfig {
                max_users: Some(1),
                ..TierConfig::cash_default()
            },
            TierConfig {
                daily_budget: 50,
                ..TierConfig::points_default()
            },
        );
        let engine = engine(&db, ist(16, 0), 50, config);

        assert_eq!(
            engine.evaluate_reward(&check(&phone(1))).await.unwrap().kind(),
            Some(RewardKind::Cash)
        );
        assert_eq!(
            engine.evaluate_reward(&check(&phone(2))).await.unwrap(),
            RewardOutcome::Points { amount: 50 }
        );
        let third = engine.evaluate_reward(&check(&phone(3))).await.unwrap();
        assert_eq!(third, RewardOutcome::declined(DeclineReason::BudgetExhausted));

        // 失败的评估不留下任何记录
        let award = awards::Entity::find()
            .filter(awards::Column::UserKey.eq(format!("+91{}", phone(3))))
            .one(&db)
            .await
            .unwrap();
        assert!(award.is_none());
    }

    #[tokio::test]
    async fn test_concurrent_duplicate_checks_award_once() {
        let db = memory_pool().await;
        let engine = engine(&db, ist(16, 0), 300, RewardsConfig::default());
        let req = check("9876543210");

        let outcomes = join_all((0..10).map(|_| engine.evaluate_reward(&req))).await;
        let outcomes: Vec<RewardOutcome> = outcomes.into_iter().map(|o| o.unwrap()).collect();

        let granted = outcomes.iter().filter(|o| o.kind().is_some()).count();
        let duplicates = outcomes
            .iter()
            .filter(|o| o.decline_reason() == Some(DeclineReason::AlreadyAwardedToday))
            .count();
        assert_eq!(granted, 1);
        assert_eq!(duplicates, 9);

        // 被回滚的尝试不会多扣预算
        let pool = pool_row(&db, RewardKind::Cash).await;
        assert_eq!(pool.distributed, 300);
        assert_eq!(pool.users_awarded, 1);
        assert_eq!(txs::Entity::find().all(&db).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_concurrent_users_respect_budget_and_cap() {
        let db = memory_pool().await;
        let config = rewards_config(
            TierConfig {
                daily_budget: 10_000,
                min_amount: 100,
                max_amount: 1_000,
                max_users: Some(30),
            },
            TierConfig {
                daily_budget: 95,
                min_amount: 1,
                max_amount: 50,
                max_users: None,
            },
        );
        let engine = engine(&db, ist(20, 0), 100, config);
        let requests: Vec<TicketCheckRequest> = (0..40).map(|i| check(&phone(i))).collect();

        let outcomes: Vec<RewardOutcome> = join_all(requests.iter().map(|r| engine.evaluate_reward(r)))
            .await
            .into_iter()
            .map(|o| o.unwrap())
            .collect();

        let cash = outcomes
            .iter()
            .filter(|o| o.kind() == Some(RewardKind::Cash))
            .count();
        let points: i64 = outcomes
            .iter()
            .filter_map(|o| match o {
                RewardOutcome::Points { amount } => Some(*amount),
                _ => None,
            })
            .sum();
        let exhausted = outcomes
            .iter()
            .filter(|o| o.decline_reason() == Some(DeclineReason::BudgetExhausted))
            .count();

        // 30 人领取 cash（人数上限），points 预算 95 -> 50 + 45，剩余 8 人无奖励
        assert_eq!(cash, 30);
        assert_eq!(points, 95);
        assert_eq!(exhausted, 8);

        let cash_pool = pool_row(&db, RewardKind::Cash).await;
        assert!(cash_pool.is_consistent());
        assert_eq!(cash_pool.users_awarded, 30);
        assert_eq!(cash_pool.distributed, 3_000);

        let points_pool = pool_row(&db, RewardKind::Points).await;
        assert!(points_pool.is_consistent());
        assert_eq!(points_pool.remaining, 0);

        let cash_awards = awards::Entity::find()
            .filter(awards::Column::Kind.eq(RewardKind::Cash))
            .all(&db)
            .await
            .unwrap();
        assert_eq!(cash_awards.len(), 30);
        assert_eq!(cash_awards.iter().map(|a| a.amount).sum::<i64>(), cash_pool.distributed);
    }

    #[tokio::test]
    async fn test_ledger_matches_transaction_history() {
        let db = memory_pool().await;
        let user = "9876543210";
        for (day, hour) in [(26, 16), (27, 16), (28, 17)] {
            let now = FixedOffset::east_opt(330 * 60)
                .unwrap()
                .with_ymd_and_hms(2025, 7, day, hour, 0, 0)
                .unwrap()
                .with_timezone(&Utc);
            let engine = engine(&db, now, 25, RewardsConfig::default());
            let mut req = check(user);
            req.check_date = NaiveDate::from_ymd_opt(2025, 7, day).unwrap();
            assert!(engine.evaluate_reward(&req).await.unwrap().kind().is_some());
        }

        let history = txs::Entity::find().all(&db).await.unwrap();
        assert_eq!(history.len(), 3);
        assert!(history.iter().all(|t| t.is_balanced()));

        let balance = balances::Entity::find()
            .filter(balances::Column::UserKey.eq("+919876543210"))
            .one(&db)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(
            balance.total_balance,
            history.iter().map(|t| t.amount).sum::<i64>()
        );
    }

    #[tokio::test]
    async fn test_lost_reservations_end_in_transient_conflict() {
        let db = memory_pool().await;
        let config = RewardsConfig {
            reserve_attempts: 2,
            ..RewardsConfig::default()
        };
        let engine = engine(&db, ist(16, 0), 300, config);

        // 条件更新始终影响 0 行，而重读的池仍有预算
        db.execute_unprepared(
            "CREATE TRIGGER freeze_daily_pools BEFORE UPDATE ON daily_pools \
             BEGIN SELECT RAISE(IGNORE); END;",
        )
        .await
        .unwrap();

        let err = engine.evaluate_reward(&check("9876543210")).await.unwrap_err();
        assert!(matches!(err, AppError::TransientConflict(_)));

        let pool = pool_row(&db, RewardKind::Cash).await;
        assert_eq!(pool.distributed, 0);
        assert_eq!(pool.remaining, 10_000);
        assert_eq!(pool.users_awarded, 0);
        assert!(awards::Entity::find().all(&db).await.unwrap().is_empty());
        assert!(balances::Entity::find().all(&db).await.unwrap().is_empty());
        assert!(txs::Entity::find().all(&db).await.unwrap().is_empty());

        // 冲突消失后重试同一请求正常发放
        db.execute_unprepared("DROP TRIGGER freeze_daily_pools;")
            .await
            .unwrap();
        let outcome = engine.evaluate_reward(&check("9876543210")).await.unwrap();
        assert_eq!(outcome.kind(), Some(RewardKind::Cash));
    }

    #[tokio::test]
    async fn test_invalid_input_is_rejected() {
        let db = memory_pool().await;
        let engine = engine(&db, ist(16, 0), 25, RewardsConfig::default());

        let err = engine.evaluate_reward(&check("12345")).await.unwrap_err();
        assert!(matches!(err, AppError::ValidationError(_)));

        let mut req = check("9876543210");
        req.ticket_number = "   ".into();
        let err = engine.evaluate_reward(&req).await.unwrap_err();
        assert!(matches!(err, AppError::ValidationError(_)));
    }
}
