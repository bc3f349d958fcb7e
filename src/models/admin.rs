use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::entities::{RewardKind, TransactionType, daily_pool_entity as pool_entity};

use super::{BalanceResponse, TransactionResponse};

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct PoolStatusResponse {
    #[schema(value_type = String, format = Date)]
    pub date: NaiveDate,
    pub kind: RewardKind,
    pub total_budget: i64,
    pub distributed: i64,
    pub remaining: i64,
    pub users_awarded: i32,
    pub max_users: Option<i32>,
    /// 已使用百分比
    pub usage_pct: f64,
}

impl From<pool_entity::Model> for PoolStatusResponse {
    fn from(m: pool_entity::Model) -> Self {
        let usage_pct = if m.total_budget > 0 {
            (m.distributed as f64 / m.total_budget as f64 * 1000.0).round() / 10.0
        } else {
            0.0
        };
        PoolStatusResponse {
            date: m.pool_date,
            kind: m.kind,
            total_budget: m.total_budget,
            distributed: m.distributed,
            remaining: m.remaining,
            users_awarded: m.users_awarded,
            max_users: m.max_users,
            usage_pct,
        }
    }
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct AwardSummary {
    pub kind: RewardKind,
    pub users_awarded: i64,
    pub total_awarded: i64,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct KindTotals {
    pub kind: RewardKind,
    pub lifetime_earned: i64,
    pub current_balance: i64,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct RewardStatusResponse {
    #[schema(value_type = String, format = Date)]
    pub date: NaiveDate,
    pub today_pools: Vec<PoolStatusResponse>,
    pub today_awards: Vec<AwardSummary>,
    pub reward_users: i64,
    pub totals: Vec<KindTotals>,
    /// 最近 7 天预算池
    pub recent_pools: Vec<PoolStatusResponse>,
}

/// 保留天数覆盖，缺省使用配置
#[derive(Debug, Clone, Default, Deserialize, Serialize, ToSchema)]
pub struct CleanupRequest {
    pub award_days: Option<i64>,
    pub transaction_days: Option<i64>,
    pub pool_days: Option<i64>,
}

#[derive(Debug, Clone, Default, Serialize, ToSchema)]
pub struct CleanupReport {
    pub transactions_deleted: u64,
    pub awards_deleted: u64,
    pub pools_deleted: u64,
}

#[derive(Debug, Clone, Deserialize, Serialize, ToSchema)]
pub struct StatsWindowQuery {
    /// 统计窗口天数 (默认 30)
    pub days: Option<i64>,
    /// 奖励类型 (默认 points)
    pub kind: Option<RewardKind>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct WindowEarnings {
    pub kind: RewardKind,
    pub earned: i64,
    pub active_days: i64,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct UserRewardStats {
    pub user_key: String,
    pub balances: Vec<BalanceResponse>,
    pub member_since: Option<DateTime<Utc>>,
    pub recent_transactions: Vec<TransactionResponse>,
    pub window_days: i64,
    pub window: Vec<WindowEarnings>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct UserRank {
    pub user_key: String,
    pub value: i64,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct ActiveUserRank {
    pub user_key: String,
    pub days_active: i64,
    pub total_earned: i64,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct TopUsersResponse {
    pub kind: RewardKind,
    pub window_days: i64,
    pub by_lifetime: Vec<UserRank>,
    pub by_balance: Vec<UserRank>,
    pub most_active: Vec<ActiveUserRank>,
}

/// 人工调整余额
#[derive(Debug, Clone, Deserialize, Serialize, ToSchema)]
pub struct AdjustBalanceRequest {
    pub kind: RewardKind,
    /// 正数入账，负数扣减（cash 为 paise）
    pub amount: i64,
    pub transaction_type: TransactionType,
    #[serde(default)]
    pub description: Option<String>,
}
