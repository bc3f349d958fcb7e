use super::RewardKind;
use chrono::{DateTime, NaiveDate, Utc};
use sea_orm::entity::prelude::*;

/// 每日预算池
/// 概念说明:
/// - total_budget: 当日固定预算 (cash 为 paise, points 为积分)
/// - distributed: 已发放，单调递增且不超过 total_budget
/// - remaining: total_budget - distributed，始终 >= 0
/// - users_awarded / max_users: 已获奖人数与人数上限 (max_users NULL = 不限)
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq)]
#[sea_orm(table_name = "daily_pools")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub pool_date: NaiveDate,
    pub kind: RewardKind,
    pub total_budget: i64,
    pub distributed: i64,
    pub remaining: i64,
    pub users_awarded: i32,
    pub max_users: Option<i32>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Model {
    /// 人数上限是否已满
    pub fn is_user_cap_reached(&self) -> bool {
        match self.max_users {
            None => false,
            Some(cap) => self.users_awarded >= cap,
        }
    }

    /// 无剩余预算或人数已满
    pub fn is_exhausted(&self) -> bool {
        self.remaining <= 0 || self.is_user_cap_reached()
    }

    /// 预算守恒: distributed + remaining == total_budget 且两者非负
    pub fn is_consistent(&self) -> bool {
        self.distributed >= 0
            && self.remaining >= 0
            && self.distributed + self.remaining == self.total_budget
            && self.max_users.is_none_or(|cap| self.users_awarded <= cap)
    }
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
