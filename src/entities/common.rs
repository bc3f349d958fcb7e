use sea_orm::entity::prelude::*;
use sea_orm::{DeriveActiveEnum, EnumIter};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// 奖励类型: cash 以 paise (1/100 rupee) 记账, points 以整数积分记账
#[derive(
    Debug,
    Clone,
    Copy,
    Hash,
    Serialize,
    Deserialize,
    PartialEq,
    Eq,
    ToSchema,
    DeriveActiveEnum,
    EnumIter,
)]
#[sea_orm(rs_type = "String", db_type = "String(Some(16))")]
#[serde(rename_all = "snake_case")]
pub enum RewardKind {
    #[sea_orm(string_value = "cash")]
    Cash,
    #[sea_orm(string_value = "points")]
    Points,
}

impl std::fmt::Display for RewardKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RewardKind::Cash => write!(f, "cash"),
            RewardKind::Points => write!(f, "points"),
        }
    }
}

impl std::str::FromStr for RewardKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "cash" => Ok(RewardKind::Cash),
            "points" => Ok(RewardKind::Points),
            other => Err(format!("unknown reward kind: {other}")),
        }
    }
}

#[derive(
    Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, ToSchema, DeriveActiveEnum, EnumIter,
)]
#[sea_orm(rs_type = "String", db_type = "String(Some(20))")]
#[serde(rename_all = "snake_case")]
pub enum TransactionType {
    /// 查票未中奖后的每日奖励
    #[sea_orm(string_value = "lottery_check")]
    LotteryCheck,
    #[sea_orm(string_value = "bonus")]
    Bonus,
    #[sea_orm(string_value = "redemption")]
    Redemption,
    /// 人工调整（可正可负）
    #[sea_orm(string_value = "adjustment")]
    Adjustment,
}

impl std::fmt::Display for TransactionType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TransactionType::LotteryCheck => write!(f, "lottery_check"),
            TransactionType::Bonus => write!(f, "bonus"),
            TransactionType::Redemption => write!(f, "redemption"),
            TransactionType::Adjustment => write!(f, "adjustment"),
        }
    }
}
