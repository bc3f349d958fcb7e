use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::entities::RewardKind;

/// cash 以 paise 记账，对外以卢比（两位小数）展示
pub fn paise_to_rupees(paise: i64) -> Decimal {
    Decimal::new(paise, 2)
}

/// 查票未中奖事件（由查票接口显式调用奖励引擎）
#[derive(Debug, Clone, Deserialize, Serialize, ToSchema)]
pub struct TicketCheckRequest {
    /// 用户手机号，将规范化为 +91xxxxxxxxxx
    pub phone: String,
    pub ticket_number: String,
    /// 查询的开奖日期 (YYYY-MM-DD)
    #[schema(value_type = String, format = Date)]
    pub check_date: NaiveDate,
    /// 该票在对应开奖中是否中奖
    pub won_prize: bool,
    /// 开奖标识，例如 "Karunya KR-712"
    #[serde(default)]
    pub draw: Option<String>,
}

/// 不发放奖励的原因（正常业务结果）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub enum DeclineReason {
    #[serde(rename = "already winner")]
    AlreadyWinner,
    #[serde(rename = "not today")]
    NotToday,
    #[serde(rename = "before cutoff")]
    BeforeCutoff,
    #[serde(rename = "already awarded today")]
    AlreadyAwardedToday,
    #[serde(rename = "budget exhausted")]
    BudgetExhausted,
}

impl std::fmt::Display for DeclineReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            DeclineReason::AlreadyWinner => "already winner",
            DeclineReason::NotToday => "not today",
            DeclineReason::BeforeCutoff => "before cutoff",
            DeclineReason::AlreadyAwardedToday => "already awarded today",
            DeclineReason::BudgetExhausted => "budget exhausted",
        };
        f.write_str(s)
    }
}

/// 奖励评估结果
///
/// 序列化为 `{"kind":"cash","amount":"5.00"}` / `{"kind":"points","amount":12}` /
/// `{"kind":"none","reason":"before cutoff"}`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RewardOutcome {
    Cash {
        #[schema(value_type = String)]
        amount: Decimal,
    },
    Points {
        amount: i64,
    },
    #[serde(rename = "none")]
    NoReward {
        reason: DeclineReason,
    },
}

impl RewardOutcome {
    pub fn declined(reason: DeclineReason) -> Self {
        RewardOutcome::NoReward { reason }
    }

    /// 由档位与入账金额（cash 为 paise）构造
    pub fn granted(kind: RewardKind, amount: i64) -> Self {
        match kind {
            RewardKind::Cash => RewardOutcome::Cash {
                amount: paise_to_rupees(amount),
            },
            RewardKind::Points => RewardOutcome::Points { amount },
        }
    }

    pub fn kind(&self) -> Option<RewardKind> {
        match self {
            RewardOutcome::Cash { .. } => Some(RewardKind::Cash),
            RewardOutcome::Points { .. } => Some(RewardKind::Points),
            RewardOutcome::NoReward { .. } => None,
        }
    }

    pub fn decline_reason(&self) -> Option<DeclineReason> {
        match self {
            RewardOutcome::NoReward { reason } => Some(*reason),
            _ => None,
        }
    }
}
