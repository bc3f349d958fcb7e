use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::entities::{
    RewardKind, TransactionType, reward_transaction_entity as tx_entity,
    user_balance_entity as balance_entity,
};
use super::paise_to_rupees;
use crate::utils::PaginationInfo;

/// 余额原始值（cash 单位为 paise，供管理端使用）
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct BalanceResponse {
    pub kind: RewardKind,
    pub total_balance: i64,
    pub lifetime_earned: i64,
}

impl BalanceResponse {
    pub fn empty(kind: RewardKind) -> Self {
        Self {
            kind,
            total_balance: 0,
            lifetime_earned: 0,
        }
    }
}

impl From<balance_entity::Model> for BalanceResponse {
    fn from(m: balance_entity::Model) -> Self {
        BalanceResponse {
            kind: m.kind,
            total_balance: m.total_balance,
            lifetime_earned: m.lifetime_earned,
        }
    }
}

/// 用户侧 cash 余额，以卢比（两位小数）展示，与发奖结果一致
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct CashBalanceResponse {
    #[schema(value_type = String)]
    pub total_balance: Decimal,
    #[schema(value_type = String)]
    pub lifetime_earned: Decimal,
}

impl CashBalanceResponse {
    pub fn empty() -> Self {
        Self {
            total_balance: Decimal::ZERO,
            lifetime_earned: Decimal::ZERO,
        }
    }
}

impl From<balance_entity::Model> for CashBalanceResponse {
    fn from(m: balance_entity::Model) -> Self {
        CashBalanceResponse {
            total_balance: paise_to_rupees(m.total_balance),
            lifetime_earned: paise_to_rupees(m.lifetime_earned),
        }
    }
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct UserBalancesResponse {
    pub user_key: String,
    pub cash: CashBalanceResponse,
    pub points: BalanceResponse,
}

impl UserBalancesResponse {
    pub fn from_rows(user_key: String, rows: Vec<balance_entity::Model>) -> Self {
        let mut cash = CashBalanceResponse::empty();
        let mut points = BalanceResponse::empty(RewardKind::Points);
        for row in rows {
            match row.kind {
                RewardKind::Cash => cash = row.into(),
                RewardKind::Points => points = row.into(),
            }
        }
        Self {
            user_key,
            cash,
            points,
        }
    }
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct TransactionResponse {
    pub reference: Uuid,
    pub kind: RewardKind,
    pub transaction_type: TransactionType,
    pub amount: i64,
    pub balance_before: i64,
    pub balance_after: i64,
    pub ticket_number: Option<String>,
    pub draw_reference: Option<String>,
    #[schema(value_type = Option<String>, format = Date)]
    pub check_date: Option<NaiveDate>,
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl From<tx_entity::Model> for TransactionResponse {
    fn from(m: tx_entity::Model) -> Self {
        TransactionResponse {
            reference: m.reference,
            kind: m.kind,
            transaction_type: m.transaction_type,
            amount: m.amount,
            balance_before: m.balance_before,
            balance_after: m.balance_after,
            ticket_number: m.ticket_number,
            draw_reference: m.draw_reference,
            check_date: m.check_date,
            description: m.description,
            created_at: m.created_at,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize, ToSchema)]
pub struct TransactionQuery {
    pub page: Option<u32>,
    pub per_page: Option<u32>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct TransactionHistoryResponse {
    pub items: Vec<TransactionResponse>,
    pub pagination: PaginationInfo,
}
