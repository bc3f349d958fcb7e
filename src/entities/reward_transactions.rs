use super::{RewardKind, TransactionType};
use chrono::{DateTime, NaiveDate, Utc};
use sea_orm::entity::prelude::*;

/// 余额流水，只追加。balance_after = balance_before + amount
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq)]
#[sea_orm(table_name = "reward_transactions")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub reference: Uuid,
    pub user_key: String,
    pub kind: RewardKind,
    pub transaction_type: TransactionType,
    pub amount: i64,
    pub balance_before: i64,
    pub balance_after: i64,
    pub ticket_number: Option<String>,
    pub draw_reference: Option<String>,
    pub check_date: Option<NaiveDate>,
    pub pool_date: Option<NaiveDate>,
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl Model {
    pub fn is_balanced(&self) -> bool {
        self.balance_after - self.balance_before == self.amount
    }
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
