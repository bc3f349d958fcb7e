use super::RewardKind;
use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq)]
#[sea_orm(table_name = "user_balances")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    /// 规范化手机号 (+91xxxxxxxxxx)
    pub user_key: String,
    pub kind: RewardKind,
    pub total_balance: i64,
    /// 累计获得，只增不减
    pub lifetime_earned: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
