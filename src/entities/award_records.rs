use super::RewardKind;
use chrono::{DateTime, NaiveDate, Utc};
use sea_orm::entity::prelude::*;

/// 每日奖励登记，(user_key, award_date) 唯一
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq)]
#[sea_orm(table_name = "award_records")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub user_key: String,
    pub award_date: NaiveDate,
    pub kind: RewardKind,
    pub amount: i64,
    pub ticket_number: String,
    pub draw_reference: Option<String>,
    pub awarded_at: DateTime<Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
