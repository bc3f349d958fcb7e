use crate::entities::{RewardKind, award_record_entity as awards};
use crate::error::AppResult;
use chrono::{DateTime, NaiveDate, Utc};
use sea_orm::sea_query::{OnConflict, Query};
use sea_orm::{ColumnTrait, ConnectionTrait, DatabaseConnection, DbErr, EntityTrait, QueryFilter};

/// 待登记的一次奖励
#[derive(Debug, Clone)]
pub struct NewAward {
    pub user_key: String,
    pub award_date: NaiveDate,
    pub kind: RewardKind,
    pub amount: i64,
    pub ticket_number: String,
    pub draw_reference: Option<String>,
    pub awarded_at: DateTime<Utc>,
}

/// 每日奖励登记表
///
/// (user_key, award_date) 上的唯一索引是防止重复发放的最终保障；
/// `has_awarded_today` 只是快速预检，并发下不可单独依赖。
#[derive(Clone)]
pub struct AwardRegistry {
    pool: DatabaseConnection,
}

impl AwardRegistry {
    pub fn new(pool: DatabaseConnection) -> Self {
        Self { pool }
    }

    pub async fn find_award<C: ConnectionTrait>(
        &self,
        conn: &C,
        user_key: &str,
        date: NaiveDate,
    ) -> Result<Option<awards::Model>, DbErr> {
        awards::Entity::find()
            .filter(awards::Column::UserKey.eq(user_key))
            .filter(awards::Column::AwardDate.eq(date))
            .one(conn)
            .await
    }

    pub async fn has_awarded_today(&self, user_key: &str, today: NaiveDate) -> AppResult<bool> {
        Ok(self.find_award(&self.pool, user_key, today).await?.is_some())
    }

    /// 登记奖励。已存在同用户同日记录时返回 false，调用方应回滚整个事务
    pub async fn record_award<C: ConnectionTrait>(
        &self,
        conn: &C,
        award: &NewAward,
    ) -> Result<bool, DbErr> {
        let insert = Query::insert()
            .into_table(awards::Entity)
            .columns([
                awards::Column::UserKey,
                awards::Column::AwardDate,
                awards::Column::Kind,
                awards::Column::Amount,
                awards::Column::TicketNumber,
                awards::Column::DrawReference,
                awards::Column::AwardedAt,
            ])
            .values_panic([
                award.user_key.clone().into(),
                award.award_date.into(),
                award.kind.to_string().into(),
                award.amount.into(),
                award.ticket_number.clone().into(),
                award.draw_reference.clone().into(),
                award.awarded_at.into(),
            ])
            .on_conflict(
                OnConflict::columns([awards::Column::UserKey, awards::Column::AwardDate])
                    .do_nothing()
                    .to_owned(),
            )
            .to_owned();
        let stmt = conn.get_database_backend().build(&insert);
        let res = conn.execute(stmt).await?;
        Ok(res.rows_affected() == 1)
    }

    pub async fn awards_since(
        &self,
        user_key: &str,
        since: NaiveDate,
    ) -> AppResult<Vec<awards::Model>> {
        Ok(awards::Entity::find()
            .filter(awards::Column::UserKey.eq(user_key))
            .filter(awards::Column::AwardDate.gte(since))
            .all(&self.pool)
            .await?)
    }

    pub async fn cleanup_before(&self, before: NaiveDate) -> AppResult<u64> {
        let res = awards::Entity::delete_many()
            .filter(awards::Column::AwardDate.lt(before))
            .exec(&self.pool)
            .await?;
        Ok(res.rows_affected)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::memory_pool;

    fn award(user_key: &str, kind: RewardKind) -> NewAward {
        NewAward {
            user_key: user_key.to_string(),
            award_date: NaiveDate::from_ymd_opt(2025, 7, 26).unwrap(),
            kind,
            amount: 25,
            ticket_number: "PA123456".to_string(),
            draw_reference: Some("Karunya KR-712".to_string()),
            awarded_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn test_record_award_once_per_day_across_kinds() {
        let db = memory_pool().await;
        let registry = AwardRegistry::new(db.clone());
        let today = NaiveDate::from_ymd_opt(2025, 7, 26).unwrap();

        assert!(!registry.has_awarded_today("+919876543210", today).await.unwrap());
        assert!(
            registry
                .record_award(&db, &award("+919876543210", RewardKind::Points))
                .await
                .unwrap()
        );
        assert!(registry.has_awarded_today("+919876543210", today).await.unwrap());

        // 同日再次登记（任意类型）被唯一约束拒绝
        assert!(
            !registry
                .record_award(&db, &award("+919876543210", RewardKind::Points))
                .await
                .unwrap()
        );
        assert!(
            !registry
                .record_award(&db, &award("+919876543210", RewardKind::Cash))
                .await
                .unwrap()
        );

        // 其他用户不受影响
        assert!(
            registry
                .record_award(&db, &award("+919876543211", RewardKind::Cash))
                .await
                .unwrap()
        );
    }

    #[tokio::test]
    async fn test_cleanup_before() {
        let db = memory_pool().await;
        let registry = AwardRegistry::new(db.clone());
        let mut old = award("+919876543210", RewardKind::Points);
        old.award_date = NaiveDate::from_ymd_opt(2025, 6, 1).unwrap();
        registry.record_award(&db, &old).await.unwrap();
        registry
            .record_award(&db, &award("+919876543210", RewardKind::Points))
            .await
            .unwrap();

        let removed = registry
            .cleanup_before(NaiveDate::from_ymd_opt(2025, 7, 1).unwrap())
            .await
            .unwrap();
        assert_eq!(removed, 1);
    }
}
