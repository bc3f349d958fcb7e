use crate::entities::{RewardKind, TransactionType, reward_transaction_entity as txs};
use crate::error::{AppError, AppResult};
use crate::utils::PaginationParams;
use chrono::{DateTime, NaiveDate, Utc};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait,
    PaginatorTrait, QueryFilter, QueryOrder, QuerySelect, Set,
};
use uuid::Uuid;

/// 待写入的流水
#[derive(Debug, Clone)]
pub struct NewTransaction {
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

/// 余额流水（只追加）
#[derive(Clone)]
pub struct TransactionLog {
    pool: DatabaseConnection,
}

impl TransactionLog {
    pub fn new(pool: DatabaseConnection) -> Self {
        Self { pool }
    }

    /// 追加一条流水，必须与余额变更处于同一事务
    pub async fn append<C: ConnectionTrait>(
        &self,
        conn: &C,
        entry: NewTransaction,
    ) -> AppResult<txs::Model> {
        if entry.balance_after - entry.balance_before != entry.amount {
            return Err(AppError::IntegrityViolation(format!(
                "unbalanced {} transaction for {}: {} + {} != {}",
                entry.kind, entry.user_key, entry.balance_before, entry.amount, entry.balance_after
            )));
        }

        let model = txs::ActiveModel {
            reference: Set(Uuid::new_v4()),
            user_key: Set(entry.user_key),
            kind: Set(entry.kind),
            transaction_type: Set(entry.transaction_type),
            amount: Set(entry.amount),
            balance_before: Set(entry.balance_before),
            balance_after: Set(entry.balance_after),
            ticket_number: Set(entry.ticket_number),
            draw_reference: Set(entry.draw_reference),
            check_date: Set(entry.check_date),
            pool_date: Set(entry.pool_date),
            description: Set(entry.description),
            created_at: Set(entry.created_at),
            ..Default::default()
        }
        .insert(conn)
        .await?;

        Ok(model)
    }

    /// 分页查询用户流水（倒序）
    pub async fn history(
        &self,
        user_key: &str,
        params: &PaginationParams,
    ) -> AppResult<(Vec<txs::Model>, i64)> {
        let base_query = txs::Entity::find().filter(txs::Column::UserKey.eq(user_key));

        let total = base_query.clone().count(&self.pool).await? as i64;

        let items = base_query
            .order_by_desc(txs::Column::CreatedAt)
            .order_by_desc(txs::Column::Id)
            .limit(params.get_limit())
            .offset(params.get_offset())
            .all(&self.pool)
            .await?;

        Ok((items, total))
    }

    pub async fn recent(&self, user_key: &str, limit: u64) -> AppResult<Vec<txs::Model>> {
        Ok(txs::Entity::find()
            .filter(txs::Column::UserKey.eq(user_key))
            .order_by_desc(txs::Column::CreatedAt)
            .order_by_desc(txs::Column::Id)
            .limit(limit)
            .all(&self.pool)
            .await?)
    }

    pub async fn all_for(&self, user_key: &str, kind: RewardKind) -> AppResult<Vec<txs::Model>> {
        Ok(txs::Entity::find()
            .filter(txs::Column::UserKey.eq(user_key))
            .filter(txs::Column::Kind.eq(kind))
            .order_by_asc(txs::Column::Id)
            .all(&self.pool)
            .await?)
    }

    /// 保留策略: 删除 before 之前创建的流水
    pub async fn cleanup_before(&self, before: DateTime<Utc>) -> AppResult<u64> {
        let res = txs::Entity::delete_many()
            .filter(txs::Column::CreatedAt.lt(before))
            .exec(&self.pool)
            .await?;
        Ok(res.rows_affected)
    }
}
