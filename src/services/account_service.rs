use crate::error::AppResult;
use crate::models::{TransactionHistoryResponse, TransactionQuery, UserBalancesResponse};
use crate::services::{BalanceLedger, TransactionLog};
use crate::utils::{PaginationParams, normalize_user_key};
use sea_orm::DatabaseConnection;

/// 用户侧只读查询: 余额与流水
#[derive(Clone)]
pub struct AccountService {
    ledger: BalanceLedger,
    log: TransactionLog,
}

impl AccountService {
    pub fn new(pool: DatabaseConnection) -> Self {
        Self {
            ledger: BalanceLedger::new(pool.clone(), 1),
            log: TransactionLog::new(pool),
        }
    }

    /// 两种奖励的余额，未产生过记录的类型返回 0
    pub async fn balances(&self, phone: &str) -> AppResult<UserBalancesResponse> {
        let user_key = normalize_user_key(phone)?;
        let rows = self.ledger.balances_for(&user_key).await?;
        Ok(UserBalancesResponse::from_rows(user_key, rows))
    }

    pub async fn transactions(
        &self,
        phone: &str,
        query: &TransactionQuery,
    ) -> AppResult<TransactionHistoryResponse> {
        let user_key = normalize_user_key(phone)?;
        let params = PaginationParams::new(query.page, query.per_page);
        let (rows, total) = self.log.history(&user_key, &params).await?;

        Ok(TransactionHistoryResponse {
            items: rows.into_iter().map(Into::into).collect(),
            pagination: params.info(total),
        })
    }
}
