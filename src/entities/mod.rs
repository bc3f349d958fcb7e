pub mod award_records;
pub mod common;
pub mod daily_pools;
pub mod reward_transactions;
pub mod user_balances;

pub use award_records as award_record_entity;
pub use common::{RewardKind, TransactionType};
pub use daily_pools as daily_pool_entity;
pub use reward_transactions as reward_transaction_entity;
pub use user_balances as user_balance_entity;
