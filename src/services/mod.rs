pub mod account_service;
pub mod admin_service;
pub mod award_registry;
pub mod balance_ledger;
pub mod daily_pool_service;
pub mod reward_engine;
pub mod transaction_log;

pub use account_service::*;
pub use admin_service::*;
pub use award_registry::*;
pub use balance_ledger::*;
pub use daily_pool_service::*;
pub use reward_engine::*;
pub use transaction_log::*;
