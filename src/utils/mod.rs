pub mod amount_draw;
pub mod calendar;
pub mod count_cache;
pub mod pagination;
pub mod phone;

pub use amount_draw::*;
pub use calendar::*;
pub use count_cache::{CountCache, DEFAULT_TTL, REWARD_USER_COUNT};
pub use pagination::{PaginationInfo, PaginationParams};
pub use phone::*;
