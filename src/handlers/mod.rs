pub mod admin;
pub mod reward;

pub use admin::admin_config;
pub use reward::reward_config;
