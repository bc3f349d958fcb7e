pub mod account;
pub mod admin;
pub mod common;
pub mod reward;

pub use account::*;
pub use admin::*;
pub use common::*;
pub use reward::*;
