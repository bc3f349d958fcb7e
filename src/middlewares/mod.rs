pub mod auth;
pub mod cors;

pub use auth::{ADMIN_TOKEN_HEADER, AdminTokenMiddleware};
pub use cors::create_cors;
