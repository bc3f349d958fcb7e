use actix_cors::Cors;
use actix_web::http::header;

use super::ADMIN_TOKEN_HEADER;

pub fn create_cors() -> Cors {
    Cors::default()
        // 查票页面与运营后台不在同一域名下
        .allow_any_origin()
        .allowed_methods(vec!["GET", "POST", "OPTIONS"])
        .allowed_headers(vec![header::CONTENT_TYPE, header::ACCEPT])
        .allowed_header(ADMIN_TOKEN_HEADER)
        .max_age(3600)
}
