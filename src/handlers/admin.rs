use actix_web::{HttpResponse, ResponseError, Result, web};

use crate::entities::RewardKind;
use crate::error::AppError;
use crate::middlewares::AdminTokenMiddleware;
use crate::models::*;
use crate::services::AdminService;

#[utoipa::path(
    get,
    path = "/api/v1/admin/rewards/status",
    tag = "admin",
    security(("admin_token" = [])),
    responses(
        (status = 200, description = "奖励系统状态", body = RewardStatusResponse),
        (status = 403, description = "管理令牌无效")
    )
)]
pub async fn get_status(admin_service: web::Data<AdminService>) -> Result<HttpResponse> {
    match admin_service.status().await {
        Ok(status) => Ok(HttpResponse::Ok().json(ApiResponse::success(status))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    post,
    path = "/api/v1/admin/rewards/pools/{kind}/reset",
    tag = "admin",
    security(("admin_token" = [])),
    params(
        ("kind" = String, Path, description = "cash 或 points")
    ),
    responses(
        (status = 200, description = "今日预算池已重置", body = PoolStatusResponse),
        (status = 400, description = "奖励类型错误"),
        (status = 403, description = "管理令牌无效")
    )
)]
pub async fn reset_pool(
    admin_service: web::Data<AdminService>,
    path: web::Path<String>,
) -> Result<HttpResponse> {
    let kind = match path.parse::<RewardKind>() {
        Ok(kind) => kind,
        Err(msg) => return Ok(AppError::ValidationError(msg).error_response()),
    };

    match admin_service.reset_today(kind).await {
        Ok(pool) => Ok(HttpResponse::Ok().json(ApiResponse::success_with_message(
            pool,
            format!("Today's {kind} pool has been reset"),
        ))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    post,
    path = "/api/v1/admin/rewards/cleanup",
    tag = "admin",
    security(("admin_token" = [])),
    request_body = CleanupRequest,
    responses(
        (status = 200, description = "清理完成", body = CleanupReport),
        (status = 400, description = "保留天数无效"),
        (status = 403, description = "管理令牌无效")
    )
)]
pub async fn cleanup(
    admin_service: web::Data<AdminService>,
    request: Option<web::Json<CleanupRequest>>,
) -> Result<HttpResponse> {
    let request = request.map(|r| r.into_inner()).unwrap_or_default();

    match admin_service.cleanup(&request).await {
        Ok(report) => Ok(HttpResponse::Ok().json(ApiResponse::success(report))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    get,
    path = "/api/v1/admin/rewards/users/{phone}",
    tag = "admin",
    security(("admin_token" = [])),
    params(
        ("phone" = String, Path, description = "手机号"),
        ("days" = Option<i64>, Query, description = "统计窗口天数 (默认 30)")
    ),
    responses(
        (status = 200, description = "用户奖励统计", body = UserRewardStats),
        (status = 400, description = "请求参数错误"),
        (status = 403, description = "管理令牌无效")
    )
)]
pub async fn get_user_stats(
    admin_service: web::Data<AdminService>,
    path: web::Path<String>,
    query: web::Query<StatsWindowQuery>,
) -> Result<HttpResponse> {
    match admin_service.user_stats(&path, &query).await {
        Ok(stats) => Ok(HttpResponse::Ok().json(ApiResponse::success(stats))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    get,
    path = "/api/v1/admin/rewards/top-users",
    tag = "admin",
    security(("admin_token" = [])),
    params(
        ("days" = Option<i64>, Query, description = "统计窗口天数 (默认 30)"),
        ("kind" = Option<String>, Query, description = "cash 或 points (默认 points)")
    ),
    responses(
        (status = 200, description = "排行榜", body = TopUsersResponse),
        (status = 403, description = "管理令牌无效")
    )
)]
pub async fn get_top_users(
    admin_service: web::Data<AdminService>,
    query: web::Query<StatsWindowQuery>,
) -> Result<HttpResponse> {
    match admin_service.top_users(&query).await {
        Ok(top) => Ok(HttpResponse::Ok().json(ApiResponse::success(top))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    post,
    path = "/api/v1/admin/rewards/users/{phone}/adjust",
    tag = "admin",
    security(("admin_token" = [])),
    params(
        ("phone" = String, Path, description = "手机号")
    ),
    request_body = AdjustBalanceRequest,
    responses(
        (status = 200, description = "调账成功", body = TransactionResponse),
        (status = 400, description = "金额或类型无效、余额不足"),
        (status = 403, description = "管理令牌无效")
    )
)]
pub async fn adjust_balance(
    admin_service: web::Data<AdminService>,
    path: web::Path<String>,
    request: web::Json<AdjustBalanceRequest>,
) -> Result<HttpResponse> {
    match admin_service.adjust_balance(&path, &request).await {
        Ok(entry) => Ok(HttpResponse::Ok().json(ApiResponse::success(entry))),
        Err(e) => Ok(e.error_response()),
    }
}

pub fn admin_config(token: String) -> impl FnOnce(&mut web::ServiceConfig) {
    move |cfg: &mut web::ServiceConfig| {
        cfg.service(
            web::scope("/admin/rewards")
                .wrap(AdminTokenMiddleware::new(&token))
                .route("/status", web::get().to(get_status))
                .route("/pools/{kind}/reset", web::post().to(reset_pool))
                .route("/cleanup", web::post().to(cleanup))
                .route("/users/{phone}", web::get().to(get_user_stats))
                .route("/top-users", web::get().to(get_top_users))
                .route("/users/{phone}/adjust", web::post().to(adjust_balance)),
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{RetentionConfig, RewardsConfig};
    use crate::database::memory_pool;
    use crate::middlewares::ADMIN_TOKEN_HEADER;
    use crate::utils::{CountCache, FixedClock, RewardCalendar};
    use actix_web::{App, test};
    use chrono::{FixedOffset, NaiveTime, TimeZone, Utc};
    use serde_json::{Value, json};
    use std::sync::Arc;

    #[actix_web::test]
    async fn test_admin_responses_use_standard_envelope() {
        let db = memory_pool().await;
        let now = Utc.with_ymd_and_hms(2025, 7, 26, 11, 0, 0).unwrap();
        let calendar = RewardCalendar::new(
            Arc::new(FixedClock(now)),
            FixedOffset::east_opt(330 * 60).unwrap(),
            NaiveTime::from_hms_opt(15, 0, 0).unwrap(),
        );
        let service = AdminService::new(
            db,
            &RewardsConfig::default(),
            RetentionConfig::default(),
            calendar,
            CountCache::default(),
        );

        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(service))
                .service(web::scope("/api/v1").configure(admin_config("s3cret".into()))),
        )
        .await;

        let req = test::TestRequest::get()
            .uri("/api/v1/admin/rewards/status")
            .insert_header((ADMIN_TOKEN_HEADER, "s3cret"))
            .to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["success"], true);
        assert_eq!(body["data"]["date"], "2025-07-26");
        assert_eq!(body["data"]["reward_users"], 0);
        assert!(body.get("message").is_none());
        assert!(body.get("error").is_none());

        let req = test::TestRequest::post()
            .uri("/api/v1/admin/rewards/cleanup")
            .insert_header((ADMIN_TOKEN_HEADER, "s3cret"))
            .set_json(json!({ "award_days": 30 }))
            .to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["success"], true);
        assert_eq!(body["data"]["awards_deleted"], 0);
    }
}
