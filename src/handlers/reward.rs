use actix_web::{HttpResponse, ResponseError, Result, web};
use crate::models::*;
use crate::services::{AccountService, RewardEngine};

#[utoipa::path(
    post,
    path = "/api/v1/rewards/evaluate",
    tag = "rewards",
    request_body = TicketCheckRequest,
    responses(
        (status = 200, description = "评估完成（含不发放的情况）", body = RewardOutcome),
        (status = 400, description = "请求参数错误"),
        (status = 503, description = "并发冲突，可重试")
    )
)]
pub async fn evaluate_reward(
    engine: web::Data<RewardEngine>,
    request: web::Json<TicketCheckRequest>,
) -> Result<HttpResponse> {
    match engine.evaluate_reward(&request).await {
        Ok(outcome) => Ok(HttpResponse::Ok().json(ApiResponse::success(outcome))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    get,
    path = "/api/v1/rewards/balance/{phone}",
    tag = "rewards",
    params(
        ("phone" = String, Path, description = "手机号")
    ),
    responses(
        (status = 200, description = "获取余额成功", body = UserBalancesResponse),
        (status = 400, description = "手机号格式错误")
    )
)]
pub async fn get_balance(
    account_service: web::Data<AccountService>,
    path: web::Path<String>,
) -> Result<HttpResponse> {
    match account_service.balances(&path).await {
        Ok(balances) => Ok(HttpResponse::Ok().json(ApiResponse::success(balances))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    get,
    path = "/api/v1/rewards/transactions/{phone}",
    tag = "rewards",
    params(
        ("phone" = String, Path, description = "手机号"),
        ("page" = Option<u32>, Query, description = "页码"),
        ("per_page" = Option<u32>, Query, description = "每页数量")
    ),
    responses(
        (status = 200, description = "获取流水成功", body = TransactionHistoryResponse),
        (status = 400, description = "手机号格式错误")
    )
)]
pub async fn get_transactions(
    account_service: web::Data<AccountService>,
    path: web::Path<String>,
    query: web::Query<TransactionQuery>,
) -> Result<HttpResponse> {
    match account_service.transactions(&path, &query).await {
        Ok(history) => Ok(HttpResponse::Ok().json(ApiResponse::success(history))),
        Err(e) => Ok(e.error_response()),
    }
}

pub fn reward_config(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/rewards")
            .route("/evaluate", web::post().to(evaluate_reward))
            .route("/balance/{phone}", web::get().to(get_balance))
            .route("/transactions/{phone}", web::get().to(get_transactions)),
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RewardsConfig;
    use crate::database::memory_pool;
    use crate::utils::{CountCache, FixedClock, FixedDraw, RewardCalendar};
    use actix_web::{App, test};
    use chrono::{FixedOffset, NaiveTime, TimeZone, Utc};
    use serde_json::{Value, json};
    use std::sync::Arc;

    #[actix_web::test]
    async fn test_evaluate_then_read_balance() {
        let db = memory_pool().await;
        let now = Utc.with_ymd_and_hms(2025, 7, 26, 11, 0, 0).unwrap(); // 16:30 IST
        let calendar = RewardCalendar::new(
            Arc::new(FixedClock(now)),
            FixedOffset::east_opt(330 * 60).unwrap(),
            NaiveTime::from_hms_opt(15, 0, 0).unwrap(),
        );
        let engine = RewardEngine::new(
            db.clone(),
            &RewardsConfig::default(),
            calendar,
            Arc::new(FixedDraw(250)),
            CountCache::default(),
        );

        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(engine))
                .app_data(web::Data::new(AccountService::new(db.clone())))
                .service(web::scope("/api/v1").configure(reward_config)),
        )
        .await;

        let req = test::TestRequest::post()
            .uri("/api/v1/rewards/evaluate")
            .set_json(json!({
                "phone": "9876543210",
                "ticket_number": "KR 445566",
                "check_date": "2025-07-26",
                "won_prize": false
            }))
            .to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["success"], true);
        assert_eq!(body["data"]["kind"], "cash");
        assert_eq!(body["data"]["amount"], "2.50");

        let req = test::TestRequest::post()
            .uri("/api/v1/rewards/evaluate")
            .set_json(json!({
                "phone": "9876543210",
                "ticket_number": "KR 445567",
                "check_date": "2025-07-26",
                "won_prize": false
            }))
            .to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["data"]["kind"], "none");
        assert_eq!(body["data"]["reason"], "already awarded today");

        let req = test::TestRequest::get()
            .uri("/api/v1/rewards/balance/+919876543210")
            .to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["data"]["cash"]["total_balance"], "2.50");
        assert_eq!(body["data"]["cash"]["lifetime_earned"], "2.50");
        assert_eq!(body["data"]["points"]["total_balance"], 0);

        let req = test::TestRequest::get()
            .uri("/api/v1/rewards/transactions/9876543210?page=1&per_page=5")
            .to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["data"]["pagination"]["total"], 1);
        assert_eq!(body["data"]["items"][0]["transaction_type"], "lottery_check");
    }

    #[actix_web::test]
    async fn test_invalid_phone_is_bad_request() {
        let db = memory_pool().await;
        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(AccountService::new(db)))
                .service(web::scope("/api/v1").configure(reward_config)),
        )
        .await;

        let req = test::TestRequest::get()
            .uri("/api/v1/rewards/balance/12345")
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status().as_u16(), 400);
    }
}
