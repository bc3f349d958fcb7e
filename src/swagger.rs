use actix_web::web;
use utoipa::OpenApi;
use utoipa::{
    Modify,
    openapi::security::{ApiKey, ApiKeyValue, SecurityScheme},
};
use utoipa_swagger_ui::SwaggerUi;

use crate::entities::{RewardKind, TransactionType};
use crate::handlers;
use crate::middlewares::ADMIN_TOKEN_HEADER;
use crate::models::*;
use crate::utils::PaginationInfo;

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "admin_token",
                SecurityScheme::ApiKey(ApiKey::Header(ApiKeyValue::new(ADMIN_TOKEN_HEADER))),
            )
        }
    }
}

#[derive(OpenApi)]
#[openapi(
    paths(
        handlers::reward::evaluate_reward,
        handlers::reward::get_balance,
        handlers::reward::get_transactions,
        handlers::admin::get_status,
        handlers::admin::reset_pool,
        handlers::admin::cleanup,
        handlers::admin::get_user_stats,
        handlers::admin::get_top_users,
        handlers::admin::adjust_balance,
    ),
    components(
        schemas(
            RewardKind,
            TransactionType,
            TicketCheckRequest,
            DeclineReason,
            RewardOutcome,
            BalanceResponse,
            CashBalanceResponse,
            UserBalancesResponse,
            TransactionResponse,
            TransactionQuery,
            TransactionHistoryResponse,
            PaginationInfo,
            PoolStatusResponse,
            AwardSummary,
            KindTotals,
            RewardStatusResponse,
            CleanupRequest,
            CleanupReport,
            StatsWindowQuery,
            WindowEarnings,
            UserRewardStats,
            UserRank,
            ActiveUserRank,
            TopUsersResponse,
            AdjustBalanceRequest,
            ApiError,
        )
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "rewards", description = "Daily lottery-check reward API"),
        (name = "admin", description = "Reward pool administration API"),
    ),
    info(
        title = "Lottery Rewards API",
        version = "1.0.0",
        description = "Daily consolation rewards for non-winning lottery ticket checks"
    )
)]
pub struct ApiDoc;

pub fn swagger_config(cfg: &mut web::ServiceConfig) {
    cfg.service(
        SwaggerUi::new("/swagger-ui/{_:.*}").url("/api-docs/openapi.json", ApiDoc::openapi()),
    )
    .route(
        "/swagger-ui",
        web::get().to(|| async {
            actix_web::HttpResponse::Found()
                .append_header(("Location", "/swagger-ui/"))
                .finish()
        }),
    );
}
