use crate::error::AppError;
use actix_web::http::Method;
use actix_web::{
    Error,
    dev::{Service, ServiceRequest, ServiceResponse, Transform, forward_ready},
};
use futures_util::future::LocalBoxFuture;
use std::future::{Ready, ready};
use std::rc::Rc;

pub const ADMIN_TOKEN_HEADER: &str = "X-Admin-Token";

/// 管理接口令牌校验，挂在 /admin scope 上。
/// 未配置令牌时拒绝所有管理请求。
pub struct AdminTokenMiddleware {
    token: Rc<str>,
}

impl AdminTokenMiddleware {
    pub fn new(token: &str) -> Self {
        if token.is_empty() {
            log::warn!("admin.token is empty, admin endpoints will reject every request");
        }
        Self {
            token: Rc::from(token),
        }
    }
}

impl<S, B> Transform<S, ServiceRequest> for AdminTokenMiddleware
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error>,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type InitError = ();
    type Transform = AdminTokenMiddlewareService<S>;
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(AdminTokenMiddlewareService {
            service,
            token: self.token.clone(),
        }))
    }
}

pub struct AdminTokenMiddlewareService<S> {
    service: S,
    token: Rc<str>,
}

impl<S> AdminTokenMiddlewareService<S> {
    fn is_authorized(&self, req: &ServiceRequest) -> bool {
        if self.token.is_empty() {
            return false;
        }
        req.headers()
            .get(ADMIN_TOKEN_HEADER)
            .and_then(|v| v.to_str().ok())
            .is_some_and(|provided| provided == &*self.token)
    }
}

impl<S, B> Service<ServiceRequest> for AdminTokenMiddlewareService<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error>,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;

    forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        // 放行所有 CORS 预检请求
        if req.method() == Method::OPTIONS || self.is_authorized(&req) {
            let fut = self.service.call(req);
            return Box::pin(fut);
        }

        log::warn!("Rejected admin request to {} without valid token", req.path());
        let error = AppError::Forbidden;
        Box::pin(async move { Err(error.into()) })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::{App, HttpResponse, test, web};

    async fn ok() -> HttpResponse {
        HttpResponse::Ok().finish()
    }

    #[actix_web::test]
    async fn test_admin_token_is_required() {
        let app = test::init_service(
            App::new().service(
                web::scope("/admin")
                    .wrap(AdminTokenMiddleware::new("s3cret"))
                    .route("/ping", web::get().to(ok)),
            ),
        )
        .await;

        let req = test::TestRequest::get()
            .uri("/admin/ping")
            .insert_header((ADMIN_TOKEN_HEADER, "s3cret"))
            .to_request();
        assert!(test::call_service(&app, req).await.status().is_success());

        let req = test::TestRequest::get()
            .uri("/admin/ping")
            .insert_header((ADMIN_TOKEN_HEADER, "wrong"))
            .to_request();
        let err = test::try_call_service(&app, req).await.unwrap_err();
        assert_eq!(err.error_response().status().as_u16(), 403);
    }

    #[actix_web::test]
    async fn test_empty_token_rejects_everything() {
        let app = test::init_service(
            App::new().service(
                web::scope("/admin")
                    .wrap(AdminTokenMiddleware::new(""))
                    .route("/ping", web::get().to(ok)),
            ),
        )
        .await;

        let req = test::TestRequest::get()
            .uri("/admin/ping")
            .insert_header((ADMIN_TOKEN_HEADER, ""))
            .to_request();
        assert!(test::try_call_service(&app, req).await.is_err());
    }
}
