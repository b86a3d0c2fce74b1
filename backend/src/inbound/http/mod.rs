//! HTTP inbound adapter exposing REST endpoints.
//!
//! Public report endpoints sit at the root with explicit method handling
//! (other methods answer 405 with the JSON error body). Session endpoints
//! live under `/api/v1`.

pub mod admin;
pub mod error;
pub mod health;
pub mod reports;
pub mod session;
pub mod session_config;
pub mod state;
pub mod users;

use actix_web::{HttpRequest, web};

use crate::domain::Error;

pub use error::ApiResult;

async fn method_not_allowed(request: HttpRequest) -> ApiResult<actix_web::HttpResponse> {
    Err(Error::method_not_allowed(format!(
        "method {} not allowed on {}",
        request.method(),
        request.path()
    )))
}

/// Body and query extraction failures answer with the JSON error body.
fn extractor_configs(cfg: &mut web::ServiceConfig) {
    cfg.app_data(web::JsonConfig::default().error_handler(|err, _| {
        Error::invalid_request(format!("invalid JSON body: {err}")).into()
    }))
    .app_data(web::QueryConfig::default().error_handler(|err, _| {
        Error::invalid_request(format!("invalid query string: {err}")).into()
    }));
}

/// Register the cookie-free report and admin endpoints.
pub fn public_routes(cfg: &mut web::ServiceConfig) {
    extractor_configs(cfg);
    cfg.service(
        web::resource("/check-uin")
            .route(web::get().to(reports::check_uin))
            .default_service(web::to(method_not_allowed)),
    )
    .service(
        web::resource("/create-report")
            .route(web::post().to(reports::create_report))
            .default_service(web::to(method_not_allowed)),
    )
    .service(
        web::resource("/get-report")
            .route(web::get().to(reports::get_report))
            .default_service(web::to(method_not_allowed)),
    )
    .service(
        web::resource("/search-reports")
            .route(web::get().to(reports::search_reports))
            .default_service(web::to(method_not_allowed)),
    )
    .service(
        web::resource("/set-admin-claim")
            .route(web::post().to(admin::set_admin_claim))
            .default_service(web::to(method_not_allowed)),
    )
    .service(
        web::resource("/set-admin-claim/session")
            .route(web::post().to(admin::set_admin_claim_from_session))
            .default_service(web::to(method_not_allowed)),
    );
}

/// Session endpoints, mounted under `/api/v1`.
pub fn api_routes(cfg: &mut web::ServiceConfig) {
    extractor_configs(cfg);
    cfg.service(users::login)
        .service(users::logout)
        .service(users::current_user)
        .service(reports::list_my_reports)
        .service(reports::delete_report);
}
