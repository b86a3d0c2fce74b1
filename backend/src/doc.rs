//! OpenAPI documentation configuration.
//!
//! [`ApiDoc`] registers every HTTP endpoint from the inbound layer (public
//! report endpoints, admin promotion, the session API and health probes),
//! their request and response schemas, and the session cookie security
//! scheme. Public endpoints opt out of the scheme individually.
//!
//! The generated document is served by Swagger UI (debug builds) and
//! exported via `cargo run --bin openapi-dump` for external tooling.

use utoipa::openapi::security::{ApiKey, ApiKeyValue, SecurityScheme};
use utoipa::{Modify, OpenApi};

use crate::domain::{Error, ErrorCode, LookupStrategy, Role, UserProfile};
use crate::inbound::http::admin::{SetAdminClaimRequest, SetAdminClaimResponse};
use crate::inbound::http::health::ReadinessBody;
use crate::inbound::http::reports::{
    CheckUinResponse, CreateReportRequest, CreateReportResponse, ReportBody, SearchReportsResponse,
    SearchResult,
};
use crate::inbound::http::users::{LoginRequest, LoginResponse};

/// Enrich the generated document with the session cookie security scheme.
struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        let components = openapi
            .components
            .get_or_insert_with(utoipa::openapi::Components::default);

        components.add_security_scheme(
            "SessionCookie",
            SecurityScheme::ApiKey(ApiKey::Cookie(ApiKeyValue::with_description(
                "session",
                "Session cookie issued by POST /api/v1/login.",
            ))),
        );
    }
}

/// OpenAPI document for the REST API.
/// Swagger UI is enabled in debug builds only and used by tooling.
#[derive(OpenApi)]
#[openapi(
    modifiers(&SecurityAddon),
    info(
        title = "Inspectorate report registry API",
        description = "Inspection report lookup, creation and public UIN verification.",
        license(name = "MIT")
    ),
    servers(
        (url = "/", description = "Relative to the deployment base URL")
    ),
    security(("SessionCookie" = [])),
    paths(
        crate::inbound::http::reports::check_uin,
        crate::inbound::http::reports::create_report,
        crate::inbound::http::reports::get_report,
        crate::inbound::http::reports::search_reports,
        crate::inbound::http::reports::list_my_reports,
        crate::inbound::http::reports::delete_report,
        crate::inbound::http::admin::set_admin_claim,
        crate::inbound::http::admin::set_admin_claim_from_session,
        crate::inbound::http::users::login,
        crate::inbound::http::users::logout,
        crate::inbound::http::users::current_user,
        crate::inbound::http::health::ready,
        crate::inbound::http::health::live,
    ),
    components(schemas(
        Error,
        ErrorCode,
        Role,
        UserProfile,
        LookupStrategy,
        CheckUinResponse,
        CreateReportRequest,
        CreateReportResponse,
        ReportBody,
        SearchResult,
        SearchReportsResponse,
        SetAdminClaimRequest,
        SetAdminClaimResponse,
        LoginRequest,
        LoginResponse,
        ReadinessBody,
    )),
    tags(
        (name = "reports", description = "Report lookup, creation and deletion"),
        (name = "admin", description = "Administrator promotion"),
        (name = "users", description = "Session login and profile"),
        (name = "health", description = "Endpoints for health checks")
    )
)]
pub struct ApiDoc;
