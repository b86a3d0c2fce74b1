//! Admin promotion endpoints.
//!
//! ```text
//! POST /set-admin-claim          X-Admin-Secret: ...  {"uid":"..."}
//! POST /set-admin-claim/session  (admin session)      {"uid":"..."}
//! ```

use actix_web::{HttpRequest, web};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::info;
use utoipa::ToSchema;

use crate::domain::{Error, UserId};
use crate::inbound::http::ApiResult;
use crate::inbound::http::session::SessionContext;
use crate::inbound::http::state::HttpState;

/// Header carrying the shared admin secret.
pub const ADMIN_SECRET_HEADER: &str = "X-Admin-Secret";

#[derive(Debug, Default, Serialize, Deserialize, ToSchema)]
pub struct SetAdminClaimRequest {
    /// Uid of the user to promote.
    pub uid: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct SetAdminClaimResponse {
    pub message: String,
}

fn target_uid(request: SetAdminClaimRequest) -> Result<UserId, Error> {
    let raw = request
        .uid
        .map(|uid| uid.trim().to_owned())
        .filter(|uid| !uid.is_empty())
        .ok_or_else(|| {
            Error::invalid_request("uid is required")
                .with_details(json!({ "field": "uid", "code": "missing_field" }))
        })?;
    UserId::new(raw).map_err(|error| {
        Error::invalid_request(format!("invalid uid: {error}"))
            .with_details(json!({ "field": "uid", "code": "invalid_field" }))
    })
}

fn require_admin_secret(state: &HttpState, request: &HttpRequest) -> Result<(), Error> {
    let Some(expected) = state.admin_secret.as_ref() else {
        return Err(Error::unauthorized("admin secret is not configured"));
    };
    let provided = request
        .headers()
        .get(ADMIN_SECRET_HEADER)
        .and_then(|value| value.to_str().ok())
        .ok_or_else(|| Error::unauthorized("missing admin secret"))?;
    if expected.matches(provided) {
        Ok(())
    } else {
        Err(Error::unauthorized("invalid admin secret"))
    }
}

async fn promote(state: &HttpState, uid: &UserId) -> ApiResult<web::Json<SetAdminClaimResponse>> {
    let profile = state.accounts.grant_admin(uid).await?;
    info!(uid = %profile.id(), "admin role granted");
    Ok(web::Json(SetAdminClaimResponse {
        message: format!("User {uid} is now an admin"),
    }))
}

/// Promote a user, authorised by the shared admin secret.
#[utoipa::path(
    post,
    path = "/set-admin-claim",
    request_body = SetAdminClaimRequest,
    params(("X-Admin-Secret" = String, Header, description = "Shared admin secret")),
    responses(
        (status = 200, description = "Profile and claim updated", body = SetAdminClaimResponse),
        (status = 400, description = "Missing or invalid uid", body = Error),
        (status = 401, description = "Missing or invalid secret", body = Error),
        (status = 404, description = "No profile for uid", body = Error),
        (status = 500, description = "Claim update failed; retry to repair", body = Error),
        (status = 501, description = "No claims service configured", body = Error)
    ),
    tags = ["admin"],
    operation_id = "setAdminClaim",
    security([])
)]
pub async fn set_admin_claim(
    state: web::Data<HttpState>,
    request: HttpRequest,
    payload: web::Json<SetAdminClaimRequest>,
) -> ApiResult<web::Json<SetAdminClaimResponse>> {
    require_admin_secret(&state, &request)?;
    let uid = target_uid(payload.into_inner())?;
    promote(&state, &uid).await
}

/// Promote a user, authorised by the caller's admin session.
#[utoipa::path(
    post,
    path = "/set-admin-claim/session",
    request_body = SetAdminClaimRequest,
    responses(
        (status = 200, description = "Profile and claim updated", body = SetAdminClaimResponse),
        (status = 400, description = "Missing or invalid uid", body = Error),
        (status = 401, description = "Admin session required", body = Error),
        (status = 404, description = "No profile for uid", body = Error),
        (status = 500, description = "Claim update failed; retry to repair", body = Error)
    ),
    tags = ["admin"],
    operation_id = "setAdminClaimFromSession"
)]
pub async fn set_admin_claim_from_session(
    state: web::Data<HttpState>,
    session: SessionContext,
    payload: web::Json<SetAdminClaimRequest>,
) -> ApiResult<web::Json<SetAdminClaimResponse>> {
    let caller = session.require_admin()?;
    let uid = target_uid(payload.into_inner())?;
    info!(caller = %caller.uid, target = %uid, "admin promotion requested from session");
    promote(&state, &uid).await
}

#[cfg(test)]
#[path = "admin_tests.rs"]
mod tests;
