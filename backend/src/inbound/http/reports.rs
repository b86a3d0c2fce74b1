//! Report endpoints.
//!
//! Public, cookie-free endpoints:
//!
//! ```text
//! GET  /check-uin?uin=REI-BNU-2025-0012
//! POST /create-report {"values":{"uin":"REI-BNU-2025-0012",...},"userUid":"..."}
//! GET  /get-report?uin=REI-BNU-2025-0012&debug=1
//! GET  /search-reports?uin=REI-BNU-2025-0012
//! ```
//!
//! Session endpoints under `/api/v1`:
//!
//! ```text
//! GET    /api/v1/reports
//! DELETE /api/v1/reports/{owner}/{id}
//! ```

use actix_web::{HttpResponse, delete, get, web};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};
use utoipa::{IntoParams, ToSchema};

use crate::domain::{Error, ReportDocument, ReportPath, UserId};
use crate::inbound::http::ApiResult;
use crate::inbound::http::session::SessionContext;
use crate::inbound::http::session_config::parse_bool;
use crate::inbound::http::state::HttpState;

/// `?uin=` query shared by the lookup endpoints.
#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct UinQuery {
    /// Identifier to look up; surrounding whitespace is ignored.
    pub uin: Option<String>,
}

/// `GET /get-report` query.
#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct GetReportQuery {
    pub uin: Option<String>,
    /// `1` adds lookup diagnostics to the response.
    pub debug: Option<String>,
}

/// A stored report flattened to `{ "id", "path", ...fields }`.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[serde(transparent)]
#[schema(value_type = Object)]
pub struct ReportBody(pub Map<String, Value>);

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct CheckUinResponse {
    pub exists: bool,
}

/// `POST /create-report` body.
#[derive(Debug, Default, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateReportRequest {
    /// Report fields; must include `uin`.
    #[schema(value_type = Option<Object>)]
    pub values: Option<Map<String, Value>>,
    /// Owner of the report.
    pub user_uid: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct CreateReportResponse {
    pub message: String,
    pub uin: String,
    pub path: String,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct SearchResult {
    pub path: String,
    pub id: String,
    #[schema(value_type = Object)]
    pub data: Map<String, Value>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct SearchReportsResponse {
    pub count: usize,
    pub results: Vec<SearchResult>,
}

impl From<ReportDocument> for SearchResult {
    fn from(document: ReportDocument) -> Self {
        Self {
            path: document.path.to_string(),
            id: document.id().to_owned(),
            data: document.fields.to_map(),
        }
    }
}

impl From<&ReportDocument> for ReportBody {
    fn from(document: &ReportDocument) -> Self {
        let mut body = document.fields.to_map();
        body.insert("id".to_owned(), Value::String(document.id().to_owned()));
        body.insert("path".to_owned(), Value::String(document.path.to_string()));
        Self(body)
    }
}

fn required_uin(raw: Option<String>) -> Result<String, Error> {
    raw.map(|uin| uin.trim().to_owned())
        .filter(|uin| !uin.is_empty())
        .ok_or_else(|| {
            Error::invalid_request("uin is required")
                .with_details(json!({ "field": "uin", "code": "missing_field" }))
        })
}

/// Answer whether any stored report carries the UIN.
#[utoipa::path(
    get,
    path = "/check-uin",
    params(UinQuery),
    responses(
        (status = 200, description = "Lookup result", body = CheckUinResponse),
        (status = 400, description = "Missing or blank uin", body = Error),
        (status = 405, description = "Only GET is supported", body = Error),
        (status = 500, description = "Store failure", body = Error)
    ),
    tags = ["reports"],
    operation_id = "checkUin",
    security([])
)]
pub async fn check_uin(
    state: web::Data<HttpState>,
    query: web::Query<UinQuery>,
) -> ApiResult<web::Json<CheckUinResponse>> {
    let uin = required_uin(query.into_inner().uin)?;
    let exists = state.locator.exists(&uin).await?;
    Ok(web::Json(CheckUinResponse { exists }))
}

/// Upsert a report under `users/{userUid}/testReports/{uin}`.
#[utoipa::path(
    post,
    path = "/create-report",
    request_body = CreateReportRequest,
    responses(
        (status = 200, description = "Report saved", body = CreateReportResponse),
        (status = 400, description = "Missing uin or userUid, or an invalid field", body = Error),
        (status = 405, description = "Only POST is supported", body = Error),
        (status = 409, description = "UIN registered to another user", body = Error),
        (status = 500, description = "Store failure", body = Error),
        (status = 501, description = "No write path configured", body = Error)
    ),
    tags = ["reports"],
    operation_id = "createReport",
    security([])
)]
pub async fn create_report(
    state: web::Data<HttpState>,
    payload: web::Json<CreateReportRequest>,
) -> ApiResult<web::Json<CreateReportResponse>> {
    let CreateReportRequest { values, user_uid } = payload.into_inner();
    let receipt = state
        .writer
        .create(user_uid.as_deref(), values.as_ref())
        .await?;
    Ok(web::Json(CreateReportResponse {
        message: receipt.message().to_owned(),
        uin: receipt.uin.to_string(),
        path: receipt.path.to_string(),
    }))
}

/// Fetch the first report carrying the UIN.
///
/// Reports written to the local fallback store are not visible here.
#[utoipa::path(
    get,
    path = "/get-report",
    params(GetReportQuery),
    responses(
        (status = 200, description = "Report with `id` and `path`", body = ReportBody),
        (status = 400, description = "Missing or blank uin", body = Error),
        (status = 404, description = "No report carries the uin", body = Error),
        (status = 500, description = "Store failure", body = Error)
    ),
    tags = ["reports"],
    operation_id = "getReport",
    security([])
)]
pub async fn get_report(
    state: web::Data<HttpState>,
    query: web::Query<GetReportQuery>,
) -> ApiResult<web::Json<ReportBody>> {
    let GetReportQuery { uin, debug } = query.into_inner();
    let uin = required_uin(uin)?;
    let located = state
        .locator
        .locate(&uin)
        .await?
        .ok_or_else(|| Error::not_found(format!("no report found for uin {uin}")))?;

    let ReportBody(mut body) = ReportBody::from(&located.document);
    if debug.as_deref().and_then(parse_bool).unwrap_or(false) {
        body.insert(
            "debug".to_owned(),
            json!({
                "strategy": located.strategy,
                "ownersProbed": located.owners_probed,
            }),
        );
    }
    Ok(web::Json(ReportBody(body)))
}

/// Every report carrying the UIN, from both lookup strategies.
#[utoipa::path(
    get,
    path = "/search-reports",
    params(UinQuery),
    responses(
        (status = 200, description = "Matches ordered by path", body = SearchReportsResponse),
        (status = 400, description = "Missing or blank uin", body = Error),
        (status = 500, description = "Store failure", body = Error)
    ),
    tags = ["reports"],
    operation_id = "searchReports",
    security([])
)]
pub async fn search_reports(
    state: web::Data<HttpState>,
    query: web::Query<UinQuery>,
) -> ApiResult<web::Json<SearchReportsResponse>> {
    let uin = required_uin(query.into_inner().uin)?;
    let results: Vec<SearchResult> = state
        .locator
        .search(&uin)
        .await?
        .into_iter()
        .map(SearchResult::from)
        .collect();
    Ok(web::Json(SearchReportsResponse {
        count: results.len(),
        results,
    }))
}

/// Reports owned by the signed-in user.
#[utoipa::path(
    get,
    path = "/api/v1/reports",
    responses(
        (status = 200, description = "Caller's reports", body = SearchReportsResponse),
        (status = 401, description = "Login required", body = Error),
        (status = 500, description = "Store failure", body = Error)
    ),
    tags = ["reports"],
    operation_id = "listMyReports"
)]
#[get("/reports")]
pub async fn list_my_reports(
    state: web::Data<HttpState>,
    session: SessionContext,
) -> ApiResult<web::Json<SearchReportsResponse>> {
    let user = session.require_user()?;
    let results: Vec<SearchResult> = state
        .locator
        .list_for_owner(&user.uid)
        .await?
        .into_iter()
        .map(SearchResult::from)
        .collect();
    Ok(web::Json(SearchReportsResponse {
        count: results.len(),
        results,
    }))
}

/// Delete a report. Owners may delete their own; admins may delete any.
#[utoipa::path(
    delete,
    path = "/api/v1/reports/{owner}/{id}",
    params(
        ("owner" = String, Path, description = "Owner uid"),
        ("id" = String, Path, description = "Report id")
    ),
    responses(
        (status = 204, description = "Report deleted"),
        (status = 400, description = "Malformed owner", body = Error),
        (status = 401, description = "Login required, or not the owner", body = Error),
        (status = 404, description = "Report not found", body = Error),
        (status = 501, description = "Deletion needs elevated credentials", body = Error)
    ),
    tags = ["reports"],
    operation_id = "deleteReport"
)]
#[delete("/reports/{owner}/{id}")]
pub async fn delete_report(
    state: web::Data<HttpState>,
    session: SessionContext,
    path: web::Path<(String, String)>,
) -> ApiResult<HttpResponse> {
    let user = session.require_user()?;
    let (owner, id) = path.into_inner();
    let owner = UserId::new(owner).map_err(|error| {
        Error::invalid_request(format!("invalid owner: {error}"))
            .with_details(json!({ "field": "owner", "code": "invalid_field" }))
    })?;
    if owner != user.uid && !user.role.is_admin() {
        return Err(Error::unauthorized("only the owner or an admin may delete a report"));
    }
    state.writer.delete(&ReportPath::new(owner, id)).await?;
    Ok(HttpResponse::NoContent().finish())
}

#[cfg(test)]
#[path = "reports_tests.rs"]
mod tests;
