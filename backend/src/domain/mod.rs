//! Domain primitives, services and ports.
//!
//! Purpose: define the report registry's types and use-cases independently
//! of HTTP and storage. Inbound adapters call the services; outbound
//! adapters implement the traits in [`ports`].
//!
//! Public surface:
//! - Error / ErrorCode: transport-agnostic failure payload.
//! - UserId, Email, Role, UserProfile: account model.
//! - Uin, ReportDraft, ReportFields, ReportPath, ReportDocument: report model.
//! - ReportLocator, ReportWriter, AccountService, DebouncedUinChecker: use-cases.

mod accounts;
pub mod auth;
pub mod error;
pub mod ports;
pub mod report;
mod report_locator;
mod report_writer;
pub mod trace_id;
mod uin_availability;
pub mod user;

pub use self::accounts::{AccountService, AdminAllowList, CLAIM_ATTEMPTS, LoginOutcome};
pub use self::auth::{Identity, LoginCredentials, LoginValidationError};
pub use self::error::{Error, ErrorCode};
pub use self::report::{
    Category, REPORTS_COLLECTION, ReportDocument, ReportDraft, ReportFields, ReportPath,
    ReportValidationError, USERS_COLLECTION, Uin, is_document_key,
};
pub use self::report_locator::{LocatedReport, LookupStrategy, MAX_OWNER_SCAN, ReportLocator};
pub use self::report_writer::{
    ReportWriter, WriteCapability, WriteMode, WriteReceipt,
};
pub use self::trace_id::{TRACE_ID_HEADER, TraceId};
pub use self::uin_availability::{DEFAULT_DEBOUNCE, DebouncedUinChecker, UinAvailability};
pub use self::user::{DisplayName, Email, Role, UserId, UserProfile, UserValidationError};

/// Convenient API result alias.
///
/// # Examples
/// ```
/// use actix_web::HttpResponse;
/// use inspectorate::domain::{ApiResult, Error};
///
/// fn handler() -> ApiResult<HttpResponse> {
///     Err(Error::unauthorized("admin session required"))
/// }
/// ```
pub type ApiResult<T> = Result<T, Error>;
