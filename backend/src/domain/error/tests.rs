//! Tests for the domain error payload.

use super::*;
use rstest::rstest;
use serde_json::json;

const TRACE_ID: &str = "00000000-0000-0000-0000-000000000000";

#[rstest]
#[case(Error::invalid_request("bad"), ErrorCode::InvalidRequest)]
#[case(Error::unauthorized("no"), ErrorCode::Unauthorized)]
#[case(Error::not_found("gone"), ErrorCode::NotFound)]
#[case(Error::method_not_allowed("GET only"), ErrorCode::MethodNotAllowed)]
#[case(Error::conflict("taken"), ErrorCode::Conflict)]
#[case(Error::service("store down"), ErrorCode::ServiceError)]
#[case(Error::not_implemented("no write path"), ErrorCode::NotImplemented)]
#[case(Error::internal("boom"), ErrorCode::InternalError)]
fn constructors_set_codes(#[case] error: Error, #[case] expected: ErrorCode) {
    assert_eq!(error.code(), expected);
}

#[rstest]
fn serialises_message_under_error_key() {
    let error = Error::invalid_request("values.uin is required")
        .with_details(json!({ "field": "values.uin" }));

    let value = serde_json::to_value(&error).expect("serialise error");
    assert_eq!(
        value,
        json!({
            "error": "values.uin is required",
            "code": "invalid_request",
            "details": { "field": "values.uin" },
        })
    );
}

#[rstest]
fn omits_absent_trace_and_details() {
    let value = serde_json::to_value(Error::not_found("missing")).expect("serialise error");
    let object = value.as_object().expect("object payload");
    assert!(!object.contains_key("traceId"));
    assert!(!object.contains_key("details"));
}

#[rstest]
#[tokio::test]
async fn captures_trace_id_in_scope() {
    let trace_id: TraceId = TRACE_ID.parse().expect("valid UUID");
    let error = TraceId::scope(trace_id, async { Error::service("store down") }).await;
    assert_eq!(error.trace_id(), Some(TRACE_ID));
}

#[rstest]
fn explicit_trace_id_overrides() {
    let error = Error::internal("boom").with_trace_id("abc");
    assert_eq!(error.trace_id(), Some("abc"));
}
