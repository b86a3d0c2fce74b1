//! Tests for the report writer.

use std::sync::Arc;

use rstest::rstest;
use serde_json::json;

use super::*;
use crate::domain::ports::{MockFallbackReportStore, MockReportRepository, ReportRepositoryError};
use crate::domain::{ErrorCode, ReportDocument};

fn untouched(mode: WriteMode) -> WriteCapability {
    match mode {
        WriteMode::Privileged => {
            let mut repo = MockReportRepository::new();
            repo.expect_upsert_indexed().times(0);
            WriteCapability::Privileged(Arc::new(repo))
        }
        WriteMode::LocalFallback => {
            let mut store = MockFallbackReportStore::new();
            store.expect_upsert().times(0);
            WriteCapability::LocalFallback(Arc::new(store))
        }
        WriteMode::Unavailable => WriteCapability::Unavailable,
    }
}

fn values(value: serde_json::Value) -> Map<String, Value> {
    value.as_object().cloned().expect("object literal")
}

#[rstest]
#[tokio::test]
async fn rejects_missing_uin_in_every_mode(
    #[values(WriteMode::Privileged, WriteMode::LocalFallback, WriteMode::Unavailable)]
    mode: WriteMode,
) {
    let writer = ReportWriter::new(untouched(mode));
    let body = values(json!({ "applicantName": "Lalremruata" }));

    let err = writer
        .create(Some("owner-1"), Some(&body))
        .await
        .expect_err("missing uin");

    assert_eq!(err.code(), ErrorCode::InvalidRequest);
    assert_eq!(
        err.details().and_then(|d| d.get("field")),
        Some(&json!("values.uin"))
    );
}

#[rstest]
#[case(None, Some(json!({ "uin": "REI-1" })), "userUid")]
#[case(Some("  "), Some(json!({ "uin": "REI-1" })), "userUid")]
#[case(Some("owner-1"), None, "values")]
#[case(Some("a/b"), Some(json!({ "uin": "REI-1" })), "userUid")]
#[case(Some("owner-1"), Some(json!({ "uin": "REI-1", "fee": -5 })), "values.fee")]
#[tokio::test]
async fn reports_the_offending_field(
    #[case] owner: Option<&str>,
    #[case] body: Option<serde_json::Value>,
    #[case] field: &str,
) {
    let writer = ReportWriter::new(untouched(WriteMode::Unavailable));
    let body = body.map(values);

    let err = writer
        .create(owner, body.as_ref())
        .await
        .expect_err("invalid request");

    assert_eq!(err.code(), ErrorCode::InvalidRequest);
    assert_eq!(
        err.details().and_then(|d| d.get("field")),
        Some(&json!(field))
    );
}

#[rstest]
#[tokio::test]
async fn unavailable_mode_answers_not_implemented() {
    let writer = ReportWriter::new(WriteCapability::Unavailable);
    let body = values(json!({ "uin": "REI-1" }));

    let err = writer
        .create(Some("owner-1"), Some(&body))
        .await
        .expect_err("no write path");

    assert_eq!(err.code(), ErrorCode::NotImplemented);
}

#[rstest]
#[tokio::test]
async fn privileged_write_stamps_owner_and_uses_uin_as_key() {
    let mut repo = MockReportRepository::new();
    repo.expect_upsert_indexed()
        .withf(|owner, uin, fields| {
            owner.as_ref() == "owner-1"
                && uin.as_ref() == "REI-BNU-2025-0012"
                && fields.owner_uid.as_deref() == Some("owner-1")
                && fields.created_at.is_none()
                && fields.fee == Some(1500.0)
        })
        .times(1)
        .returning(|owner, uin, fields| {
            Ok(ReportDocument::new(
                ReportPath::for_uin(owner.clone(), uin),
                fields.clone(),
            ))
        });
    let writer = ReportWriter::new(WriteCapability::Privileged(Arc::new(repo)));
    let body = values(json!({ "uin": " REI-BNU-2025-0012 ", "fee": "1500" }));

    let receipt = writer
        .create(Some("owner-1"), Some(&body))
        .await
        .expect("written");

    assert_eq!(receipt.mode, WriteMode::Privileged);
    assert_eq!(
        receipt.path.to_string(),
        "users/owner-1/testReports/REI-BNU-2025-0012"
    );
    assert_eq!(receipt.message(), "Report saved");
}

#[rstest]
#[tokio::test]
async fn uin_owned_by_another_user_is_a_conflict() {
    let mut repo = MockReportRepository::new();
    repo.expect_upsert_indexed()
        .returning(|_, _, _| Err(ReportRepositoryError::conflict("REI-1 belongs to owner-2")));
    let writer = ReportWriter::new(WriteCapability::Privileged(Arc::new(repo)));
    let body = values(json!({ "uin": "REI-1" }));

    let err = writer
        .create(Some("owner-1"), Some(&body))
        .await
        .expect_err("conflict");

    assert_eq!(err.code(), ErrorCode::Conflict);
}

#[rstest]
#[tokio::test]
async fn fallback_write_goes_to_the_local_store() {
    let mut store = MockFallbackReportStore::new();
    store
        .expect_upsert()
        .withf(|owner, uin, _| owner.as_ref() == "owner-1" && uin.as_ref() == "REI-1")
        .times(1)
        .returning(|_, _, _| Ok(()));
    let writer = ReportWriter::new(WriteCapability::LocalFallback(Arc::new(store)));
    let body = values(json!({ "uin": "REI-1" }));

    let receipt = writer
        .create(Some("owner-1"), Some(&body))
        .await
        .expect("written");

    assert_eq!(receipt.mode, WriteMode::LocalFallback);
    assert_eq!(receipt.message(), "Report saved to local fallback store");
}

#[rstest]
#[tokio::test]
async fn fallback_io_failure_is_a_service_error() {
    let mut store = MockFallbackReportStore::new();
    store
        .expect_upsert()
        .returning(|_, _, _| Err(FallbackStoreError::io("disk full")));
    let writer = ReportWriter::new(WriteCapability::LocalFallback(Arc::new(store)));
    let body = values(json!({ "uin": "REI-1" }));

    let err = writer
        .create(Some("owner-1"), Some(&body))
        .await
        .expect_err("io failure");

    assert_eq!(err.code(), ErrorCode::ServiceError);
}

#[rstest]
#[case(true, None)]
#[case(false, Some(ErrorCode::NotFound))]
#[tokio::test]
async fn delete_reports_missing_documents(
    #[case] existed: bool,
    #[case] expected: Option<ErrorCode>,
) {
    let mut repo = MockReportRepository::new();
    repo.expect_delete().times(1).returning(move |_| Ok(existed));
    let writer = ReportWriter::new(WriteCapability::Privileged(Arc::new(repo)));
    let path = ReportPath::parse("users/owner-1/testReports/REI-1").expect("path");

    let outcome = writer.delete(&path).await;

    assert_eq!(outcome.err().map(|err| err.code()), expected);
}

#[rstest]
#[tokio::test]
async fn delete_needs_the_privileged_store() {
    let writer = ReportWriter::new(untouched(WriteMode::LocalFallback));
    let path = ReportPath::parse("users/owner-1/testReports/REI-1").expect("path");

    let err = writer.delete(&path).await.expect_err("unsupported");
    assert_eq!(err.code(), ErrorCode::NotImplemented);
}
