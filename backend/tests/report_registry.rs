//! End-to-end registry flows over the full application wiring: report
//! lifecycle across write modes and the role lifecycle of an inspector.

use std::sync::Arc;

use actix_web::body::MessageBody;
use actix_web::cookie::Cookie;
use actix_web::dev::ServiceResponse;
use actix_web::http::StatusCode;
use actix_web::test;
use inspectorate::domain::ports::{FIXTURE_PASSWORD, FixtureIdentityProvider};
use inspectorate::domain::{Role, WriteCapability};
use inspectorate::inbound::http::admin::ADMIN_SECRET_HEADER;
use inspectorate::outbound::local_store::{FALLBACK_FILE, JsonFileReportStore};
use inspectorate::test_support::backend::{ADMIN_SECRET, TestBackend};
use inspectorate::test_support::cap_fs::read_file_to_string;
use inspectorate::test_support::http::{session_cookie, test_app};
use rstest::{fixture, rstest};
use serde_json::{Value, json};
use tempfile::TempDir;

const UIN: &str = "REI-BNU-2025-0012";
const INSPECTOR: &str = "field.inspector@rei.gov.in";

#[fixture]
fn backend() -> TestBackend {
    TestBackend::new()
}

async fn json_body(res: ServiceResponse<impl MessageBody>) -> Value {
    let bytes = test::read_body(res).await;
    serde_json::from_slice(&bytes).expect("JSON body")
}

fn report(owner: &str, district: &str) -> Value {
    json!({
        "userUid": owner,
        "values": {
            "uin": UIN,
            "applicantName": "Zothansanga",
            "district": district,
            "category": "HT",
            "load": "120 kVA",
            "fee": "4500"
        }
    })
}

async fn login<S, B>(app: &S, email: &str) -> (Cookie<'static>, Value)
where
    S: actix_web::dev::Service<
            actix_http::Request,
            Response = ServiceResponse<B>,
            Error = actix_web::Error,
        >,
    B: MessageBody,
{
    let res = test::call_service(
        app,
        test::TestRequest::post()
            .uri("/api/v1/login")
            .set_json(json!({ "email": email, "password": FIXTURE_PASSWORD }))
            .to_request(),
    )
    .await;
    assert_eq!(res.status(), StatusCode::OK);
    let cookie = session_cookie(&res);
    let body = json_body(res).await;
    (cookie, body)
}

#[rstest]
#[actix_web::test]
async fn privileged_report_lifecycle(backend: TestBackend) {
    let app = test::init_service(test_app(backend.state(backend.privileged()))).await;
    let owner = FixtureIdentityProvider::uid_for(INSPECTOR).expect("uid");
    let owner = owner.to_string();

    let res = test::call_service(
        &app,
        test::TestRequest::post()
            .uri("/create-report")
            .set_json(report(&owner, "Lunglei"))
            .to_request(),
    )
    .await;
    assert_eq!(res.status(), StatusCode::OK);

    // A second submission updates the same document.
    let res = test::call_service(
        &app,
        test::TestRequest::post()
            .uri("/create-report")
            .set_json(report(&owner, "Champhai"))
            .to_request(),
    )
    .await;
    assert_eq!(res.status(), StatusCode::OK);

    let res = test::call_service(
        &app,
        test::TestRequest::get()
            .uri(&format!("/get-report?uin={UIN}"))
            .to_request(),
    )
    .await;
    let stored = json_body(res).await;
    assert_eq!(stored["district"], "Champhai");
    assert_eq!(stored["category"], "HT");
    assert_eq!(stored["fee"], 4500.0);
    assert_eq!(stored["ownerUid"], owner);

    let res = test::call_service(
        &app,
        test::TestRequest::get()
            .uri(&format!("/search-reports?uin={UIN}"))
            .to_request(),
    )
    .await;
    let found = json_body(res).await;
    assert_eq!(found["count"], 1);
    assert_eq!(found["results"][0]["id"], UIN);
    assert_eq!(found["results"][0]["data"]["load"], "120 kVA");

    let (cookie, _) = login(&app, INSPECTOR).await;
    let res = test::call_service(
        &app,
        test::TestRequest::delete()
            .uri(&format!("/api/v1/reports/{owner}/{UIN}"))
            .cookie(cookie)
            .to_request(),
    )
    .await;
    assert_eq!(res.status(), StatusCode::NO_CONTENT);

    let res = test::call_service(
        &app,
        test::TestRequest::get()
            .uri(&format!("/get-report?uin={UIN}"))
            .to_request(),
    )
    .await;
    assert_eq!(res.status(), StatusCode::NOT_FOUND);

    // Deleting releases the UIN for another owner.
    let res = test::call_service(
        &app,
        test::TestRequest::post()
            .uri("/create-report")
            .set_json(report("another-inspector", "Kolasib"))
            .to_request(),
    )
    .await;
    assert_eq!(res.status(), StatusCode::OK);
}

#[rstest]
#[actix_web::test]
async fn fallback_mode_persists_to_disk_but_not_to_lookups(backend: TestBackend) {
    let dir = TempDir::new().expect("tempdir");
    let store = JsonFileReportStore::open(dir.path(), backend.clock.clone()).expect("store");
    let capability = WriteCapability::LocalFallback(Arc::new(store));
    let app = test::init_service(test_app(backend.state(capability))).await;

    for district in ["Lunglei", "Champhai"] {
        let res = test::call_service(
            &app,
            test::TestRequest::post()
                .uri("/create-report")
                .set_json(report("inspector-7", district))
                .to_request(),
        )
        .await;
        assert_eq!(res.status(), StatusCode::OK);
    }

    let raw = read_file_to_string(&dir.path().join(FALLBACK_FILE)).expect("fallback file");
    let file: Value = serde_json::from_str(&raw).expect("fallback JSON");
    let stored = &file["users"]["inspector-7"]["testReports"][UIN];
    assert_eq!(stored["district"], "Champhai");
    assert_eq!(stored["ownerUid"], "inspector-7");

    let res = test::call_service(
        &app,
        test::TestRequest::get()
            .uri(&format!("/check-uin?uin={UIN}"))
            .to_request(),
    )
    .await;
    assert_eq!(json_body(res).await, json!({ "exists": false }));

    let res = test::call_service(
        &app,
        test::TestRequest::get()
            .uri(&format!("/get-report?uin={UIN}"))
            .to_request(),
    )
    .await;
    assert_eq!(res.status(), StatusCode::NOT_FOUND);

    let res = test::call_service(&app, test::TestRequest::get().uri("/health/ready").to_request()).await;
    assert_eq!(json_body(res).await["writeMode"], "local_fallback");
}

#[rstest]
#[actix_web::test]
async fn promoted_inspectors_keep_the_admin_role_across_logins(backend: TestBackend) {
    let app = test::init_service(test_app(backend.state(backend.privileged()))).await;
    let uid = FixtureIdentityProvider::uid_for(INSPECTOR).expect("uid");

    let (_, first) = login(&app, INSPECTOR).await;
    assert_eq!(first["user"]["role"], "Staff");

    let res = test::call_service(
        &app,
        test::TestRequest::post()
            .uri("/set-admin-claim")
            .insert_header((ADMIN_SECRET_HEADER, ADMIN_SECRET))
            .set_json(json!({ "uid": uid.to_string() }))
            .to_request(),
    )
    .await;
    assert_eq!(res.status(), StatusCode::OK);

    let (cookie, second) = login(&app, INSPECTOR).await;
    assert_eq!(second["user"]["role"], "Admin");
    assert_eq!(second["claimSynced"], true);
    assert_eq!(backend.claims.claim_for(&uid), Some(Role::Admin));

    let res = test::call_service(
        &app,
        test::TestRequest::get()
            .uri("/api/v1/me")
            .cookie(cookie)
            .to_request(),
    )
    .await;
    assert_eq!(json_body(res).await["role"], "Admin");
}

#[rstest]
#[actix_web::test]
async fn every_response_carries_a_trace_id(backend: TestBackend) {
    let app = test::init_service(test_app(backend.state(WriteCapability::Unavailable))).await;

    let res = test::call_service(
        &app,
        test::TestRequest::post()
            .uri("/create-report")
            .set_json(report("inspector-7", "Aizawl"))
            .to_request(),
    )
    .await;

    assert_eq!(res.status(), StatusCode::NOT_IMPLEMENTED);
    let header = res
        .headers()
        .get("trace-id")
        .and_then(|value| value.to_str().ok())
        .map(str::to_owned)
        .expect("trace id header");
    assert_eq!(json_body(res).await["traceId"], header);
}
