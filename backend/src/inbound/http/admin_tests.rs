//! Handler tests for admin promotion.

use actix_web::body::MessageBody;
use actix_web::cookie::Cookie;
use actix_web::dev::ServiceResponse;
use actix_web::http::StatusCode;
use actix_web::test;
use rstest::rstest;
use serde_json::{Value, json};

use super::ADMIN_SECRET_HEADER;
use crate::domain::ports::{FIXTURE_PASSWORD, FixtureIdentityProvider};
use crate::domain::{Role, UserId};
use crate::test_support::backend::{ADMIN_EMAIL, ADMIN_SECRET, TestBackend};
use crate::test_support::http::{session_cookie, test_app};

const STAFF_EMAIL: &str = "lineman@rei.gov.in";

fn staff_uid() -> UserId {
    FixtureIdentityProvider::uid_for(STAFF_EMAIL).expect("uid")
}

async fn read_json(res: ServiceResponse<impl MessageBody>) -> Value {
    let bytes = test::read_body(res).await;
    serde_json::from_slice(&bytes).expect("JSON body")
}

async fn login<S, B>(app: &S, email: &str) -> Cookie<'static>
where
    S: actix_web::dev::Service<
            actix_http::Request,
            Response = ServiceResponse<B>,
            Error = actix_web::Error,
        >,
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
    session_cookie(&res)
}

#[actix_web::test]
async fn shared_secret_promotes_an_existing_user() {
    let backend = TestBackend::new();
    let app = test::init_service(test_app(backend.state(backend.privileged()))).await;
    login(&app, STAFF_EMAIL).await;
    let uid = staff_uid();
    assert_eq!(backend.claims.claim_for(&uid), Some(Role::Staff));

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
    assert_eq!(
        read_json(res).await,
        json!({ "message": format!("User {uid} is now an admin") })
    );
    assert_eq!(backend.claims.claim_for(&uid), Some(Role::Admin));
}

#[rstest]
#[case(None)]
#[case(Some("not-the-secret"))]
#[actix_web::test]
async fn wrong_or_missing_secret_is_unauthorised(#[case] secret: Option<&str>) {
    let backend = TestBackend::new();
    let app = test::init_service(test_app(backend.state(backend.privileged()))).await;
    login(&app, STAFF_EMAIL).await;

    let mut request = test::TestRequest::post()
        .uri("/set-admin-claim")
        .set_json(json!({ "uid": staff_uid().to_string() }));
    if let Some(secret) = secret {
        request = request.insert_header((ADMIN_SECRET_HEADER, secret));
    }
    let res = test::call_service(&app, request.to_request()).await;

    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(read_json(res).await["code"], "unauthorized");
    assert_eq!(backend.claims.claim_for(&staff_uid()), Some(Role::Staff));
}

#[actix_web::test]
async fn unconfigured_secret_rejects_every_caller() {
    let backend = TestBackend::new();
    let state = backend.state(backend.privileged()).with_admin_secret(None);
    let app = test::init_service(test_app(state)).await;

    let res = test::call_service(
        &app,
        test::TestRequest::post()
            .uri("/set-admin-claim")
            .insert_header((ADMIN_SECRET_HEADER, ADMIN_SECRET))
            .set_json(json!({ "uid": "anyone" }))
            .to_request(),
    )
    .await;

    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
}

#[rstest]
#[case(json!({}))]
#[case(json!({ "uid": "   " }))]
#[case(json!({ "uid": "a/b" }))]
#[actix_web::test]
async fn target_uid_is_validated(#[case] body: Value) {
    let backend = TestBackend::new();
    let app = test::init_service(test_app(backend.state(backend.privileged()))).await;

    let res = test::call_service(
        &app,
        test::TestRequest::post()
            .uri("/set-admin-claim")
            .insert_header((ADMIN_SECRET_HEADER, ADMIN_SECRET))
            .set_json(body)
            .to_request(),
    )
    .await;

    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    assert_eq!(read_json(res).await["details"]["field"], "uid");
}

#[actix_web::test]
async fn promoting_an_unknown_user_is_not_found() {
    let backend = TestBackend::new();
    let app = test::init_service(test_app(backend.state(backend.privileged()))).await;

    let res = test::call_service(
        &app,
        test::TestRequest::post()
            .uri("/set-admin-claim")
            .insert_header((ADMIN_SECRET_HEADER, ADMIN_SECRET))
            .set_json(json!({ "uid": "ghost" }))
            .to_request(),
    )
    .await;

    assert_eq!(res.status(), StatusCode::NOT_FOUND);
    assert!(backend.claims.claim_for(&UserId::new("ghost").expect("uid")).is_none());
}

#[actix_web::test]
async fn admin_sessions_promote_without_the_secret() {
    let backend = TestBackend::new();
    let app = test::init_service(test_app(backend.state(backend.privileged()))).await;
    login(&app, STAFF_EMAIL).await;
    let admin = login(&app, ADMIN_EMAIL).await;

    let res = test::call_service(
        &app,
        test::TestRequest::post()
            .uri("/set-admin-claim/session")
            .cookie(admin)
            .set_json(json!({ "uid": staff_uid().to_string() }))
            .to_request(),
    )
    .await;

    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(backend.claims.claim_for(&staff_uid()), Some(Role::Admin));
}

#[actix_web::test]
async fn staff_sessions_cannot_promote() {
    let backend = TestBackend::new();
    let app = test::init_service(test_app(backend.state(backend.privileged()))).await;
    let staff = login(&app, STAFF_EMAIL).await;

    let res = test::call_service(
        &app,
        test::TestRequest::post()
            .uri("/set-admin-claim/session")
            .cookie(staff)
            .set_json(json!({ "uid": staff_uid().to_string() }))
            .to_request(),
    )
    .await;

    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(backend.claims.claim_for(&staff_uid()), Some(Role::Staff));
}
