//! Tests for the account service.

use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};

use rstest::{fixture, rstest};

use super::*;
use crate::domain::ErrorCode;
use crate::domain::ports::{MockClaimsGateway, MockIdentityProvider, MockUserRepository};

const ADMIN_EMAIL: &str = "chief@rei.gov.in";
const STAFF_EMAIL: &str = "clerk@rei.gov.in";

fn uid(raw: &str) -> UserId {
    UserId::new(raw).expect("uid")
}

fn identity_for(email: &str, id: &str) -> Identity {
    Identity {
        uid: uid(id),
        email: Email::new(email).expect("email"),
        display_name: None,
        photo_url: Some("https://example.org/a.png".to_owned()),
    }
}

fn profile(id: &str, email: &str, role: Role) -> UserProfile {
    UserProfile::new(
        uid(id),
        DisplayName::new("Someone").expect("name"),
        Email::new(email).expect("email"),
        role,
    )
}

fn signing_in_as(email: &'static str, id: &'static str) -> MockIdentityProvider {
    let mut identity = MockIdentityProvider::new();
    identity
        .expect_sign_in()
        .returning(move |_| Ok(identity_for(email, id)));
    identity
}

fn credentials(email: &str) -> LoginCredentials {
    LoginCredentials::try_from_parts(email, "password").expect("credentials")
}

#[fixture]
fn admins() -> AdminAllowList {
    AdminAllowList::parse(ADMIN_EMAIL)
}

fn service(
    identity: MockIdentityProvider,
    users: MockUserRepository,
    claims: MockClaimsGateway,
    admins: AdminAllowList,
) -> AccountService {
    AccountService::new(Arc::new(identity), Arc::new(users), Arc::new(claims), admins)
}

#[rstest]
#[case(STAFF_EMAIL, Role::Staff)]
#[case(ADMIN_EMAIL, Role::Admin)]
#[tokio::test]
async fn first_login_creates_profile_with_allow_list_role(
    admins: AdminAllowList,
    #[case] email: &'static str,
    #[case] expected: Role,
) {
    let mut users = MockUserRepository::new();
    users.expect_find_by_id().returning(|_| Ok(None));
    users
        .expect_upsert()
        .withf(move |p| p.role() == expected && email.starts_with(p.display_name().as_ref()))
        .times(1)
        .returning(|_| Ok(()));
    let mut claims = MockClaimsGateway::new();
    claims
        .expect_set_role_claim()
        .withf(move |_, role| *role == expected)
        .times(1)
        .returning(|_, _| Ok(()));

    let outcome = service(signing_in_as(email, "u-1"), users, claims, admins)
        .login(&credentials(email))
        .await
        .expect("login succeeds");

    assert_eq!(outcome.profile.role(), expected);
    assert_eq!(outcome.profile.photo_url(), Some("https://example.org/a.png"));
    assert!(outcome.claim_synced);
}

#[rstest]
#[tokio::test]
async fn allow_listed_staff_profile_is_elevated(admins: AdminAllowList) {
    let mut users = MockUserRepository::new();
    users
        .expect_find_by_id()
        .returning(|_| Ok(Some(profile("u-1", ADMIN_EMAIL, Role::Staff))));
    users
        .expect_upsert()
        .withf(|p| p.role() == Role::Admin)
        .times(1)
        .returning(|_| Ok(()));
    let mut claims = MockClaimsGateway::new();
    claims
        .expect_set_role_claim()
        .withf(|_, role| *role == Role::Admin)
        .returning(|_, _| Ok(()));

    let outcome = service(signing_in_as(ADMIN_EMAIL, "u-1"), users, claims, admins)
        .login(&credentials(ADMIN_EMAIL))
        .await
        .expect("login succeeds");

    assert_eq!(outcome.profile.role(), Role::Admin);
}

#[rstest]
#[tokio::test]
async fn existing_profile_role_is_rederived_into_the_claim(admins: AdminAllowList) {
    let mut users = MockUserRepository::new();
    users
        .expect_find_by_id()
        .returning(|_| Ok(Some(profile("u-2", STAFF_EMAIL, Role::Admin))));
    users.expect_upsert().times(0);
    let mut claims = MockClaimsGateway::new();
    claims
        .expect_set_role_claim()
        .withf(|id, role| id.as_ref() == "u-2" && *role == Role::Admin)
        .times(1)
        .returning(|_, _| Ok(()));

    let outcome = service(signing_in_as(STAFF_EMAIL, "u-2"), users, claims, admins)
        .login(&credentials(STAFF_EMAIL))
        .await
        .expect("login succeeds");

    assert_eq!(outcome.profile.role(), Role::Admin);
}

#[rstest]
#[tokio::test]
async fn claim_failure_does_not_fail_login(admins: AdminAllowList) {
    let mut users = MockUserRepository::new();
    users
        .expect_find_by_id()
        .returning(|_| Ok(Some(profile("u-3", STAFF_EMAIL, Role::Staff))));
    let mut claims = MockClaimsGateway::new();
    claims
        .expect_set_role_claim()
        .returning(|_, _| Err(ClaimsError::connection("reset by peer")));

    let outcome = service(signing_in_as(STAFF_EMAIL, "u-3"), users, claims, admins)
        .login(&credentials(STAFF_EMAIL))
        .await
        .expect("login still succeeds");

    assert!(!outcome.claim_synced);
}

#[rstest]
#[tokio::test]
async fn rejected_credentials_are_unauthorized(admins: AdminAllowList) {
    let mut identity = MockIdentityProvider::new();
    identity
        .expect_sign_in()
        .returning(|_| Err(IdentityError::invalid_credentials("INVALID_PASSWORD")));
    let mut users = MockUserRepository::new();
    users.expect_find_by_id().times(0);

    let err = service(identity, users, MockClaimsGateway::new(), admins)
        .login(&credentials(STAFF_EMAIL))
        .await
        .expect_err("rejected");

    assert_eq!(err.code(), ErrorCode::Unauthorized);
    assert_eq!(err.message(), "invalid credentials");
}

#[rstest]
#[tokio::test]
async fn grant_admin_requires_an_existing_profile(admins: AdminAllowList) {
    let mut users = MockUserRepository::new();
    users.expect_find_by_id().returning(|_| Ok(None));
    let mut claims = MockClaimsGateway::new();
    claims.expect_set_role_claim().times(0);

    let err = service(MockIdentityProvider::new(), users, claims, admins)
        .grant_admin(&uid("ghost"))
        .await
        .expect_err("missing profile");

    assert_eq!(err.code(), ErrorCode::NotFound);
}

#[rstest]
#[tokio::test(start_paused = true)]
async fn grant_admin_retries_transient_claim_failures(admins: AdminAllowList) {
    let mut users = MockUserRepository::new();
    users
        .expect_find_by_id()
        .returning(|_| Ok(Some(profile("u-4", STAFF_EMAIL, Role::Staff))));
    users
        .expect_upsert()
        .withf(|p| p.role() == Role::Admin)
        .times(1)
        .returning(|_| Ok(()));
    let calls = Arc::new(AtomicU32::new(0));
    let counter = Arc::clone(&calls);
    let mut claims = MockClaimsGateway::new();
    claims.expect_set_role_claim().returning(move |_, _| {
        if counter.fetch_add(1, Ordering::SeqCst) < 2 {
            Err(ClaimsError::connection("flaky"))
        } else {
            Ok(())
        }
    });

    let promoted = service(MockIdentityProvider::new(), users, claims, admins)
        .grant_admin(&uid("u-4"))
        .await
        .expect("eventually granted");

    assert_eq!(promoted.role(), Role::Admin);
    assert_eq!(calls.load(Ordering::SeqCst), 3);
}

#[rstest]
#[tokio::test(start_paused = true)]
async fn grant_admin_reports_persistent_claim_failure(admins: AdminAllowList) {
    let mut users = MockUserRepository::new();
    users
        .expect_find_by_id()
        .returning(|_| Ok(Some(profile("u-5", STAFF_EMAIL, Role::Staff))));
    users.expect_upsert().times(1).returning(|_| Ok(()));
    let mut claims = MockClaimsGateway::new();
    claims
        .expect_set_role_claim()
        .times(CLAIM_ATTEMPTS as usize)
        .returning(|_, _| Err(ClaimsError::rejected("USER_DISABLED")));

    let err = service(MockIdentityProvider::new(), users, claims, admins)
        .grant_admin(&uid("u-5"))
        .await
        .expect_err("claim never lands");

    assert_eq!(err.code(), ErrorCode::ServiceError);
    assert!(err.message().contains("retry to repair"));
}

#[rstest]
#[tokio::test]
async fn grant_admin_does_not_retry_an_unconfigured_claims_service(admins: AdminAllowList) {
    let mut users = MockUserRepository::new();
    users
        .expect_find_by_id()
        .returning(|_| Ok(Some(profile("u-7", STAFF_EMAIL, Role::Staff))));
    users.expect_upsert().times(1).returning(|_| Ok(()));
    let mut claims = MockClaimsGateway::new();
    claims
        .expect_set_role_claim()
        .times(1)
        .returning(|_, _| Err(ClaimsError::unavailable("no elevated credentials")));

    let err = service(MockIdentityProvider::new(), users, claims, admins)
        .grant_admin(&uid("u-7"))
        .await
        .expect_err("claims service missing");

    assert_eq!(err.code(), ErrorCode::NotImplemented);
}

#[rstest]
fn allow_list_accepts_separate_entries() {
    let list = AdminAllowList::from_entries(["Chief@REI.gov.in", " clerk@rei.gov.in ", "nonsense"]);
    assert_eq!(list.len(), 2);
    assert!(list.contains(&Email::new(STAFF_EMAIL).expect("email")));
}

#[rstest]
#[tokio::test]
async fn grant_admin_rerun_only_repairs_the_claim(admins: AdminAllowList) {
    let mut users = MockUserRepository::new();
    users
        .expect_find_by_id()
        .returning(|_| Ok(Some(profile("u-6", STAFF_EMAIL, Role::Admin))));
    users.expect_upsert().times(0);
    let mut claims = MockClaimsGateway::new();
    claims
        .expect_set_role_claim()
        .times(1)
        .returning(|_, _| Ok(()));

    let promoted = service(MockIdentityProvider::new(), users, claims, admins)
        .grant_admin(&uid("u-6"))
        .await
        .expect("repaired");

    assert_eq!(promoted.role(), Role::Admin);
}

#[rstest]
fn allow_list_normalises_entries() {
    let list = AdminAllowList::parse(" Chief@REI.gov.in ,clerk@rei.gov.in,,nonsense");
    assert_eq!(list.len(), 2);
    assert!(list.contains(&Email::new(ADMIN_EMAIL).expect("email")));
}
