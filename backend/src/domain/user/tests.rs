//! Tests for user primitives.

use super::*;
use rstest::rstest;
use serde_json::json;

#[rstest]
#[case("", UserValidationError::EmptyId)]
#[case("a/b", UserValidationError::InvalidId)]
#[case("has space", UserValidationError::InvalidId)]
fn user_id_rejects_invalid(#[case] raw: &str, #[case] expected: UserValidationError) {
    assert_eq!(UserId::new(raw).expect_err("invalid id"), expected);
}

#[rstest]
fn user_id_rejects_overlong() {
    let raw = "x".repeat(USER_ID_MAX + 1);
    assert_eq!(
        UserId::new(raw).expect_err("too long"),
        UserValidationError::IdTooLong { max: USER_ID_MAX }
    );
}

#[rstest]
#[case(" Staff@Example.ORG ", "staff@example.org", "staff")]
#[case("a@b", "a@b", "a")]
fn email_normalises(#[case] raw: &str, #[case] expected: &str, #[case] local: &str) {
    let email = Email::new(raw).expect("valid email");
    assert_eq!(email.as_ref(), expected);
    assert_eq!(email.local_part(), local);
}

#[rstest]
#[case("@example.org")]
#[case("staff@")]
#[case("plain")]
fn email_rejects_invalid(#[case] raw: &str) {
    assert_eq!(
        Email::new(raw).expect_err("invalid"),
        UserValidationError::InvalidEmail
    );
}

#[rstest]
fn role_parses_stored_strings() {
    assert_eq!("Admin".parse::<Role>(), Ok(Role::Admin));
    assert_eq!("Staff".parse::<Role>(), Ok(Role::Staff));
    assert!("admin".parse::<Role>().is_err());
}

#[rstest]
fn profile_serialises_camel_case() {
    let profile = UserProfile::new(
        UserId::new("uid-1").expect("uid"),
        DisplayName::new("Sushree Das").expect("name"),
        Email::new("sushree@example.org").expect("email"),
        Role::Staff,
    )
    .with_photo_url(Some("https://example.org/a.png".to_owned()));

    let value = serde_json::to_value(&profile).expect("serialise");
    assert_eq!(
        value,
        json!({
            "uid": "uid-1",
            "displayName": "Sushree Das",
            "email": "sushree@example.org",
            "role": "Staff",
            "photoUrl": "https://example.org/a.png",
        })
    );
    let back: UserProfile = serde_json::from_value(value).expect("deserialise");
    assert_eq!(back, profile);
}
