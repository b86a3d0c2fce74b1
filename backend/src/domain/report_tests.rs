//! Tests for report validation and storage mapping.

use rstest::rstest;
use serde_json::json;

use super::*;

fn values(value: Value) -> Map<String, Value> {
    match value {
        Value::Object(map) => map,
        other => panic!("expected object, got {other}"),
    }
}

#[rstest]
fn draft_collects_form_fields() {
    let draft = ReportDraft::from_values(&values(json!({
        "uin": "REI-BNU-2025-0012",
        "applicantName": "  Bhubaneswar Cold Storage ",
        "district": "Khordha",
        "category": "ht",
        "load": 250,
        "transformer": "315 kVA",
        "fee": 4500,
        "challanNo": "CH-991",
        "remarks": "",
        "ownerUid": "ignored",
        "inspectorNote": "kept"
    })))
    .expect("valid draft");

    assert_eq!(draft.uin().as_ref(), "REI-BNU-2025-0012");
    let fields = draft.fields();
    assert_eq!(fields.applicant_name.as_deref(), Some("Bhubaneswar Cold Storage"));
    assert_eq!(fields.category, Some(Category::HighTension));
    assert_eq!(fields.load.as_deref(), Some("250"));
    assert_eq!(fields.fee, Some(4500.0));
    assert_eq!(fields.remarks, None);
    assert_eq!(fields.owner_uid, None);
    assert_eq!(fields.extra.get("inspectorNote"), Some(&json!("kept")));
}

#[rstest]
#[case(json!({}), "values.uin", "missing_field")]
#[case(json!({ "uin": "   " }), "values.uin", "missing_field")]
#[case(json!({ "uin": null }), "values.uin", "missing_field")]
#[case(json!({ "uin": "a/b" }), "values.uin", "invalid_field")]
#[case(json!({ "uin": "REI-1", "fee": -1 }), "values.fee", "invalid_field")]
#[case(json!({ "uin": "REI-1", "fee": "ten" }), "values.fee", "invalid_field")]
#[case(json!({ "uin": "REI-1", "fee": [1] }), "values.fee", "invalid_field")]
#[case(json!({ "uin": "REI-1", "category": "MV" }), "values.category", "invalid_field")]
fn draft_rejects_invalid_values(
    #[case] raw: Value,
    #[case] field: &str,
    #[case] code: &str,
) {
    let err = ReportDraft::from_values(&values(raw)).expect_err("invalid draft");
    assert_eq!(err.field(), field);
    assert_eq!(err.code(), code);
}

#[rstest]
fn stamped_sets_owner_and_time() {
    let draft = ReportDraft::from_values(&values(json!({ "uin": "REI-1" }))).expect("draft");
    let owner = UserId::new("owner-1").expect("uid");
    let at = DateTime::parse_from_rfc3339("2025-03-01T10:00:00Z")
        .expect("timestamp")
        .with_timezone(&Utc);

    let stamped = draft.stamped(&owner, Some(at));
    assert_eq!(stamped.owner_uid.as_deref(), Some("owner-1"));
    assert_eq!(stamped.created_at, Some(at));
    assert_eq!(stamped.uin.as_deref(), Some("REI-1"));
}

#[rstest]
fn from_stored_keeps_drifted_values_verbatim() {
    let fields = ReportFields::from_stored(values(json!({
        "uin": "REI-7",
        "fee": "1,500",
        "category": "LT",
        "createdAt": "yesterday"
    })));

    assert_eq!(fields.uin.as_deref(), Some("REI-7"));
    assert_eq!(fields.category, Some(Category::LowTension));
    assert_eq!(fields.fee, None);
    assert_eq!(fields.created_at, None);
    let map = fields.to_map();
    assert_eq!(map.get("fee"), Some(&json!("1,500")));
    assert_eq!(map.get("createdAt"), Some(&json!("yesterday")));
}

#[rstest]
fn merge_prefers_incoming_and_keeps_absent() {
    let stored = ReportFields::from_stored(values(json!({
        "uin": "REI-1",
        "remarks": "first visit",
        "fee": 100
    })));
    let incoming = ReportFields::from_stored(values(json!({ "uin": "REI-1", "fee": 200 })));

    let merged = stored.merged_with(&incoming);
    assert_eq!(merged.fee, Some(200.0));
    assert_eq!(merged.remarks.as_deref(), Some("first visit"));
}

#[rstest]
fn path_round_trips_through_display() {
    let owner = UserId::new("u-42").expect("uid");
    let uin = Uin::new("REI-BNU-2025-0012").expect("uin");
    let path = ReportPath::for_uin(owner, &uin);

    let rendered = path.to_string();
    assert_eq!(rendered, "users/u-42/testReports/REI-BNU-2025-0012");
    assert_eq!(ReportPath::parse(&rendered).expect("parse"), path);
}

#[rstest]
#[case("")]
#[case("users/u1/testReports")]
#[case("users/u1/testReports/")]
#[case("users/u1/testReports/a/b")]
#[case("people/u1/testReports/a")]
fn path_rejects_malformed(#[case] raw: &str) {
    assert!(ReportPath::parse(raw).is_err());
}

#[rstest]
#[case("REI-1", true)]
#[case("a/b", false)]
#[case(".", false)]
#[case("..", false)]
#[case("__meta__", false)]
#[case("__", true)]
fn document_key_rules(#[case] key: &str, #[case] expected: bool) {
    assert_eq!(is_document_key(key), expected);
}
