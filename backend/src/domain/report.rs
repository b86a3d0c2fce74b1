//! Test report model.
//!
//! A report lives at `users/{owner}/testReports/{reportId}`. Reports created
//! through the writer use the UIN as `reportId`; older records may use a
//! different key, which is why the locator also matches on the `uin` field.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use utoipa::ToSchema;

use super::{UserId, UserValidationError};

/// Name of the per-owner report sub-collection.
pub const REPORTS_COLLECTION: &str = "testReports";

/// Name of the owner collection.
pub const USERS_COLLECTION: &str = "users";

/// Validation failures for report input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReportValidationError {
    /// A required field was absent or blank.
    MissingField { field: &'static str },
    /// A field was present but unusable.
    InvalidField {
        field: &'static str,
        reason: &'static str,
    },
}

impl ReportValidationError {
    /// Dotted name of the offending field.
    pub fn field(&self) -> &'static str {
        match self {
            Self::MissingField { field } | Self::InvalidField { field, .. } => field,
        }
    }

    /// Stable machine code for the failure.
    pub fn code(&self) -> &'static str {
        match self {
            Self::MissingField { .. } => "missing_field",
            Self::InvalidField { .. } => "invalid_field",
        }
    }
}

impl fmt::Display for ReportValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MissingField { field } => write!(f, "{field} is required"),
            Self::InvalidField { field, reason } => write!(f, "{field} {reason}"),
        }
    }
}

impl std::error::Error for ReportValidationError {}

/// Unique Identification Number, validated for use as a document key.
///
/// ## Invariants
/// - trimmed and non-empty
/// - contains no `/`, is not `.` or `..`, and is not wrapped in `__`
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Uin(String);

impl Uin {
    /// Validate a raw identifier.
    ///
    /// # Examples
    /// ```
    /// use inspectorate::domain::Uin;
    ///
    /// let uin = Uin::new(" REI-BNU-2025-0012 ").expect("valid UIN");
    /// assert_eq!(uin.as_ref(), "REI-BNU-2025-0012");
    /// assert!(Uin::new("a/b").is_err());
    /// ```
    pub fn new(raw: impl AsRef<str>) -> Result<Self, ReportValidationError> {
        let trimmed = raw.as_ref().trim();
        if trimmed.is_empty() {
            return Err(ReportValidationError::MissingField { field: "values.uin" });
        }
        if !is_document_key(trimmed) {
            return Err(ReportValidationError::InvalidField {
                field: "values.uin",
                reason: "must not contain '/' or be a reserved key",
            });
        }
        Ok(Self(trimmed.to_owned()))
    }
}

/// Whether `key` can name a document directly under a collection.
pub fn is_document_key(key: &str) -> bool {
    !key.is_empty()
        && !key.contains('/')
        && key != "."
        && key != ".."
        && !(key.len() > 4 && key.starts_with("__") && key.ends_with("__"))
}

impl AsRef<str> for Uin {
    fn as_ref(&self) -> &str {
        self.0.as_str()
    }
}

impl fmt::Display for Uin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<Uin> for String {
    fn from(value: Uin) -> Self {
        value.0
    }
}

impl TryFrom<String> for Uin {
    type Error = ReportValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

/// Supply category of the installation under test.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
pub enum Category {
    /// Low tension.
    #[serde(rename = "LT")]
    LowTension,
    /// High tension.
    #[serde(rename = "HT")]
    HighTension,
    /// Extra-high tension.
    #[serde(rename = "EHT")]
    ExtraHighTension,
}

impl std::str::FromStr for Category {
    type Err = ReportValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "LT" => Ok(Self::LowTension),
            "HT" => Ok(Self::HighTension),
            "EHT" => Ok(Self::ExtraHighTension),
            _ => Err(ReportValidationError::InvalidField {
                field: "values.category",
                reason: "must be one of LT, HT, EHT",
            }),
        }
    }
}

/// Stored report fields.
///
/// Every field is optional so that documents written under older schemas
/// still decode; unknown fields are kept in `extra` and written back as-is.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ReportFields {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub uin: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub applicant_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub district: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<Category>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub load: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub transformer: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fee: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub challan_no: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub challan_date: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub contractor_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub remarks: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub owner_uid: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl ReportFields {
    /// Serialise into a flat JSON object.
    pub fn to_map(&self) -> Map<String, Value> {
        match serde_json::to_value(self) {
            Ok(Value::Object(map)) => map,
            _ => Map::new(),
        }
    }

    /// Decode from a flat JSON object.
    pub fn from_map(map: Map<String, Value>) -> Result<Self, serde_json::Error> {
        serde_json::from_value(Value::Object(map))
    }

    /// Decode a stored document without failing on schema drift.
    ///
    /// Known keys whose stored value has an unexpected type are kept verbatim
    /// in `extra`, so they are still returned and written back unchanged.
    pub fn from_stored(map: Map<String, Value>) -> Self {
        let mut typed = Map::new();
        let mut drifted = Map::new();
        for (key, value) in map {
            let probe = Map::from_iter([(key.clone(), value.clone())]);
            if Self::from_map(probe).is_ok() {
                typed.insert(key, value);
            } else {
                drifted.insert(key, value);
            }
        }
        let mut fields = Self::from_map(typed).unwrap_or_default();
        fields.extra.extend(drifted);
        fields
    }

    /// Merge `incoming` over `self`: present incoming fields win, absent ones
    /// keep their stored value.
    #[must_use]
    pub fn merged_with(&self, incoming: &Self) -> Self {
        let mut merged = self.to_map();
        merged.extend(incoming.to_map());
        Self::from_stored(merged)
    }
}

/// Validated `create-report` payload.
#[derive(Debug, Clone, PartialEq)]
pub struct ReportDraft {
    uin: Uin,
    fields: ReportFields,
}

impl ReportDraft {
    /// Validate the raw `values` object submitted by the report form.
    ///
    /// `ownerUid` and `createdAt` are ignored: the writer stamps both.
    ///
    /// # Examples
    /// ```
    /// use inspectorate::domain::ReportDraft;
    /// use serde_json::json;
    ///
    /// let values = json!({ "uin": "REI-1", "fee": "1500", "category": "lt" });
    /// let draft = ReportDraft::from_values(values.as_object().unwrap()).unwrap();
    /// assert_eq!(draft.uin().as_ref(), "REI-1");
    /// assert_eq!(draft.fields().fee, Some(1500.0));
    /// ```
    pub fn from_values(values: &Map<String, Value>) -> Result<Self, ReportValidationError> {
        let uin = match values.get("uin") {
            Some(Value::String(raw)) => Uin::new(raw)?,
            Some(Value::Number(number)) => Uin::new(number.to_string())?,
            _ => return Err(ReportValidationError::MissingField { field: "values.uin" }),
        };

        let mut extra = values.clone();
        for key in KNOWN_KEYS {
            extra.remove(*key);
        }

        let fields = ReportFields {
            uin: Some(uin.to_string()),
            applicant_name: text(values, "applicantName"),
            address: text(values, "address"),
            district: text(values, "district"),
            category: text(values, "category")
                .map(|raw| raw.parse::<Category>())
                .transpose()?,
            load: text(values, "load"),
            transformer: text(values, "transformer"),
            fee: fee(values)?,
            challan_no: text(values, "challanNo"),
            challan_date: text(values, "challanDate"),
            contractor_name: text(values, "contractorName"),
            remarks: text(values, "remarks"),
            created_at: None,
            owner_uid: None,
            extra,
        };
        Ok(Self { uin, fields })
    }

    pub fn uin(&self) -> &Uin {
        &self.uin
    }

    pub fn fields(&self) -> &ReportFields {
        &self.fields
    }

    /// Fields as they will be stored for `owner` at `created_at`.
    pub fn stamped(&self, owner: &UserId, created_at: Option<DateTime<Utc>>) -> ReportFields {
        ReportFields {
            owner_uid: Some(owner.to_string()),
            created_at,
            ..self.fields.clone()
        }
    }
}

const KNOWN_KEYS: &[&str] = &[
    "uin",
    "applicantName",
    "address",
    "district",
    "category",
    "load",
    "transformer",
    "fee",
    "challanNo",
    "challanDate",
    "contractorName",
    "remarks",
    "createdAt",
    "ownerUid",
];

fn text(values: &Map<String, Value>, key: &str) -> Option<String> {
    match values.get(key) {
        Some(Value::String(raw)) if !raw.trim().is_empty() => Some(raw.trim().to_owned()),
        Some(Value::Number(number)) => Some(number.to_string()),
        Some(Value::Bool(flag)) => Some(flag.to_string()),
        _ => None,
    }
}

fn fee(values: &Map<String, Value>) -> Result<Option<f64>, ReportValidationError> {
    const INVALID: ReportValidationError = ReportValidationError::InvalidField {
        field: "values.fee",
        reason: "must be a non-negative number",
    };
    let amount = match values.get("fee") {
        None | Some(Value::Null) => return Ok(None),
        Some(Value::String(raw)) if raw.trim().is_empty() => return Ok(None),
        Some(Value::String(raw)) => raw.trim().parse::<f64>().map_err(|_| INVALID)?,
        Some(Value::Number(number)) => number.as_f64().ok_or(INVALID)?,
        Some(_) => return Err(INVALID),
    };
    if amount.is_finite() && amount >= 0.0 {
        Ok(Some(amount))
    } else {
        Err(INVALID)
    }
}

/// Deterministic storage location of a report.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ReportPath {
    owner: UserId,
    report_id: String,
}

impl ReportPath {
    /// Location of `report_id` under `owner`.
    pub fn new(owner: UserId, report_id: impl Into<String>) -> Self {
        Self {
            owner,
            report_id: report_id.into(),
        }
    }

    /// Canonical location of a writer-created report.
    pub fn for_uin(owner: UserId, uin: &Uin) -> Self {
        Self::new(owner, uin.as_ref())
    }

    /// Parse `users/{owner}/testReports/{id}`.
    ///
    /// # Examples
    /// ```
    /// use inspectorate::domain::ReportPath;
    ///
    /// let path = ReportPath::parse("users/u1/testReports/REI-1").expect("path");
    /// assert_eq!(path.owner().as_ref(), "u1");
    /// assert_eq!(path.report_id(), "REI-1");
    /// assert!(ReportPath::parse("users/u1/notes/REI-1").is_err());
    /// ```
    pub fn parse(raw: &str) -> Result<Self, UserValidationError> {
        let mut segments = raw.split('/');
        match (
            segments.next(),
            segments.next(),
            segments.next(),
            segments.next(),
            segments.next(),
        ) {
            (Some(USERS_COLLECTION), Some(owner), Some(REPORTS_COLLECTION), Some(id), None)
                if !id.is_empty() =>
            {
                Ok(Self::new(UserId::new(owner)?, id))
            }
            _ => Err(UserValidationError::InvalidId),
        }
    }

    pub fn owner(&self) -> &UserId {
        &self.owner
    }

    pub fn report_id(&self) -> &str {
        self.report_id.as_str()
    }
}

impl fmt::Display for ReportPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{USERS_COLLECTION}/{}/{REPORTS_COLLECTION}/{}",
            self.owner, self.report_id
        )
    }
}

/// A stored report together with its location.
#[derive(Debug, Clone, PartialEq)]
pub struct ReportDocument {
    pub path: ReportPath,
    pub fields: ReportFields,
}

impl ReportDocument {
    pub fn new(path: ReportPath, fields: ReportFields) -> Self {
        Self { path, fields }
    }

    /// Document key within the owner's sub-collection.
    pub fn id(&self) -> &str {
        self.path.report_id()
    }
}

#[cfg(test)]
#[path = "report_tests.rs"]
mod tests;
