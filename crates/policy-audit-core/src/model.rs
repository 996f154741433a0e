//! Record types returned by the CRM query API.
//!
//! Wire records mirror the API field names and are decoded once at the
//! boundary (see [`crate::decode`]). Domain records are what the audit engine
//! and the report renderer see.

use std::cmp::Ordering;
use std::fmt;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Result set shape shared by top-level queries and nested sub-selects.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResultSet<T> {
    /// Number of records matching the query (may exceed `records.len()`).
    #[serde(rename = "totalSize")]
    pub total_size: u64,

    /// Whether this page is the last one.
    #[serde(default = "default_done")]
    pub done: bool,

    /// Relative URL of the next page when `done` is false.
    #[serde(
        rename = "nextRecordsUrl",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub next_records_url: Option<String>,

    #[serde(default = "Vec::new")]
    pub records: Vec<T>,
}

fn default_done() -> bool {
    true
}

impl<T> ResultSet<T> {
    pub fn empty() -> Self {
        Self {
            total_size: 0,
            done: true,
            next_records_url: None,
            records: Vec::new(),
        }
    }

    pub fn from_records(records: Vec<T>) -> Self {
        Self {
            total_size: records.len() as u64,
            done: true,
            next_records_url: None,
            records,
        }
    }
}

/// Launch year of an implementation.
///
/// The API returns it as a string, a number or null. Numeric years order
/// numerically, anything else orders below them and a missing year lowest.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct LaunchYear(Option<String>);

impl LaunchYear {
    pub fn new(value: impl Into<String>) -> Self {
        let value = value.into();
        let trimmed = value.trim();
        if trimmed.is_empty() {
            Self(None)
        } else {
            Self(Some(trimmed.to_string()))
        }
    }

    pub fn unset() -> Self {
        Self(None)
    }

    pub fn as_number(&self) -> Option<i64> {
        self.0.as_deref().and_then(|s| s.parse().ok())
    }

    fn rank(&self) -> u8 {
        match (&self.0, self.as_number()) {
            (None, _) => 0,
            (Some(_), None) => 1,
            (Some(_), Some(_)) => 2,
        }
    }
}

impl From<i64> for LaunchYear {
    fn from(year: i64) -> Self {
        Self(Some(year.to_string()))
    }
}

impl From<i32> for LaunchYear {
    fn from(year: i32) -> Self {
        Self(Some(year.to_string()))
    }
}

impl From<&str> for LaunchYear {
    fn from(year: &str) -> Self {
        Self::new(year)
    }
}

impl Ord for LaunchYear {
    fn cmp(&self, other: &Self) -> Ordering {
        self.rank().cmp(&other.rank()).then_with(|| {
            match (self.as_number(), other.as_number()) {
                (Some(a), Some(b)) => a.cmp(&b).then_with(|| self.0.cmp(&other.0)),
                _ => self.0.cmp(&other.0),
            }
        })
    }
}

impl PartialOrd for LaunchYear {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for LaunchYear {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.0 {
            Some(year) => f.write_str(year),
            None => f.write_str("(none)"),
        }
    }
}

impl Serialize for LaunchYear {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match &self.0 {
            Some(year) => serializer.serialize_str(year),
            None => serializer.serialize_none(),
        }
    }
}

impl<'de> Deserialize<'de> for LaunchYear {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        use serde::de::Error;

        match serde_json::Value::deserialize(deserializer)? {
            serde_json::Value::Null => Ok(Self::unset()),
            serde_json::Value::String(s) => Ok(Self::new(s)),
            serde_json::Value::Number(n) => {
                if let Some(i) = n.as_i64() {
                    Ok(Self::from(i))
                } else if let Some(f) = n.as_f64().filter(|f| f.fract() == 0.0) {
                    Ok(Self::from(f as i64))
                } else {
                    Err(D::Error::custom(format!("invalid launch year: {}", n)))
                }
            }
            other => Err(D::Error::custom(format!("invalid launch year: {}", other))),
        }
    }
}

/// Removes non-breaking spaces and surrounding whitespace.
pub fn clean_string(s: &str) -> String {
    s.replace('\u{00a0}', " ").trim().to_string()
}

/// One unit of audit: a policy number paired with its partner.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PolicyRecord {
    #[serde(rename = "policyNumber")]
    pub policy_number: String,

    #[serde(rename = "partnerName")]
    pub partner_name: String,
}

impl PolicyRecord {
    pub fn new(policy_number: impl Into<String>, partner_name: impl Into<String>) -> Self {
        Self {
            policy_number: clean_string(&policy_number.into()),
            partner_name: partner_name.into(),
        }
    }
}

/// Row of the policy listing query.
#[derive(Debug, Clone, Deserialize)]
pub struct ListingRecord {
    #[serde(rename = "Id", default)]
    pub id: Option<String>,

    #[serde(rename = "Rally_Launch_Year__c", default)]
    pub launch_year: LaunchYear,

    #[serde(rename = "Primary_Policy_Number__c")]
    pub policy_number: String,

    #[serde(rename = "Partner_Name__c")]
    pub partner_name: String,
}

impl From<ListingRecord> for PolicyRecord {
    fn from(row: ListingRecord) -> Self {
        PolicyRecord::new(row.policy_number, row.partner_name)
    }
}

/// Client affiliation attached to an implementation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AffiliationRecord {
    #[serde(rename = "Id", default)]
    pub id: Option<String>,

    #[serde(rename = "Segmentation_IDs__c", default)]
    pub segmentation_id: Option<String>,
}

impl AffiliationRecord {
    pub fn new(id: Option<&str>, segmentation_id: Option<&str>) -> Self {
        Self {
            id: id.map(String::from),
            segmentation_id: segmentation_id.map(String::from),
        }
    }

    /// Affiliation id if present and non-empty.
    pub fn usable_id(&self) -> Option<&str> {
        self.id.as_deref().filter(|s| !s.is_empty())
    }

    pub fn usable_segmentation_id(&self) -> Option<&str> {
        self.segmentation_id.as_deref().filter(|s| !s.is_empty())
    }
}

/// Implementation row as returned by the implementation query.
#[derive(Debug, Clone, Deserialize)]
pub struct ImplementationWire {
    #[serde(rename = "Id")]
    pub id: String,

    #[serde(rename = "Rally_Launch_Year__c", default)]
    pub launch_year: LaunchYear,

    #[serde(rename = "Client_Affiliations__r", default)]
    pub affiliations: Option<ResultSet<AffiliationRecord>>,
}

/// Implementation of a policy for one launch year.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImplementationRecord {
    pub id: String,
    pub launch_year: LaunchYear,
    pub affiliations: Vec<AffiliationRecord>,
}

impl ImplementationRecord {
    pub fn new(
        id: impl Into<String>,
        launch_year: impl Into<LaunchYear>,
        affiliations: Vec<AffiliationRecord>,
    ) -> Self {
        Self {
            id: id.into(),
            launch_year: launch_year.into(),
            affiliations,
        }
    }
}

impl From<ImplementationWire> for ImplementationRecord {
    fn from(wire: ImplementationWire) -> Self {
        let affiliations = match wire.affiliations {
            Some(set) if set.total_size > 0 => {
                if !set.done || set.total_size > set.records.len() as u64 {
                    tracing::warn!(
                        implementation = %wire.id,
                        total = set.total_size,
                        returned = set.records.len(),
                        "affiliation sub-select truncated to its first page"
                    );
                }
                set.records
            }
            _ => Vec::new(),
        };
        Self {
            id: wire.id,
            launch_year: wire.launch_year,
            affiliations,
        }
    }
}

/// Affiliation mapping holding the concatenated code blob.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MappingRecord {
    #[serde(rename = "Identifier_Values__c")]
    pub identifier_values: String,
}

impl MappingRecord {
    pub fn new(identifier_values: impl Into<String>) -> Self {
        Self {
            identifier_values: identifier_values.into(),
        }
    }
}
