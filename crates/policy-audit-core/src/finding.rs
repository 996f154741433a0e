//! Audit findings.
//!
//! Anomalies are data, not errors: producing one never stops the audit of
//! sibling records.

use serde::Serialize;

use crate::model::{AffiliationRecord, LaunchYear, PolicyRecord};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Ok,
    Anomaly,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FindingKind {
    /// Exactly one mapping was found and its codes were counted.
    CodesExtracted { code_count: usize },

    /// A launch year has zero or several implementations.
    DuplicateYear { count: usize },

    NoAffiliations,

    MissingAffiliationId,

    MissingSegmentationId,

    /// Mapping lookup returned a count other than one.
    MappingCardinalityError { count: u64 },

    /// A response record was missing an expected field.
    MalformedResponse { message: String },

    /// A fetch failed after retries.
    FetchFailed { message: String },
}

impl FindingKind {
    pub fn severity(&self) -> Severity {
        match self {
            Self::CodesExtracted { .. } => Severity::Ok,
            _ => Severity::Anomaly,
        }
    }

    pub fn is_anomaly(&self) -> bool {
        self.severity() == Severity::Anomaly
    }

    /// Stable snake_case name, matching the serialized tag.
    pub fn name(&self) -> &'static str {
        match self {
            Self::CodesExtracted { .. } => "codes_extracted",
            Self::DuplicateYear { .. } => "duplicate_year",
            Self::NoAffiliations => "no_affiliations",
            Self::MissingAffiliationId => "missing_affiliation_id",
            Self::MissingSegmentationId => "missing_segmentation_id",
            Self::MappingCardinalityError { .. } => "mapping_cardinality_error",
            Self::MalformedResponse { .. } => "malformed_response",
            Self::FetchFailed { .. } => "fetch_failed",
        }
    }
}

/// Affiliation fields as seen in the record the finding concerns.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AffiliationRef {
    pub affiliation_id: Option<String>,
    pub segmentation_id: Option<String>,
}

impl From<&AffiliationRecord> for AffiliationRef {
    fn from(record: &AffiliationRecord) -> Self {
        Self {
            affiliation_id: record.id.clone(),
            segmentation_id: record.segmentation_id.clone(),
        }
    }
}

/// A single audit result attached to the entity it concerns.
///
/// Policy-level findings carry no year; year-level findings carry no
/// implementation; affiliation-level findings carry all three.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Finding {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub year: Option<LaunchYear>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub implementation_id: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub affiliation: Option<AffiliationRef>,

    #[serde(flatten)]
    pub kind: FindingKind,

    pub severity: Severity,
}

impl Finding {
    fn build(
        year: Option<LaunchYear>,
        implementation_id: Option<String>,
        affiliation: Option<AffiliationRef>,
        kind: FindingKind,
    ) -> Self {
        let severity = kind.severity();
        Self {
            year,
            implementation_id,
            affiliation,
            kind,
            severity,
        }
    }

    pub fn policy(kind: FindingKind) -> Self {
        Self::build(None, None, None, kind)
    }

    pub fn year(year: &LaunchYear, kind: FindingKind) -> Self {
        Self::build(Some(year.clone()), None, None, kind)
    }

    pub fn implementation(year: &LaunchYear, implementation_id: &str, kind: FindingKind) -> Self {
        Self::build(
            Some(year.clone()),
            Some(implementation_id.to_string()),
            None,
            kind,
        )
    }

    pub fn affiliation(
        year: &LaunchYear,
        implementation_id: &str,
        affiliation: &AffiliationRecord,
        kind: FindingKind,
    ) -> Self {
        Self::build(
            Some(year.clone()),
            Some(implementation_id.to_string()),
            Some(AffiliationRef::from(affiliation)),
            kind,
        )
    }

    pub fn is_anomaly(&self) -> bool {
        self.kind.is_anomaly()
    }
}

/// Findings of one policy, in audit order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PolicyAudit {
    pub policy: PolicyRecord,
    pub findings: Vec<Finding>,
}

impl PolicyAudit {
    pub fn new(policy: PolicyRecord) -> Self {
        Self {
            policy,
            findings: Vec::new(),
        }
    }

    /// Audit of a policy whose implementations could not be fetched.
    pub fn fetch_failed(policy: PolicyRecord, message: impl Into<String>) -> Self {
        Self {
            policy,
            findings: vec![Finding::policy(FindingKind::FetchFailed {
                message: message.into(),
            })],
        }
    }

    /// Audit of a policy whose implementation response could not be parsed.
    pub fn malformed(policy: PolicyRecord, message: impl Into<String>) -> Self {
        Self {
            policy,
            findings: vec![Finding::policy(FindingKind::MalformedResponse {
                message: message.into(),
            })],
        }
    }

    pub fn anomaly_count(&self) -> usize {
        self.findings.iter().filter(|f| f.is_anomaly()).count()
    }

    pub fn has_fetch_failure(&self) -> bool {
        self.findings
            .iter()
            .any(|f| matches!(f.kind, FindingKind::FetchFailed { .. }))
    }
}
