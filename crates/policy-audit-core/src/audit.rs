//! Audit engine: structural checks over one policy's implementation tree.
//!
//! The engine performs no I/O. Mapping records are obtained through the
//! injected [`MappingLookup`], which is only consulted for affiliations that
//! carry both an id and a segmentation id.

use std::collections::BTreeMap;

use async_trait::async_trait;
use tracing::debug;

use crate::codes::extract_codes;
use crate::finding::{Finding, FindingKind, PolicyAudit};
use crate::model::{
    AffiliationRecord, ImplementationRecord, LaunchYear, MappingRecord, PolicyRecord,
};

/// Mapping records returned for one affiliation id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MappingSet {
    /// Count reported by the source.
    pub total_size: u64,
    pub records: Vec<MappingRecord>,
}

impl MappingSet {
    pub fn new(records: Vec<MappingRecord>) -> Self {
        Self {
            total_size: records.len() as u64,
            records,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LookupError {
    /// Transport failure after retries.
    #[error("mapping fetch failed: {0}")]
    Fetch(String),

    /// The response could not be decoded.
    #[error("malformed mapping response: {0}")]
    Malformed(String),
}

/// Capability to look up mapping records by affiliation id.
#[async_trait]
pub trait MappingLookup: Send + Sync {
    async fn lookup(&self, affiliation_id: &str) -> Result<MappingSet, LookupError>;
}

/// Audit one policy.
///
/// Years are visited newest first. A year with other than one implementation
/// yields a single `DuplicateYear` and is not descended into. Affiliations
/// are visited in their given order.
pub async fn audit_policy<L>(
    policy: &PolicyRecord,
    implementations: &[ImplementationRecord],
    lookup: &L,
) -> PolicyAudit
where
    L: MappingLookup + ?Sized,
{
    let mut audit = PolicyAudit::new(policy.clone());

    let mut by_year: BTreeMap<&LaunchYear, Vec<&ImplementationRecord>> = BTreeMap::new();
    for implementation in implementations {
        by_year
            .entry(&implementation.launch_year)
            .or_default()
            .push(implementation);
    }

    for (year, records) in by_year.into_iter().rev() {
        match records.as_slice() {
            [implementation] => {
                audit_implementation(year, implementation, lookup, &mut audit.findings).await;
            }
            _ => {
                debug!(
                    policy = %policy.policy_number,
                    year = %year,
                    count = records.len(),
                    "ambiguous launch year"
                );
                audit.findings.push(Finding::year(
                    year,
                    FindingKind::DuplicateYear {
                        count: records.len(),
                    },
                ));
            }
        }
    }

    audit
}

async fn audit_implementation<L>(
    year: &LaunchYear,
    implementation: &ImplementationRecord,
    lookup: &L,
    findings: &mut Vec<Finding>,
) where
    L: MappingLookup + ?Sized,
{
    if implementation.affiliations.is_empty() {
        findings.push(Finding::implementation(
            year,
            &implementation.id,
            FindingKind::NoAffiliations,
        ));
        return;
    }

    for affiliation in &implementation.affiliations {
        let kind = check_affiliation(affiliation, lookup).await;
        findings.push(Finding::affiliation(
            year,
            &implementation.id,
            affiliation,
            kind,
        ));
    }
}

async fn check_affiliation<L>(affiliation: &AffiliationRecord, lookup: &L) -> FindingKind
where
    L: MappingLookup + ?Sized,
{
    let Some(affiliation_id) = affiliation.usable_id() else {
        return FindingKind::MissingAffiliationId;
    };
    if affiliation.usable_segmentation_id().is_none() {
        return FindingKind::MissingSegmentationId;
    }

    let mappings = match lookup.lookup(affiliation_id).await {
        Ok(mappings) => mappings,
        Err(LookupError::Fetch(message)) => return FindingKind::FetchFailed { message },
        Err(LookupError::Malformed(message)) => {
            return FindingKind::MalformedResponse { message }
        }
    };

    if mappings.total_size != 1 {
        return FindingKind::MappingCardinalityError {
            count: mappings.total_size,
        };
    }

    match mappings.records.first() {
        Some(mapping) => FindingKind::CodesExtracted {
            code_count: extract_codes(&mapping.identifier_values).len(),
        },
        None => FindingKind::MalformedResponse {
            message: format!("mapping count is 1 but no record returned for {affiliation_id}"),
        },
    }
}
