//! Record model, audit engine and report rendering for policy implementation
//! audits.
//!
//! A policy is well formed when:
//!
//! - each launch year has exactly one implementation record,
//! - every affiliation of that implementation has an id and a segmentation id,
//! - each affiliation id has exactly one mapping record, whose identifier blob
//!   holds the eight-digit codes.
//!
//! [`audit_policy`] walks one policy's records and returns its findings in
//! report order. It performs no I/O: mapping records come from an injected
//! [`MappingLookup`].
//!
//! ```no_run
//! use policy_audit_core::{audit_policy, render_text, MappingLookup, PolicyRecord};
//!
//! # async fn example(lookup: &dyn MappingLookup) {
//! let policy = PolicyRecord::new("POL-1", "Acme");
//! let audit = audit_policy(&policy, &[], lookup).await;
//! print!("{}", render_text(&[audit]));
//! # }
//! ```

pub mod audit;
pub mod codes;
pub mod decode;
pub mod finding;
pub mod model;
pub mod report;

pub use audit::{audit_policy, LookupError, MappingLookup, MappingSet};
pub use codes::{extract_codes, CODE_WIDTH};
pub use decode::{
    decode_implementations, decode_listing, decode_mappings, distinct_policies, DecodeError,
    Decoded,
};
pub use finding::{AffiliationRef, Finding, FindingKind, PolicyAudit, Severity};
pub use model::{
    clean_string, AffiliationRecord, ImplementationRecord, LaunchYear, ListingRecord,
    MappingRecord, PolicyRecord, ResultSet,
};
pub use report::{render_json, render_text, AuditSummary};
