use crate::finding::{AffiliationRef, Finding, FindingKind, PolicyAudit};
use crate::model::LaunchYear;
use crate::report::summary::AuditSummary;

const SEPARATOR: &str = "--------------------------------";
const ANOMALY_MARK: &str = "BAD!";

/// Render audits as plain text, one block per policy, followed by totals.
#[must_use]
pub fn render_text(audits: &[PolicyAudit]) -> String {
    let mut out = String::new();
    for audit in audits {
        render_policy(&mut out, audit);
    }
    out.push_str(&format_summary_line(&AuditSummary::from_audits(audits)));
    out.push('\n');
    out
}

/// One-line totals closing the text report.
#[must_use]
pub fn format_summary_line(summary: &AuditSummary) -> String {
    format!(
        "Audited {} policies ({} clean): {} anomalies, {} fetch failures, {} codes extracted",
        summary.policies,
        summary.clean_policies,
        summary.anomalies,
        summary.fetch_failures,
        summary.codes_extracted
    )
}

fn render_policy(out: &mut String, audit: &PolicyAudit) {
    out.push('\n');
    out.push_str(SEPARATOR);
    out.push('\n');
    out.push_str(&format!(
        "PrimaryPolicyNumber: {}\n",
        audit.policy.policy_number
    ));
    out.push_str(&format!("PartnerName: {}\n", audit.policy.partner_name));
    out.push('\n');

    let mut current_year: Option<&LaunchYear> = None;
    for finding in &audit.findings {
        if let Some(year) = &finding.year {
            if current_year != Some(year) {
                if current_year.is_some() {
                    out.push('\n');
                }
                out.push_str(&format!("{}\n", year));
                current_year = Some(year);
            }
        }
        if let Some(affiliation) = &finding.affiliation {
            render_affiliation(out, affiliation);
        }
        out.push_str(&format_finding_line(finding));
        out.push('\n');
    }
}

fn render_affiliation(out: &mut String, affiliation: &AffiliationRef) {
    out.push_str("--\n");
    out.push_str(&format!(
        "affiliation id: {}\n",
        display_opt(affiliation.affiliation_id.as_deref())
    ));
    out.push_str(&format!(
        "segmentation id: {}\n",
        display_opt(affiliation.segmentation_id.as_deref())
    ));
}

fn display_opt(value: Option<&str>) -> &str {
    match value {
        None => "(null)",
        Some("") => "(empty)",
        Some(v) => v,
    }
}

/// Format the detail line of a finding. Anomalies carry the `BAD!` mark.
#[must_use]
pub fn format_finding_line(finding: &Finding) -> String {
    let text = match &finding.kind {
        FindingKind::CodesExtracted { code_count } => {
            format!("mapping count: 1, codes count: {}", code_count)
        }
        FindingKind::DuplicateYear { count } => {
            format!("{} implementation records (should be 1)", count)
        }
        FindingKind::NoAffiliations => match &finding.implementation_id {
            Some(id) => format!("implementation {} has no affiliation records", id),
            None => "there are no affiliation records".to_string(),
        },
        FindingKind::MissingAffiliationId => "affiliation id is null".to_string(),
        FindingKind::MissingSegmentationId => "segmentation id is null".to_string(),
        FindingKind::MappingCardinalityError { count } => {
            format!("{} affiliation mappings (should be 1)", count)
        }
        FindingKind::MalformedResponse { message } => format!("malformed response: {}", message),
        FindingKind::FetchFailed { message } => format!("fetch failed: {}", message),
    };

    if finding.is_anomaly() {
        format!("\t {} {}", ANOMALY_MARK, text)
    } else {
        format!("\t {}", text)
    }
}
