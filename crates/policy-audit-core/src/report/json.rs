use serde::Serialize;

use crate::finding::PolicyAudit;
use crate::report::summary::AuditSummary;

#[derive(Serialize)]
struct JsonReport<'a> {
    ok: bool,
    data: ReportData<'a>,
}

#[derive(Serialize)]
struct ReportData<'a> {
    policies: &'a [PolicyAudit],
    summary: AuditSummary,
}

/// Render audits as a single pretty-printed JSON document
/// `{ "ok": .., "data": { "policies": [..], "summary": {..} } }`.
///
/// `ok` is false when any finding is an anomaly.
pub fn render_json(audits: &[PolicyAudit]) -> serde_json::Result<String> {
    let summary = AuditSummary::from_audits(audits);
    serde_json::to_string_pretty(&JsonReport {
        ok: summary.anomalies == 0,
        data: ReportData {
            policies: audits,
            summary,
        },
    })
}
