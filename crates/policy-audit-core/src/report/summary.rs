use serde::Serialize;

use crate::finding::{FindingKind, PolicyAudit};

/// Totals over a run's audits.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct AuditSummary {
    pub policies: usize,
    pub clean_policies: usize,
    pub findings: usize,
    pub anomalies: usize,
    pub fetch_failures: usize,
    pub codes_extracted: usize,
}

impl AuditSummary {
    pub fn from_audits(audits: &[PolicyAudit]) -> Self {
        let mut summary = Self {
            policies: audits.len(),
            ..Default::default()
        };

        for audit in audits {
            if audit.anomaly_count() == 0 {
                summary.clean_policies += 1;
            }
            for finding in &audit.findings {
                summary.findings += 1;
                if finding.is_anomaly() {
                    summary.anomalies += 1;
                }
                match &finding.kind {
                    FindingKind::FetchFailed { .. } => summary.fetch_failures += 1,
                    FindingKind::CodesExtracted { code_count } => {
                        summary.codes_extracted += code_count
                    }
                    _ => {}
                }
            }
        }

        summary
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::finding::Finding;
    use crate::model::{LaunchYear, PolicyRecord};

    #[test]
    fn test_summary_counts() {
        let mut clean = PolicyAudit::new(PolicyRecord::new("P1", "Acme"));
        clean.findings.push(Finding::year(
            &LaunchYear::from(2020),
            FindingKind::CodesExtracted { code_count: 4 },
        ));
        let failed = PolicyAudit::fetch_failed(PolicyRecord::new("P2", "Acme"), "timeout");

        let summary = AuditSummary::from_audits(&[clean, failed]);
        assert_eq!(summary.policies, 2);
        assert_eq!(summary.clean_policies, 1);
        assert_eq!(summary.findings, 2);
        assert_eq!(summary.anomalies, 1);
        assert_eq!(summary.fetch_failures, 1);
        assert_eq!(summary.codes_extracted, 4);
    }

    #[test]
    fn test_empty_summary() {
        assert_eq!(AuditSummary::from_audits(&[]), AuditSummary::default());
    }
}
