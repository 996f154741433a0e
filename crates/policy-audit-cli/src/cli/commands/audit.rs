use futures::stream::{self, StreamExt};
use tracing::info;

use policy_audit_client::SnapshotCache;
use policy_audit_core::{
    audit_policy, decode_implementations, render_json, render_text, Finding, FindingKind,
    MappingLookup, PolicyAudit,
};

use super::gather::{self, PolicyImplementations, TreeError};
use crate::cli::args::{AuditArgs, OutputFormat};
use crate::exit_codes::EXIT_SUCCESS;

pub async fn run(args: AuditArgs) -> anyhow::Result<i32> {
    gather::with_deadline(args.fetch.deadline_secs, execute(&args)).await
}

async fn execute(args: &AuditArgs) -> anyhow::Result<i32> {
    let client = gather::connect(&args.fetch).await?;
    let cache = SnapshotCache::with_dir(args.fetch.cache_dir.clone());

    let gathered = if args.load {
        gather::load(&cache, &args.fetch).await?
    } else {
        gather::fetch(&client, &cache, &args.fetch).await?
    };

    info!(
        policies = gathered.policies.len(),
        failed = gathered.failures(),
        "auditing policies"
    );
    let audits = audit_all(gathered.policies, &client, args.fetch.concurrency()).await;

    match args.format {
        OutputFormat::Text => print!("{}", render_text(&audits)),
        OutputFormat::Json => println!("{}", render_json(&audits)?),
    }
    Ok(EXIT_SUCCESS)
}

/// Audit every policy, at most `concurrency` at a time, keeping input order.
pub(crate) async fn audit_all<L>(
    work: Vec<PolicyImplementations>,
    lookup: &L,
    concurrency: usize,
) -> Vec<PolicyAudit>
where
    L: MappingLookup + ?Sized,
{
    stream::iter(work)
        .map(|item| audit_one(item, lookup))
        .buffered(concurrency.max(1))
        .collect()
        .await
}

async fn audit_one<L>(item: PolicyImplementations, lookup: &L) -> PolicyAudit
where
    L: MappingLookup + ?Sized,
{
    let raw = match item.outcome {
        Ok(raw) => raw,
        Err(TreeError::Fetch(message)) => return PolicyAudit::fetch_failed(item.policy, message),
        Err(TreeError::Malformed(message)) => return PolicyAudit::malformed(item.policy, message),
    };

    let decoded = decode_implementations(&raw);
    let mut audit = audit_policy(&item.policy, &decoded.records, lookup).await;

    if !decoded.errors.is_empty() {
        let mut findings: Vec<Finding> = decoded
            .errors
            .iter()
            .map(|e| {
                Finding::policy(FindingKind::MalformedResponse {
                    message: e.to_string(),
                })
            })
            .collect();
        findings.append(&mut audit.findings);
        audit.findings = findings;
    }
    audit
}
