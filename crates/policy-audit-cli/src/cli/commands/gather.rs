//! Listing and implementation acquisition shared by `audit` and `fetch`.

use std::collections::HashMap;
use std::future::Future;
use std::time::Duration;

use futures::stream::{self, StreamExt};
use serde_json::Value;
use tracing::{info, warn};

use policy_audit_client::{
    ClientConfig, ImplementationSnapshot, QueryClient, QueryError, SnapshotCache, SnapshotKind,
};
use policy_audit_core::{decode_listing, distinct_policies, PolicyRecord, ResultSet};

use crate::cli::args::FetchArgs;
use crate::exit_codes::DeadlineExceeded;

/// Why a policy has no implementation tree to audit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum TreeError {
    /// The query failed, or the tree is absent from the snapshot.
    Fetch(String),
    /// The response arrived but could not be parsed.
    Malformed(String),
}

impl From<QueryError> for TreeError {
    fn from(e: QueryError) -> Self {
        match e {
            QueryError::MalformedResponse { .. } => Self::Malformed(e.to_string()),
            other => Self::Fetch(other.to_string()),
        }
    }
}

/// Raw implementation tree of one policy, or why it could not be obtained.
pub(crate) struct PolicyImplementations {
    pub policy: PolicyRecord,
    pub outcome: Result<ResultSet<Value>, TreeError>,
}

pub(crate) struct Gathered {
    /// Listing rows before deduplication.
    pub listing_rows: usize,
    pub policies: Vec<PolicyImplementations>,
}

impl Gathered {
    pub fn failures(&self) -> usize {
        self.policies.iter().filter(|p| p.outcome.is_err()).count()
    }
}

/// Load the configuration document, then apply environment and flag overrides.
pub(crate) fn client_config(args: &FetchArgs) -> anyhow::Result<ClientConfig> {
    let mut config = ClientConfig::from_file(&args.config)?.with_env_overrides();
    if let Some(secs) = args.timeout_secs {
        config = config.with_timeout_secs(secs);
    }
    if let Some(retries) = args.max_retries {
        config = config.with_max_retries(retries);
    }
    Ok(config)
}

/// Build the client and authenticate before any query runs.
pub(crate) async fn connect(args: &FetchArgs) -> anyhow::Result<QueryClient> {
    let client = QueryClient::new(client_config(args)?)?;
    client.authenticate().await?;
    Ok(client)
}

pub(crate) async fn with_deadline<T, F>(deadline_secs: Option<u64>, run: F) -> anyhow::Result<T>
where
    F: Future<Output = anyhow::Result<T>>,
{
    match deadline_secs {
        Some(secs) => match tokio::time::timeout(Duration::from_secs(secs), run).await {
            Ok(result) => result,
            Err(_) => Err(DeadlineExceeded { secs }.into()),
        },
        None => run.await,
    }
}

/// Query the listing and the implementations of every selected policy.
///
/// Both snapshots are written before returning. A policy whose
/// implementations could not be fetched is kept with its error and left out
/// of the implementation snapshot.
pub(crate) async fn fetch(
    client: &QueryClient,
    cache: &SnapshotCache,
    args: &FetchArgs,
) -> anyhow::Result<Gathered> {
    let window = args.window();
    let listing = client.list_policies(window.limit, window.offset).await?;
    cache.save(SnapshotKind::Policies, window, &listing).await?;

    let policies = select_policies(&listing, args.max_policies);
    info!(
        rows = listing.records.len(),
        policies = policies.len(),
        "fetched policy listing"
    );

    let fetched: Vec<PolicyImplementations> = stream::iter(policies)
        .map(|policy| async move {
            let outcome = client.fetch_implementations(&policy).await.map_err(|e| {
                warn!(
                    policy = %policy.policy_number,
                    partner = %policy.partner_name,
                    error = %e,
                    "implementation fetch failed"
                );
                TreeError::from(e)
            });
            PolicyImplementations { policy, outcome }
        })
        .buffered(args.concurrency())
        .collect()
        .await;

    let snapshots: Vec<ImplementationSnapshot> = fetched
        .iter()
        .filter_map(|p| {
            p.outcome
                .as_ref()
                .ok()
                .map(|raw| ImplementationSnapshot::new(&p.policy, raw.clone()))
        })
        .collect();
    cache
        .save(SnapshotKind::Implementations, window, &snapshots)
        .await?;

    Ok(Gathered {
        listing_rows: listing.records.len(),
        policies: fetched,
    })
}

/// Read the listing and implementation snapshots of the run window.
pub(crate) async fn load(cache: &SnapshotCache, args: &FetchArgs) -> anyhow::Result<Gathered> {
    let window = args.window();
    let listing: ResultSet<Value> = cache.load(SnapshotKind::Policies, window).await?;
    let snapshots: Vec<ImplementationSnapshot> =
        cache.load(SnapshotKind::Implementations, window).await?;

    let mut trees: HashMap<PolicyRecord, ResultSet<Value>> = snapshots
        .into_iter()
        .map(|s| (s.policy(), s.implementation_response))
        .collect();

    let snapshot_path = cache.path(SnapshotKind::Implementations, window);
    let policies: Vec<PolicyImplementations> = select_policies(&listing, args.max_policies)
        .into_iter()
        .map(|policy| {
            let outcome = trees.remove(&policy).ok_or_else(|| {
                TreeError::Fetch(format!(
                    "no cached implementations in {}",
                    snapshot_path.display()
                ))
            });
            PolicyImplementations { policy, outcome }
        })
        .collect();

    info!(
        rows = listing.records.len(),
        policies = policies.len(),
        "loaded snapshots"
    );

    Ok(Gathered {
        listing_rows: listing.records.len(),
        policies,
    })
}

/// Distinct policies of the listing in first-seen order, capped at `max_policies`.
fn select_policies(listing: &ResultSet<Value>, max_policies: Option<usize>) -> Vec<PolicyRecord> {
    let decoded = decode_listing(listing);
    for error in &decoded.errors {
        warn!(error = %error, "skipping malformed listing record");
    }
    for row in &decoded.records {
        info!(
            implementation = row.id.as_deref().unwrap_or(""),
            launch_year = %row.launch_year,
            policy = %row.policy_number,
            partner = %row.partner_name,
            "listing row"
        );
    }
    let mut policies = distinct_policies(decoded.records);
    if let Some(max) = max_policies {
        policies.truncate(max);
    }
    policies
}
