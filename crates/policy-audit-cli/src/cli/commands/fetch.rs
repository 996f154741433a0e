use policy_audit_client::{SnapshotCache, SnapshotKind};

use super::gather;
use crate::cli::args::FetchArgs;
use crate::exit_codes::EXIT_SUCCESS;

/// Fetch and cache the listing and implementation trees, then print counts.
pub async fn run(args: FetchArgs) -> anyhow::Result<i32> {
    gather::with_deadline(args.deadline_secs, execute(&args)).await
}

async fn execute(args: &FetchArgs) -> anyhow::Result<i32> {
    let client = gather::connect(args).await?;
    let cache = SnapshotCache::with_dir(args.cache_dir.clone());
    let gathered = gather::fetch(&client, &cache, args).await?;

    let failed = gathered.failures();
    println!(
        "Fetched {} listing rows, {} policies, {} implementation trees ({} failed)",
        gathered.listing_rows,
        gathered.policies.len(),
        gathered.policies.len() - failed,
        failed
    );
    let window = args.window();
    for kind in [SnapshotKind::Policies, SnapshotKind::Implementations] {
        println!("Saved {}", cache.path(kind, window).display());
    }
    Ok(EXIT_SUCCESS)
}
