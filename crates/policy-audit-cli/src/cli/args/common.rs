//! Argument types shared by `audit` and `fetch`.

use std::path::PathBuf;

use clap::ValueEnum;
use policy_audit_client::RunWindow;

#[derive(ValueEnum, Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

#[derive(clap::Args, Debug, Clone)]
pub struct FetchArgs {
    /// Number of listing rows to request (no limit when absent)
    #[arg(short = 'l', long)]
    pub limit: Option<u32>,

    /// Listing rows to skip
    #[arg(short = 'o', long)]
    pub offset: Option<u32>,

    /// Audit only the first N distinct policies of the listing
    #[arg(long)]
    pub max_policies: Option<usize>,

    /// Policies fetched and audited in parallel (minimum 1)
    #[arg(long, default_value_t = 4)]
    pub concurrency: usize,

    /// Connection configuration document
    #[arg(long, env = "POLICY_AUDIT_CONFIG", default_value = "data/config.json")]
    pub config: PathBuf,

    /// Directory holding snapshot files
    #[arg(long, env = "POLICY_AUDIT_CACHE_DIR", default_value = "data")]
    pub cache_dir: PathBuf,

    /// Per-request timeout in seconds
    /// Default: 30, or POLICY_AUDIT_TIMEOUT when set
    #[arg(long)]
    pub timeout_secs: Option<u64>,

    /// Retries for transient failures
    /// Default: 3, or POLICY_AUDIT_MAX_RETRIES when set
    #[arg(long)]
    pub max_retries: Option<u32>,

    /// Abort the whole run after this many seconds
    #[arg(long)]
    pub deadline_secs: Option<u64>,
}

impl FetchArgs {
    pub fn window(&self) -> RunWindow {
        RunWindow::new(self.limit, self.offset)
    }

    pub fn concurrency(&self) -> usize {
        self.concurrency.max(1)
    }
}
