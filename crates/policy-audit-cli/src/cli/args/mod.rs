use clap::{Parser, Subcommand};

pub mod common;
pub use common::*;

#[derive(Parser)]
#[command(
    name = "policy-audit",
    version,
    about = "Audit CRM policy implementations for structural anomalies"
)]
pub struct Cli {
    #[command(subcommand)]
    pub cmd: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Fetch (or load) policies and audit their implementations
    Audit(AuditArgs),
    /// Fetch and cache the listing and implementation trees without auditing
    Fetch(FetchArgs),
    Version,
}

#[derive(clap::Args, Debug, Clone)]
pub struct AuditArgs {
    #[command(flatten)]
    pub fetch: FetchArgs,

    /// Read listing and implementation snapshots from the cache directory
    /// instead of querying them. Mapping lookups still go to the API.
    #[arg(long)]
    pub load: bool,

    /// Report format
    #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
    pub format: OutputFormat,
}
