//! CRM query client and snapshot cache for policy implementation audits.
//!
//! This crate provides:
//!
//! - OAuth username/password authentication with one cached session per
//!   client, replaced only when the API rejects it
//! - Query execution with pagination, retry and backoff
//! - Typed helpers for the policy listing, implementation and mapping queries
//! - A JSON snapshot cache so runs can skip the network
//!
//! # Quick Start
//!
//! ```no_run
//! use policy_audit_client::{ClientConfig, QueryClient};
//!
//! # async fn example() -> anyhow::Result<()> {
//! let config = ClientConfig::from_file("data/config.json".as_ref())?;
//! let client = QueryClient::new(config)?;
//! client.authenticate().await?;
//!
//! let listing = client.list_policies(Some(10), None).await?;
//! println!("{} implementations", listing.total_size);
//! # Ok(())
//! # }
//! ```
//!
//! # Configuration
//!
//! | Environment Variable | Description |
//! |---------------------|-------------|
//! | `POLICY_AUDIT_TIMEOUT` | Request timeout in seconds (default: 30) |
//! | `POLICY_AUDIT_MAX_RETRIES` | Max retries for transient failures (default: 3) |

pub mod auth;
pub mod cache;
pub mod client;
pub mod error;
pub mod soql;
pub mod types;

// Re-export main types
pub use auth::{Session, SessionProvider};
pub use cache::{ImplementationSnapshot, RunWindow, SnapshotCache, SnapshotKind};
pub use client::QueryClient;
pub use error::{QueryError, QueryResult};
pub use types::{ClientConfig, TokenResponse};
