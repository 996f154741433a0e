//! Process exit codes of `policy-audit`.
//! These codes are part of the public contract; anomalies found by an audit
//! are report content and still exit with `EXIT_SUCCESS`.

use policy_audit_client::QueryError;

pub const EXIT_SUCCESS: i32 = 0;
pub const EXIT_FAILURE: i32 = 1; // Unclassified failure (I/O, serialization)
pub const CONFIG_ERROR: i32 = 2; // Missing or invalid configuration
pub const AUTH_ERROR: i32 = 3; // Credentials rejected
pub const REMOTE_ERROR: i32 = 4; // Network, rate limit, API error, run deadline
pub const DATA_ERROR: i32 = 5; // Malformed response or unusable cache

/// The run did not finish within `--deadline-secs`.
#[derive(Debug, thiserror::Error)]
#[error("run deadline of {secs}s exceeded")]
pub struct DeadlineExceeded {
    pub secs: u64,
}

/// Exit code for a fatal command error.
pub fn from_error(err: &anyhow::Error) -> i32 {
    for cause in err.chain() {
        if let Some(query) = cause.downcast_ref::<QueryError>() {
            return query.exit_code();
        }
        if cause.downcast_ref::<DeadlineExceeded>().is_some() {
            return REMOTE_ERROR;
        }
    }
    EXIT_FAILURE
}
