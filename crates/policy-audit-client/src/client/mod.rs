//! Query client for the CRM REST API.
//!
//! Public API: no status code knowledge. All HTTP/status mapping in http.rs.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, USER_AGENT};
use serde_json::Value;
use tracing::debug;

use policy_audit_core::{
    decode_mappings, LookupError, MappingLookup, MappingSet, PolicyRecord, ResultSet,
};

use crate::auth::{Session, SessionProvider};
use crate::error::{QueryError, QueryResult};
use crate::soql;
use crate::types::ClientConfig;

pub(crate) mod helpers;
mod http;

use http::HttpBackend;

const USER_AGENT_VALUE: &str = concat!("policy-audit/", env!("CARGO_PKG_VERSION"));

/// Upper bound on pages followed by [`QueryClient::query_all`].
const MAX_PAGES: usize = 1000;

/// Authenticated query client.
///
/// Cloning is cheap and clones share one session.
#[derive(Debug, Clone)]
pub struct QueryClient {
    http: HttpBackend,
}

impl QueryClient {
    pub fn new(config: ClientConfig) -> QueryResult<Self> {
        let mut default_headers = HeaderMap::new();
        default_headers.insert(USER_AGENT, HeaderValue::from_static(USER_AGENT_VALUE));

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .default_headers(default_headers)
            .build()
            .map_err(|e| QueryError::Network {
                message: format!("failed to create HTTP client: {}", e),
            })?;

        let sessions = SessionProvider::new(client.clone(), config.clone());

        Ok(Self {
            http: HttpBackend {
                client,
                sessions,
                config,
            },
        })
    }

    /// Obtain the session up front so bad credentials fail before any query.
    pub async fn authenticate(&self) -> QueryResult<Session> {
        self.http.sessions.session().await
    }

    /// Run a query and return its first page.
    pub async fn query(&self, soql: &str) -> QueryResult<ResultSet<Value>> {
        debug!(soql = %soql, "running query");
        self.http
            .get_result_set(&self.http.config.query_path(), Some(soql))
            .await
    }

    /// Run a query and follow `nextRecordsUrl` until the last page.
    pub async fn query_all(&self, soql: &str) -> QueryResult<ResultSet<Value>> {
        let mut result = self.query(soql).await?;
        let mut pages = 1;

        while !result.done {
            let Some(next) = result.next_records_url.take() else {
                break;
            };
            if pages >= MAX_PAGES {
                return Err(QueryError::MalformedResponse {
                    message: format!("query did not finish after {} pages", MAX_PAGES),
                });
            }
            debug!(next = %next, page = pages + 1, "fetching next page");
            let page = self.http.get_result_set(&next, None).await?;
            result.records.extend(page.records);
            result.done = page.done;
            result.next_records_url = page.next_records_url;
            pages += 1;
        }

        Ok(result)
    }

    /// Listing of implementations that carry a policy number and a partner.
    pub async fn list_policies(
        &self,
        limit: Option<u32>,
        offset: Option<u32>,
    ) -> QueryResult<ResultSet<Value>> {
        self.query_all(&soql::policy_listing(limit, offset)).await
    }

    /// Implementations of one policy with their affiliation sub-select.
    pub async fn fetch_implementations(
        &self,
        policy: &PolicyRecord,
    ) -> QueryResult<ResultSet<Value>> {
        self.query_all(&soql::implementations_for(policy)).await
    }

    /// Mapping records of one affiliation, decoded.
    pub async fn fetch_mappings(&self, affiliation_id: &str) -> QueryResult<MappingSet> {
        let raw = self.query_all(&soql::mappings_for(affiliation_id)).await?;
        let decoded = decode_mappings(&raw);
        if let Some(error) = decoded.errors.first() {
            return Err(QueryError::MalformedResponse {
                message: format!("mapping {}", error),
            });
        }
        Ok(MappingSet {
            total_size: raw.total_size,
            records: decoded.records,
        })
    }
}

#[async_trait]
impl MappingLookup for QueryClient {
    async fn lookup(&self, affiliation_id: &str) -> Result<MappingSet, LookupError> {
        self.fetch_mappings(affiliation_id)
            .await
            .map_err(|e| match e {
                QueryError::MalformedResponse { message } => LookupError::Malformed(message),
                other => LookupError::Fetch(other.to_string()),
            })
    }
}
