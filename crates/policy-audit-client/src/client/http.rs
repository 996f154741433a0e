//! HTTP layer: status mapping, retry, session replay.
//!
//! This is the ONLY place for status code handling. client/mod.rs never
//! interprets status codes.

use std::time::Duration;

use reqwest::header::{ACCEPT, AUTHORIZATION};
use reqwest::StatusCode;
use serde_json::Value;
use tracing::{debug, warn};

use policy_audit_core::ResultSet;

use crate::auth::{Session, SessionProvider};
use crate::error::{QueryError, QueryResult};
use crate::types::ClientConfig;

use super::helpers::api_error;

/// HTTP backend for making requests (holds reqwest client, sessions, config).
#[derive(Debug, Clone)]
pub(crate) struct HttpBackend {
    pub(crate) client: reqwest::Client,
    pub(crate) sessions: SessionProvider,
    pub(crate) config: ClientConfig,
}

impl HttpBackend {
    /// GET a result set. `path` is relative to the session's instance URL.
    pub(crate) async fn get_result_set(
        &self,
        path: &str,
        soql: Option<&str>,
    ) -> QueryResult<ResultSet<Value>> {
        let response = self.request(path, soql).await?;
        response
            .json()
            .await
            .map_err(|e| QueryError::MalformedResponse {
                message: format!("failed to parse query response: {}", e),
            })
    }

    /// Make a request with retry on transient failures.
    ///
    /// A rejected session is replaced once per call and the request replayed
    /// without consuming a retry.
    pub(crate) async fn request(
        &self,
        path: &str,
        soql: Option<&str>,
    ) -> QueryResult<reqwest::Response> {
        use rand::Rng;

        let mut retries = 0;
        let max_retries = self.config.max_retries;
        let mut refreshed = false;

        loop {
            let session = self.sessions.session().await?;
            let result = self.request_once(&session, path, soql).await;

            match result {
                Ok(response) => return Ok(response),
                Err(QueryError::Unauthorized { .. }) if !refreshed => {
                    refreshed = true;
                    self.sessions.refresh(&session).await?;
                }
                Err(e) if e.is_retryable() && retries < max_retries => {
                    retries += 1;

                    let backoff = match &e {
                        QueryError::RateLimited {
                            retry_after: Some(retry_after),
                        } => rate_limit_backoff(*retry_after),
                        _ => {
                            let base_backoff = Duration::from_secs(1 << retries.min(5));
                            let base_backoff = base_backoff.min(Duration::from_secs(30));
                            let jittered_ms =
                                rand::thread_rng().gen_range(0..=base_backoff.as_millis() as u64);
                            Duration::from_millis(jittered_ms.max(10))
                        }
                    };

                    warn!(
                        error = %e,
                        retry = retries,
                        max_retries = max_retries,
                        backoff_ms = backoff.as_millis(),
                        "retrying request"
                    );

                    tokio::time::sleep(backoff).await;
                }
                Err(e) => return Err(e),
            }
        }
    }

    async fn request_once(
        &self,
        session: &Session,
        path: &str,
        soql: Option<&str>,
    ) -> QueryResult<reqwest::Response> {
        let url = session.url(path);
        debug!(url = %url, "sending query");

        let mut request = self
            .client
            .get(&url)
            .header(AUTHORIZATION, session.authorization())
            .header(ACCEPT, "application/json");

        if let Some(soql) = soql {
            request = request.query(&[("q", soql)]);
        }

        let response = request.send().await?;
        let status = response.status();

        match status.as_u16() {
            200..=299 => Ok(response),

            401 => {
                let body = response.text().await.unwrap_or_default();
                let (_, message) = api_error(&body, status);
                Err(QueryError::Unauthorized { message })
            }

            429 | 503 => Err(QueryError::RateLimited {
                retry_after: retry_after(&response),
            }),

            _ if status.is_server_error() => {
                let message = response.text().await.unwrap_or_else(|_| status.to_string());
                Err(QueryError::Network {
                    message: format!("HTTP {}: {}", status.as_u16(), message),
                })
            }

            _ => {
                let body = response.text().await.unwrap_or_default();
                let (code, message) = api_error(&body, status);
                if status == StatusCode::FORBIDDEN
                    && code.as_deref() == Some("REQUEST_LIMIT_EXCEEDED")
                {
                    return Err(QueryError::RateLimited { retry_after: None });
                }
                Err(QueryError::Api {
                    status: status.as_u16(),
                    message: match code {
                        Some(code) => format!("{}: {}", code, message),
                        None => message,
                    },
                })
            }
        }
    }
}

/// Server-requested wait, capped at 30s, with +/-10% jitter and a 100ms floor.
fn rate_limit_backoff(retry_after: Duration) -> Duration {
    use rand::Rng;

    let capped = retry_after.min(Duration::from_secs(30));
    let base_ms = capped.as_millis() as u64;
    let jitter_factor: f64 = rand::thread_rng().gen_range(0.9_f64..=1.1_f64);
    let jittered_ms = ((base_ms as f64) * jitter_factor).round() as u64;
    Duration::from_millis(jittered_ms.max(100))
}

fn retry_after(response: &reqwest::Response) -> Option<Duration> {
    response
        .headers()
        .get(reqwest::header::RETRY_AFTER)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.parse::<u64>().ok())
        .map(Duration::from_secs)
}
