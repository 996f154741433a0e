//! Session management for the CRM API.
//!
//! A session is obtained once with the OAuth username/password grant and
//! reused for every query. It is replaced only when the query endpoint
//! rejects it; concurrent callers that observe the same rejected token
//! trigger a single re-authentication.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::sync::RwLock;

use crate::client::helpers::auth_error_message;
use crate::error::{QueryError, QueryResult};
use crate::types::{ClientConfig, TokenResponse};

/// Bearer session returned by the token endpoint.
#[derive(Clone)]
pub struct Session {
    pub token_type: String,
    pub access_token: String,
    /// Base URL for all data requests of this session.
    pub instance_url: String,
    pub issued_at: DateTime<Utc>,
}

impl Session {
    /// Value of the `Authorization` header.
    pub fn authorization(&self) -> String {
        format!("{} {}", self.token_type, self.access_token)
    }

    /// Time since the token was issued.
    pub fn age(&self) -> chrono::Duration {
        Utc::now() - self.issued_at
    }

    /// Absolute URL for a path under the instance URL.
    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.instance_url.trim_end_matches('/'), path)
    }
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("token_type", &self.token_type)
            .field("instance_url", &self.instance_url)
            .field("issued_at", &self.issued_at)
            .finish_non_exhaustive()
    }
}

impl From<TokenResponse> for Session {
    fn from(response: TokenResponse) -> Self {
        Self {
            token_type: response.token_type,
            access_token: response.access_token,
            instance_url: response.instance_url,
            issued_at: Utc::now(),
        }
    }
}

/// Owns the cached session and knows how to obtain a new one.
#[derive(Debug, Clone)]
pub struct SessionProvider {
    client: reqwest::Client,
    config: ClientConfig,
    cached: Arc<RwLock<Option<Session>>>,
}

impl SessionProvider {
    pub fn new(client: reqwest::Client, config: ClientConfig) -> Self {
        Self {
            client,
            config,
            cached: Arc::new(RwLock::new(None)),
        }
    }

    /// Current session, authenticating on first use.
    pub async fn session(&self) -> QueryResult<Session> {
        {
            let cache = self.cached.read().await;
            if let Some(session) = cache.as_ref() {
                return Ok(session.clone());
            }
        }

        let mut cache = self.cached.write().await;
        if let Some(session) = cache.as_ref() {
            return Ok(session.clone());
        }
        let session = self.exchange_with_retry().await?;
        *cache = Some(session.clone());
        Ok(session)
    }

    /// Replace a session the server rejected.
    ///
    /// If another caller already replaced `stale`, its replacement is returned
    /// without a new token exchange.
    pub async fn refresh(&self, stale: &Session) -> QueryResult<Session> {
        let mut cache = self.cached.write().await;
        if let Some(current) = cache.as_ref() {
            if current.access_token != stale.access_token {
                return Ok(current.clone());
            }
        }

        tracing::info!(
            session_age_secs = stale.age().num_seconds(),
            "session rejected, re-authenticating"
        );
        *cache = None;
        let session = self.exchange_with_retry().await?;
        *cache = Some(session.clone());
        Ok(session)
    }

    /// Token exchange with exponential backoff on transport failures.
    ///
    /// Rejected credentials are never retried.
    async fn exchange_with_retry(&self) -> QueryResult<Session> {
        let mut retries = 0;
        let max_retries = self.config.max_retries;

        loop {
            match self.exchange().await {
                Ok(session) => return Ok(session),
                Err(e) if e.is_retryable() && retries < max_retries => {
                    retries += 1;

                    // 1s, 2s, 4s, capped at 30s
                    let backoff = Duration::from_secs(1 << retries.min(5));
                    let backoff = backoff.min(Duration::from_secs(30));

                    tracing::warn!(
                        error = %e,
                        retry = retries,
                        backoff_secs = backoff.as_secs(),
                        "token exchange failed, retrying"
                    );

                    tokio::time::sleep(backoff).await;
                }
                Err(e) => return Err(e),
            }
        }
    }

    async fn exchange(&self) -> QueryResult<Session> {
        let params = [
            ("grant_type", "password"),
            ("client_id", self.config.client_id.as_str()),
            ("client_secret", self.config.client_secret.as_str()),
            ("username", self.config.client_user_name.as_str()),
            ("password", self.config.client_password.as_str()),
        ];

        let response = self
            .client
            .post(self.config.token_url())
            .form(&params)
            .send()
            .await?;

        let status = response.status();
        if status.is_server_error() {
            return Err(QueryError::Network {
                message: format!("token endpoint returned HTTP {}", status.as_u16()),
            });
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(QueryError::Authentication {
                message: auth_error_message(&body, status),
            });
        }

        let token: TokenResponse =
            response
                .json()
                .await
                .map_err(|e| QueryError::MalformedResponse {
                    message: format!("failed to parse token response: {}", e),
                })?;

        tracing::info!(
            instance_url = %token.instance_url,
            token_type = %token.token_type,
            "obtained access token"
        );

        Ok(Session::from(token))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn session(token: &str) -> Session {
        Session {
            token_type: "Bearer".to_string(),
            access_token: token.to_string(),
            instance_url: "https://eu1.example.com/".to_string(),
            issued_at: Utc::now(),
        }
    }

    #[test]
    fn test_session_authorization_and_url() {
        let s = session("abc");
        assert_eq!(s.authorization(), "Bearer abc");
        assert_eq!(
            s.url("/services/data/v52.0/query"),
            "https://eu1.example.com/services/data/v52.0/query"
        );
    }

    #[test]
    fn test_session_age() {
        let mut s = session("abc");
        s.issued_at = Utc::now() - chrono::Duration::minutes(90);
        let age = s.age();
        assert!(age >= chrono::Duration::minutes(90));
        assert!(age < chrono::Duration::minutes(91));
    }

    #[test]
    fn test_session_debug_hides_token() {
        let debug = format!("{:?}", session("very-secret-token"));
        assert!(!debug.contains("very-secret-token"));
    }
}
