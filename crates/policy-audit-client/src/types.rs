//! Configuration and API wire types.

use std::fmt;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{QueryError, QueryResult};

/// Connection settings for the CRM.
///
/// Loaded once at startup and passed by value into the client.
#[derive(Clone, Serialize, Deserialize)]
pub struct ClientConfig {
    /// Login host, e.g. `https://login.salesforce.com`.
    #[serde(rename = "salesforceUrl")]
    pub salesforce_url: String,

    #[serde(rename = "clientId")]
    pub client_id: String,

    #[serde(rename = "clientSecret")]
    pub client_secret: String,

    #[serde(rename = "clientUserName")]
    pub client_user_name: String,

    #[serde(rename = "clientPassword")]
    pub client_password: String,

    /// API version path segment, e.g. `v52.0`.
    pub version: String,

    /// Request timeout in seconds.
    #[serde(default = "default_timeout", skip_serializing)]
    pub timeout_secs: u64,

    /// Maximum retries for transient failures.
    #[serde(default = "default_max_retries", skip_serializing)]
    pub max_retries: u32,
}

fn default_timeout() -> u64 {
    30
}

fn default_max_retries() -> u32 {
    3
}

/// On-disk configuration document: `{ "salesforce": { ... } }`.
#[derive(Debug, Deserialize)]
struct ConfigDocument {
    salesforce: ClientConfig,
}

impl ClientConfig {
    /// Parse a configuration document.
    ///
    /// Every connection field must be present and non-empty.
    pub fn from_json(text: &str) -> QueryResult<Self> {
        let doc: ConfigDocument = serde_json::from_str(text).map_err(|e| QueryError::Config {
            message: format!("invalid configuration document: {}", e),
        })?;
        doc.salesforce.validate()?;
        Ok(doc.salesforce)
    }

    /// Load a configuration document from disk.
    pub fn from_file(path: &Path) -> QueryResult<Self> {
        let text = std::fs::read_to_string(path).map_err(|e| QueryError::Config {
            message: format!("failed to read {}: {}", path.display(), e),
        })?;
        Self::from_json(&text).map_err(|e| match e {
            QueryError::Config { message } => QueryError::Config {
                message: format!("{}: {}", path.display(), message),
            },
            other => other,
        })
    }

    /// Apply `POLICY_AUDIT_TIMEOUT` and `POLICY_AUDIT_MAX_RETRIES` overrides.
    pub fn with_env_overrides(mut self) -> Self {
        if let Some(timeout) = std::env::var("POLICY_AUDIT_TIMEOUT")
            .ok()
            .and_then(|v| v.parse().ok())
        {
            self.timeout_secs = timeout;
        }
        if let Some(retries) = std::env::var("POLICY_AUDIT_MAX_RETRIES")
            .ok()
            .and_then(|v| v.parse().ok())
        {
            self.max_retries = retries;
        }
        self
    }

    fn validate(&self) -> QueryResult<()> {
        let fields = [
            ("salesforceUrl", &self.salesforce_url),
            ("clientId", &self.client_id),
            ("clientSecret", &self.client_secret),
            ("clientUserName", &self.client_user_name),
            ("clientPassword", &self.client_password),
            ("version", &self.version),
        ];
        for (name, value) in fields {
            if value.trim().is_empty() {
                return Err(QueryError::Config {
                    message: format!("field `{}` is empty", name),
                });
            }
        }
        Ok(())
    }

    /// Set the login host.
    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.salesforce_url = url.into();
        self
    }

    pub fn with_timeout_secs(mut self, secs: u64) -> Self {
        self.timeout_secs = secs;
        self
    }

    pub fn with_max_retries(mut self, retries: u32) -> Self {
        self.max_retries = retries;
        self
    }

    pub fn token_url(&self) -> String {
        format!(
            "{}/services/oauth2/token",
            self.salesforce_url.trim_end_matches('/')
        )
    }

    /// Path of the query resource, relative to the session's instance URL.
    pub fn query_path(&self) -> String {
        format!("/services/data/{}/query", self.version)
    }
}

impl fmt::Debug for ClientConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientConfig")
            .field("salesforce_url", &self.salesforce_url)
            .field("client_id", &self.client_id)
            .field("client_secret", &"<redacted>")
            .field("client_user_name", &self.client_user_name)
            .field("client_password", &"<redacted>")
            .field("version", &self.version)
            .field("timeout_secs", &self.timeout_secs)
            .field("max_retries", &self.max_retries)
            .finish()
    }
}

/// Response from the token endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct TokenResponse {
    pub token_type: String,
    pub access_token: String,
    pub instance_url: String,
}

/// Error body returned by the token endpoint.
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct AuthErrorBody {
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub error_description: Option<String>,
}

/// One entry of the error array returned by the REST API.
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct ApiErrorItem {
    #[serde(default)]
    pub message: Option<String>,
    #[serde(rename = "errorCode", default)]
    pub error_code: Option<String>,
}
