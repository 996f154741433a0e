//! Snapshot cache for raw query results.
//!
//! Snapshots let a run skip the network. There is no TTL and no
//! invalidation: a run either loads snapshots or refetches and overwrites
//! them.
//!
//! # Cache Structure
//!
//! ```text
//! {cache_dir}/
//!   policies_{limit}_{offset}.json         # raw listing result set
//!   implementations_{limit}_{offset}.json  # per-policy implementation trees
//! ```
//!
//! Documents are pretty-printed with object keys sorted, so identical data
//! produces identical files.

use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::fs;
use tracing::debug;

use policy_audit_core::{PolicyRecord, ResultSet};

use crate::error::{QueryError, QueryResult};

/// The `(limit, offset)` window a run fetched.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunWindow {
    pub limit: Option<u32>,
    pub offset: Option<u32>,
}

impl RunWindow {
    pub fn new(limit: Option<u32>, offset: Option<u32>) -> Self {
        Self { limit, offset }
    }

    fn suffix(&self) -> String {
        fn part(v: Option<u32>) -> String {
            v.map(|n| n.to_string()).unwrap_or_else(|| "none".to_string())
        }
        format!("{}_{}", part(self.limit), part(self.offset))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SnapshotKind {
    /// Raw policy listing result set.
    Policies,
    /// List of [`ImplementationSnapshot`].
    Implementations,
}

impl SnapshotKind {
    fn stem(self) -> &'static str {
        match self {
            Self::Policies => "policies",
            Self::Implementations => "implementations",
        }
    }
}

/// Raw implementation tree of one policy as stored on disk.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImplementationSnapshot {
    #[serde(rename = "policyNumber")]
    pub policy_number: String,

    #[serde(rename = "partnerName")]
    pub partner_name: String,

    #[serde(rename = "implementationResponse")]
    pub implementation_response: ResultSet<Value>,
}

impl ImplementationSnapshot {
    pub fn new(policy: &PolicyRecord, implementation_response: ResultSet<Value>) -> Self {
        Self {
            policy_number: policy.policy_number.clone(),
            partner_name: policy.partner_name.clone(),
            implementation_response,
        }
    }

    pub fn policy(&self) -> PolicyRecord {
        PolicyRecord::new(self.policy_number.clone(), self.partner_name.clone())
    }
}

/// Directory of JSON snapshots.
#[derive(Debug, Clone)]
pub struct SnapshotCache {
    cache_dir: PathBuf,
}

impl SnapshotCache {
    pub fn with_dir(cache_dir: impl Into<PathBuf>) -> Self {
        Self {
            cache_dir: cache_dir.into(),
        }
    }

    /// File a snapshot is stored in.
    pub fn path(&self, kind: SnapshotKind, window: RunWindow) -> PathBuf {
        self.cache_dir
            .join(format!("{}_{}.json", kind.stem(), window.suffix()))
    }

    /// Write a snapshot, replacing any previous one.
    pub async fn save<T: Serialize>(
        &self,
        kind: SnapshotKind,
        window: RunWindow,
        value: &T,
    ) -> QueryResult<PathBuf> {
        fs::create_dir_all(&self.cache_dir)
            .await
            .map_err(|e| QueryError::Cache {
                message: format!(
                    "failed to create cache directory {}: {}",
                    self.cache_dir.display(),
                    e
                ),
            })?;

        let json = to_sorted_json(value)?;
        let path = self.path(kind, window);
        write_atomic(&path, &json).await?;

        debug!(path = %path.display(), "saved snapshot");
        Ok(path)
    }

    /// Read a snapshot written by [`SnapshotCache::save`].
    pub async fn load<T: DeserializeOwned>(
        &self,
        kind: SnapshotKind,
        window: RunWindow,
    ) -> QueryResult<T> {
        let path = self.path(kind, window);
        let text = fs::read_to_string(&path)
            .await
            .map_err(|e| QueryError::Cache {
                message: format!("failed to read snapshot {}: {}", path.display(), e),
            })?;

        debug!(path = %path.display(), "loaded snapshot");
        serde_json::from_str(&text).map_err(|e| QueryError::Cache {
            message: format!("invalid snapshot {}: {}", path.display(), e),
        })
    }
}

/// Pretty JSON with every object's keys in lexicographic order.
pub fn to_sorted_json<T: Serialize>(value: &T) -> QueryResult<String> {
    let value = serde_json::to_value(value).map_err(|e| QueryError::Cache {
        message: format!("failed to serialize snapshot: {}", e),
    })?;
    serde_json::to_string_pretty(&sort_keys(value)).map_err(|e| QueryError::Cache {
        message: format!("failed to serialize snapshot: {}", e),
    })
}

fn sort_keys(value: Value) -> Value {
    match value {
        Value::Object(map) => {
            let mut entries: Vec<(String, Value)> = map.into_iter().collect();
            entries.sort_by(|a, b| a.0.cmp(&b.0));
            Value::Object(
                entries
                    .into_iter()
                    .map(|(k, v)| (k, sort_keys(v)))
                    .collect(),
            )
        }
        Value::Array(items) => Value::Array(items.into_iter().map(sort_keys).collect()),
        other => other,
    }
}

async fn write_atomic(path: &Path, content: &str) -> QueryResult<()> {
    let temp_path = path.with_extension("tmp");

    fs::write(&temp_path, content)
        .await
        .map_err(|e| QueryError::Cache {
            message: format!("failed to write temp file: {}", e),
        })?;

    fs::rename(&temp_path, path)
        .await
        .map_err(|e| QueryError::Cache {
            message: format!("failed to rename temp file: {}", e),
        })?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::TempDir;

    fn create_test_cache() -> (SnapshotCache, TempDir) {
        let temp_dir = TempDir::new().unwrap();
        let cache = SnapshotCache::with_dir(temp_dir.path().join("data"));
        (cache, temp_dir)
    }

    #[test]
    fn test_snapshot_paths() {
        let cache = SnapshotCache::with_dir("data");
        assert_eq!(
            cache.path(SnapshotKind::Policies, RunWindow::new(Some(50), None)),
            PathBuf::from("data/policies_50_none.json")
        );
        assert_eq!(
            cache.path(SnapshotKind::Implementations, RunWindow::new(Some(50), Some(100))),
            PathBuf::from("data/implementations_50_100.json")
        );
    }

    #[test]
    fn test_sorted_keys_nested() {
        let text = to_sorted_json(&json!({
            "zeta": 1,
            "alpha": {"records": [{"b": 1, "a": 2}], "done": true}
        }))
        .unwrap();

        let alpha = text.find("\"alpha\"").unwrap();
        let zeta = text.find("\"zeta\"").unwrap();
        assert!(alpha < zeta);
        assert!(text.find("\"done\"").unwrap() < text.find("\"records\"").unwrap());
        assert!(text.find("\"a\"").unwrap() < text.find("\"b\"").unwrap());
        assert!(text.contains('\n'), "expected pretty output");
    }

    #[tokio::test]
    async fn test_save_and_load_implementations() {
        let (cache, _temp_dir) = create_test_cache();
        let window = RunWindow::new(Some(2), Some(0));
        let snapshots = vec![ImplementationSnapshot::new(
            &PolicyRecord::new("P1", "Acme"),
            ResultSet::from_records(vec![json!({"Id": "I1", "Rally_Launch_Year__c": "2020"})]),
        )];

        let path = cache
            .save(SnapshotKind::Implementations, window, &snapshots)
            .await
            .unwrap();
        assert!(path.ends_with("implementations_2_0.json"));

        let loaded: Vec<ImplementationSnapshot> = cache
            .load(SnapshotKind::Implementations, window)
            .await
            .unwrap();
        assert_eq!(loaded, snapshots);
        assert_eq!(loaded[0].policy(), PolicyRecord::new("P1", "Acme"));
    }

    #[tokio::test]
    async fn test_save_is_deterministic() {
        let (cache, _temp_dir) = create_test_cache();
        let window = RunWindow::default();
        let listing = ResultSet::from_records(vec![json!({"b": 1, "a": 2})]);

        let path = cache
            .save(SnapshotKind::Policies, window, &listing)
            .await
            .unwrap();
        let first = std::fs::read_to_string(&path).unwrap();
        cache
            .save(SnapshotKind::Policies, window, &listing)
            .await
            .unwrap();
        let second = std::fs::read_to_string(&path).unwrap();

        assert_eq!(first, second);
        assert!(!path.with_extension("tmp").exists());
    }

    #[tokio::test]
    async fn test_load_missing_snapshot() {
        let (cache, _temp_dir) = create_test_cache();
        let err = cache
            .load::<ResultSet<Value>>(SnapshotKind::Policies, RunWindow::new(Some(5), None))
            .await
            .unwrap_err();
        match err {
            QueryError::Cache { message } => assert!(message.contains("policies_5_none.json")),
            other => panic!("expected Cache error, got {other:?}"),
        }
    }
}
