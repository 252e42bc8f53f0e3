//! Secret store backends.
//!
//! The engine only ever asks a store whether a document exists and which keys
//! it holds. Retry policy for transient failures belongs to the store.

use async_trait::async_trait;
use serde_json::Value;
use std::collections::{BTreeMap, HashMap};
use std::path::Path;
use std::sync::RwLock;
use thiserror::Error;

/// Errors a secret store can report.
#[derive(Debug, Error)]
pub enum SecretStoreError {
    /// The backend could not be reached or refused the request.
    #[error("secret store unavailable: {0}")]
    Unavailable(String),

    /// The document is not a JSON object.
    #[error("malformed secret document: {0}")]
    Malformed(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result of looking up one secret document.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SecretDocument {
    pub exists: bool,
    pub keys: BTreeMap<String, String>,
}

impl SecretDocument {
    /// A document the store does not have.
    pub fn missing() -> Self {
        Self::default()
    }

    pub fn present(keys: BTreeMap<String, String>) -> Self {
        Self { exists: true, keys }
    }

    /// Parse a stored secret string as a key -> string mapping.
    ///
    /// Non-string values are kept in their JSON text form.
    pub fn from_json_str(raw: &str) -> Result<Self, SecretStoreError> {
        let value: Value = serde_json::from_str(raw)?;
        Self::from_json_value(value)
    }

    fn from_json_value(value: Value) -> Result<Self, SecretStoreError> {
        let Value::Object(map) = value else {
            return Err(SecretStoreError::Malformed(
                "expected a JSON object of key/value pairs".to_string(),
            ));
        };

        let keys = map
            .into_iter()
            .map(|(k, v)| {
                let v = match v {
                    Value::String(s) => s,
                    other => other.to_string(),
                };
                (k, v)
            })
            .collect();
        Ok(Self::present(keys))
    }
}

/// Trait for secret store backends.
#[async_trait]
pub trait SecretStore: Send + Sync {
    /// Look up a secret document by name.
    async fn get_secret(&self, name: &str) -> Result<SecretDocument, SecretStoreError>;
}

/// In-memory store, mainly for tests and dry runs.
#[derive(Default)]
pub struct InMemorySecretStore {
    documents: RwLock<HashMap<String, BTreeMap<String, String>>>,
    lookups: RwLock<HashMap<String, usize>>,
}

impl InMemorySecretStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store (or replace) a document.
    pub fn insert<K, V>(&self, name: impl Into<String>, keys: impl IntoIterator<Item = (K, V)>)
    where
        K: Into<String>,
        V: Into<String>,
    {
        let keys = keys.into_iter().map(|(k, v)| (k.into(), v.into())).collect();
        if let Ok(mut documents) = self.documents.write() {
            documents.insert(name.into(), keys);
        }
    }

    pub fn with_secret<K, V>(
        self,
        name: impl Into<String>,
        keys: impl IntoIterator<Item = (K, V)>,
    ) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        self.insert(name, keys);
        self
    }

    /// How many times a document was requested.
    pub fn lookup_count(&self, name: &str) -> usize {
        self.lookups
            .read()
            .map(|l| l.get(name).copied().unwrap_or(0))
            .unwrap_or(0)
    }
}

#[async_trait]
impl SecretStore for InMemorySecretStore {
    async fn get_secret(&self, name: &str) -> Result<SecretDocument, SecretStoreError> {
        if let Ok(mut lookups) = self.lookups.write() {
            *lookups.entry(name.to_string()).or_insert(0) += 1;
        }

        let documents = self
            .documents
            .read()
            .map_err(|e| SecretStoreError::Unavailable(format!("lock poisoned: {}", e)))?;

        Ok(match documents.get(name) {
            Some(keys) => SecretDocument::present(keys.clone()),
            None => SecretDocument::missing(),
        })
    }
}

/// Store backed by a JSON file mapping secret names to documents:
///
/// ```json
/// { "dev/appsync": { "API_KEY": "...", "DATABASE_URL": "..." } }
/// ```
pub struct FileSecretStore {
    documents: HashMap<String, Value>,
}

impl FileSecretStore {
    /// Read the whole file once; lookups are served from memory.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, SecretStoreError> {
        let content = std::fs::read_to_string(path.as_ref())?;
        let value: Value = serde_json::from_str(&content)?;
        let Value::Object(map) = value else {
            return Err(SecretStoreError::Malformed(
                "secrets file must be a JSON object keyed by secret name".to_string(),
            ));
        };
        tracing::debug!(
            path = %path.as_ref().display(),
            documents = map.len(),
            "Loaded secrets file"
        );
        Ok(Self {
            documents: map.into_iter().collect(),
        })
    }
}

#[async_trait]
impl SecretStore for FileSecretStore {
    async fn get_secret(&self, name: &str) -> Result<SecretDocument, SecretStoreError> {
        match self.documents.get(name) {
            Some(value) => SecretDocument::from_json_value(value.clone()),
            None => Ok(SecretDocument::missing()),
        }
    }
}
