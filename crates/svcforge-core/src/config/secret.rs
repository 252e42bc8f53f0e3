//! Secret document declarations.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Where a declared variable's value comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VariableSource {
    /// Read from the secret document under the variable's name.
    Secret,
    /// Literal value carried in the configuration.
    Static,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SecretVariable {
    pub source: VariableSource,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
}

impl SecretVariable {
    pub fn secret() -> Self {
        Self {
            source: VariableSource::Secret,
            value: None,
        }
    }

    pub fn literal(value: impl Into<String>) -> Self {
        Self {
            source: VariableSource::Static,
            value: Some(value.into()),
        }
    }
}

/// A secret document and the environment variables it supplies.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SecretSpec {
    /// Name of the document in the secret store.
    pub name: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// Environment variable name -> source. Ordered so bindings are deterministic.
    #[serde(default)]
    pub variables: BTreeMap<String, SecretVariable>,
}

impl SecretSpec {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: None,
            variables: BTreeMap::new(),
        }
    }

    pub fn with_variable(mut self, env_var: impl Into<String>, variable: SecretVariable) -> Self {
        self.variables.insert(env_var.into(), variable);
        self
    }

    /// Keys the backing document must contain.
    pub fn required_keys(&self) -> impl Iterator<Item = &str> {
        self.variables
            .iter()
            .filter(|(_, v)| v.source == VariableSource::Secret)
            .map(|(k, _)| k.as_str())
    }
}
