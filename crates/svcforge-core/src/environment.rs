//! Per-function environment bindings.
//!
//! Secret-sourced variables are kept as references to `(secret, key)`; the
//! deployment target resolves them when it creates the compute unit. A secret
//! value never appears in a [`ResolvedEnvironment`].

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum EnvBinding {
    /// A value carried in the configuration.
    Literal { value: String },
    /// A key inside a secret document, resolved by the deployment target.
    SecretRef { secret: String, key: String },
}

impl EnvBinding {
    pub fn literal(value: impl Into<String>) -> Self {
        EnvBinding::Literal {
            value: value.into(),
        }
    }

    pub fn secret_ref(secret: impl Into<String>, key: impl Into<String>) -> Self {
        EnvBinding::SecretRef {
            secret: secret.into(),
            key: key.into(),
        }
    }

    /// Name of the referenced secret, if this binding is a reference.
    pub fn secret_name(&self) -> Option<&str> {
        match self {
            EnvBinding::Literal { .. } => None,
            EnvBinding::SecretRef { secret, .. } => Some(secret),
        }
    }
}

/// Environment variable name -> binding, ordered for deterministic output.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ResolvedEnvironment {
    bindings: BTreeMap<String, EnvBinding>,
}

impl ResolvedEnvironment {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a binding, replacing any earlier one for the same variable.
    pub fn insert(&mut self, name: impl Into<String>, binding: EnvBinding) {
        self.bindings.insert(name.into(), binding);
    }

    pub fn get(&self, name: &str) -> Option<&EnvBinding> {
        self.bindings.get(name)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &EnvBinding)> {
        self.bindings.iter()
    }

    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }

    /// Distinct secret names referenced by this environment, sorted.
    pub fn referenced_secrets(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self
            .bindings
            .values()
            .filter_map(EnvBinding::secret_name)
            .collect();
        names.sort_unstable();
        names.dedup();
        names
    }
}
