//! Per-run secret validation and environment binding.
//!
//! A `SecretResolver` lives for exactly one provisioning run. It fetches each
//! secret document at most once, remembers only which keys the document has,
//! and hands out reference bindings. Secret values are dropped as soon as a
//! document has been checked.

use crate::store::{SecretStore, SecretStoreError};
use futures::future::join_all;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;
use svcforge_core::{
    EnvBinding, FunctionSpec, ProvisionError, ResolvedEnvironment, SecretSpec, ValidationReport,
    VariableSource,
};

/// What one fetch told us about a document. Written once per name.
#[derive(Debug, Clone)]
enum FetchedSecret {
    Missing,
    Present { keys: BTreeSet<String> },
    Failed(ProvisionError),
}

/// Symbolic handle to a validated secret document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SecretHandle {
    pub name: String,
    pub keys: BTreeSet<String>,
}

/// Validates secret documents and binds function environments.
pub struct SecretResolver {
    store: Arc<dyn SecretStore>,
    fetched: BTreeMap<String, FetchedSecret>,
    handles: BTreeMap<String, SecretHandle>,
}

impl SecretResolver {
    pub fn new(store: Arc<dyn SecretStore>) -> Self {
        Self {
            store,
            fetched: BTreeMap::new(),
            handles: BTreeMap::new(),
        }
    }

    /// Check that every declared secret exists with all its secret-sourced keys.
    ///
    /// Each unique name is fetched once; distinct names are fetched
    /// concurrently. Every failure across every secret is reported together.
    pub async fn validate_all(&mut self, secrets: &[SecretSpec]) -> Result<(), ValidationReport> {
        let pending: BTreeSet<&str> = secrets
            .iter()
            .map(|s| s.name.as_str())
            .filter(|name| !self.fetched.contains_key(*name))
            .collect();

        if !pending.is_empty() {
            tracing::debug!(count = pending.len(), "Fetching secret documents");
        }

        let fetches = pending.into_iter().map(|name| {
            let store = Arc::clone(&self.store);
            async move {
                let result = store.get_secret(name).await;
                (name.to_string(), result)
            }
        });

        let results = join_all(fetches).await;
        for (name, result) in results {
            let fetched = match result {
                Ok(doc) if doc.exists => FetchedSecret::Present {
                    keys: doc.keys.into_keys().collect(),
                },
                Ok(_) => FetchedSecret::Missing,
                Err(e) => FetchedSecret::Failed(store_error(&name, e)),
            };
            // First fetch wins.
            self.fetched.entry(name).or_insert(fetched);
        }

        let mut report = ValidationReport::new();
        let mut reported = BTreeSet::new();
        let mut reported_keys = BTreeSet::new();

        for spec in secrets {
            match self.fetched.get(&spec.name) {
                Some(FetchedSecret::Present { keys }) => {
                    for key in spec.required_keys() {
                        // Empty values count as present.
                        if !keys.contains(key)
                            && reported_keys.insert((spec.name.as_str(), key))
                        {
                            report.push(ProvisionError::MissingSecretKey {
                                secret: spec.name.clone(),
                                key: key.to_string(),
                            });
                        }
                    }
                }
                Some(FetchedSecret::Missing) => {
                    if reported.insert(spec.name.as_str()) {
                        report.push(ProvisionError::SecretNotFound {
                            secret: spec.name.clone(),
                        });
                    }
                }
                Some(FetchedSecret::Failed(error)) => {
                    if reported.insert(spec.name.as_str()) {
                        report.push(error.clone());
                    }
                }
                None => {}
            }
        }

        if report.is_empty() {
            tracing::info!(secrets = secrets.len(), "All secrets validated");
        } else {
            tracing::warn!(errors = report.len(), "Secret validation failed");
        }

        report.into_result()
    }

    /// Build the environment of one (already merged) function.
    ///
    /// Literal variables come first; the variables of every referenced secret
    /// are layered on top in declaration order. Secret-sourced variables become
    /// references, never values.
    pub fn bind_environment(
        &mut self,
        function: &str,
        spec: &FunctionSpec,
        secrets: &[SecretSpec],
    ) -> Result<ResolvedEnvironment, ProvisionError> {
        let mut environment = ResolvedEnvironment::new();
        for (name, value) in &spec.environment {
            environment.insert(name.clone(), EnvBinding::literal(value.clone()));
        }

        for secret in referenced_secrets(function, spec, secrets)? {
            let handle = self.handle(&secret.name)?;

            for (env_var, variable) in &secret.variables {
                match variable.source {
                    VariableSource::Secret => {
                        environment.insert(
                            env_var.clone(),
                            EnvBinding::secret_ref(handle.name.clone(), env_var.clone()),
                        );
                    }
                    VariableSource::Static => {
                        match variable.value.as_deref().filter(|v| !v.is_empty()) {
                            Some(value) => {
                                environment.insert(env_var.clone(), EnvBinding::literal(value));
                            }
                            None => tracing::warn!(
                                function = %function,
                                secret = %secret.name,
                                variable = %env_var,
                                "Static variable has no value, skipping"
                            ),
                        }
                    }
                }
            }
        }

        Ok(environment)
    }

    /// Handle of a validated secret. Created once per name per run.
    pub fn handle(&mut self, name: &str) -> Result<&SecretHandle, ProvisionError> {
        if !self.handles.contains_key(name) {
            let keys = match self.fetched.get(name) {
                Some(FetchedSecret::Present { keys }) => keys.clone(),
                Some(FetchedSecret::Failed(error)) => return Err(error.clone()),
                Some(FetchedSecret::Missing) | None => {
                    // Unvalidated secrets are never bound.
                    return Err(ProvisionError::SecretNotFound {
                        secret: name.to_string(),
                    });
                }
            };
            tracing::debug!(secret = %name, "Created secret handle");
            self.handles.insert(
                name.to_string(),
                SecretHandle {
                    name: name.to_string(),
                    keys,
                },
            );
        }

        self.handles
            .get(name)
            .ok_or_else(|| ProvisionError::SecretNotFound {
                secret: name.to_string(),
            })
    }

    /// Number of secret handles created so far.
    pub fn handle_count(&self) -> usize {
        self.handles.len()
    }
}

/// Secrets a merged function draws from: its `secrets` list, or every declared
/// secret when the list is unset.
pub fn referenced_secrets<'a>(
    function: &str,
    spec: &FunctionSpec,
    secrets: &'a [SecretSpec],
) -> Result<Vec<&'a SecretSpec>, ProvisionError> {
    let Some(names) = &spec.secrets else {
        return Ok(secrets.iter().collect());
    };

    let mut seen = BTreeSet::new();
    let mut referenced = Vec::new();
    for name in names {
        if !seen.insert(name.as_str()) {
            continue;
        }
        let secret = secrets.iter().find(|s| &s.name == name).ok_or_else(|| {
            ProvisionError::UnknownSecret {
                function: function.to_string(),
                secret: name.clone(),
            }
        })?;
        referenced.push(secret);
    }
    Ok(referenced)
}

fn store_error(name: &str, error: SecretStoreError) -> ProvisionError {
    match error {
        SecretStoreError::Malformed(reason) => ProvisionError::MalformedSecret {
            secret: name.to_string(),
            reason,
        },
        SecretStoreError::Json(e) => ProvisionError::MalformedSecret {
            secret: name.to_string(),
            reason: e.to_string(),
        },
        other => ProvisionError::SecretStoreUnavailable {
            secret: name.to_string(),
            message: other.to_string(),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::InMemorySecretStore;
    use svcforge_core::SecretVariable;

    fn app_secret() -> SecretSpec {
        SecretSpec::new("dev/app")
            .with_variable("API_KEY", SecretVariable::secret())
            .with_variable("DATABASE_URL", SecretVariable::secret())
            .with_variable("STAGE", SecretVariable::literal("dev"))
    }

    fn store_with(keys: &[(&str, &str)]) -> Arc<InMemorySecretStore> {
        let store = InMemorySecretStore::new();
        store.insert("dev/app", keys.iter().copied());
        Arc::new(store)
    }

    #[tokio::test]
    async fn test_validate_all_passes_when_keys_present() {
        let store = store_with(&[("API_KEY", "k"), ("DATABASE_URL", "")]);
        let mut resolver = SecretResolver::new(store);
        assert!(resolver.validate_all(&[app_secret()]).await.is_ok());
    }

    #[tokio::test]
    async fn test_validate_all_reports_every_missing_key() {
        let store = store_with(&[]);
        let mut resolver = SecretResolver::new(store);

        let report = resolver.validate_all(&[app_secret()]).await.unwrap_err();
        assert_eq!(
            report.errors,
            vec![
                ProvisionError::MissingSecretKey {
                    secret: "dev/app".to_string(),
                    key: "API_KEY".to_string(),
                },
                ProvisionError::MissingSecretKey {
                    secret: "dev/app".to_string(),
                    key: "DATABASE_URL".to_string(),
                },
            ]
        );
    }

    #[tokio::test]
    async fn test_validate_all_reports_missing_document_once() {
        let store = Arc::new(InMemorySecretStore::new());
        let mut resolver = SecretResolver::new(store.clone());

        let report = resolver
            .validate_all(&[app_secret(), app_secret()])
            .await
            .unwrap_err();
        assert_eq!(
            report.errors,
            vec![ProvisionError::SecretNotFound {
                secret: "dev/app".to_string()
            }]
        );
        assert_eq!(store.lookup_count("dev/app"), 1);
    }

    #[tokio::test]
    async fn test_missing_key_reported_once_for_repeated_secret() {
        let store = store_with(&[("API_KEY", "k")]);
        let mut resolver = SecretResolver::new(store);

        let report = resolver
            .validate_all(&[app_secret(), app_secret()])
            .await
            .unwrap_err();
        assert_eq!(
            report.errors,
            vec![ProvisionError::MissingSecretKey {
                secret: "dev/app".to_string(),
                key: "DATABASE_URL".to_string(),
            }]
        );
    }

    #[tokio::test]
    async fn test_empty_static_value_is_skipped() {
        let store = store_with(&[("API_KEY", "k"), ("DATABASE_URL", "d")]);
        let mut resolver = SecretResolver::new(store);
        let secrets = [app_secret().with_variable("REGION", SecretVariable::literal(""))];
        resolver.validate_all(&secrets).await.unwrap();

        let function = FunctionSpec {
            environment: [("REGION".to_string(), "us-east-1".to_string())].into(),
            ..Default::default()
        };
        let env = resolver
            .bind_environment("getItem", &function, &secrets)
            .unwrap();

        assert_eq!(env.get("REGION"), Some(&EnvBinding::literal("us-east-1")));
    }

    #[tokio::test]
    async fn test_fetch_is_cached_across_validations() {
        let store = Arc::new(
            InMemorySecretStore::new()
                .with_secret("dev/app", [("API_KEY", "k"), ("DATABASE_URL", "d")]),
        );
        let mut resolver = SecretResolver::new(store.clone());

        resolver.validate_all(&[app_secret()]).await.unwrap();
        resolver.validate_all(&[app_secret()]).await.unwrap();
        assert_eq!(store.lookup_count("dev/app"), 1);
    }

    #[tokio::test]
    async fn test_bind_environment_emits_references() {
        let store = store_with(&[("API_KEY", "super-secret"), ("DATABASE_URL", "d")]);
        let mut resolver = SecretResolver::new(store);
        let secrets = [app_secret()];
        resolver.validate_all(&secrets).await.unwrap();

        let function = FunctionSpec {
            environment: [("LOG_LEVEL".to_string(), "info".to_string())].into(),
            ..Default::default()
        };
        let env = resolver
            .bind_environment("getItem", &function, &secrets)
            .unwrap();

        assert_eq!(env.get("LOG_LEVEL"), Some(&EnvBinding::literal("info")));
        assert_eq!(env.get("STAGE"), Some(&EnvBinding::literal("dev")));
        assert_eq!(
            env.get("API_KEY"),
            Some(&EnvBinding::secret_ref("dev/app", "API_KEY"))
        );
        assert_eq!(env.referenced_secrets(), vec!["dev/app"]);
    }

    #[tokio::test]
    async fn test_bind_environment_shares_handles_across_functions() {
        let store = store_with(&[("API_KEY", "k"), ("DATABASE_URL", "d")]);
        let mut resolver = SecretResolver::new(store);
        let secrets = [app_secret()];
        resolver.validate_all(&secrets).await.unwrap();

        let function = FunctionSpec::default();
        resolver.bind_environment("a", &function, &secrets).unwrap();
        resolver.bind_environment("b", &function, &secrets).unwrap();
        assert_eq!(resolver.handle_count(), 1);
    }

    #[tokio::test]
    async fn test_bind_environment_refuses_unvalidated_secret() {
        let store = store_with(&[("API_KEY", "k"), ("DATABASE_URL", "d")]);
        let mut resolver = SecretResolver::new(store);

        let err = resolver
            .bind_environment("getItem", &FunctionSpec::default(), &[app_secret()])
            .unwrap_err();
        assert!(matches!(err, ProvisionError::SecretNotFound { .. }));
    }

    #[test]
    fn test_referenced_secrets_rejects_undeclared_name() {
        let function = FunctionSpec {
            secrets: Some(vec!["dev/other".to_string()]),
            ..Default::default()
        };
        let err = referenced_secrets("getItem", &function, &[app_secret()]).unwrap_err();
        assert_eq!(
            err,
            ProvisionError::UnknownSecret {
                function: "getItem".to_string(),
                secret: "dev/other".to_string(),
            }
        );
    }

    #[test]
    fn test_referenced_secrets_defaults_to_all() {
        let secrets = [app_secret(), SecretSpec::new("dev/extra")];
        let referenced = referenced_secrets("getItem", &FunctionSpec::default(), &secrets).unwrap();
        assert_eq!(referenced.len(), 2);
    }
}
