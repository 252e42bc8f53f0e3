//! Error types for provisioning runs.

use std::fmt;
use thiserror::Error;

/// A violated precondition of a provisioning run.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProvisionError {
    // =========================================================================
    // Secret validation
    // =========================================================================
    /// The secret store has no document with this name.
    #[error("secret '{secret}' was not found in the secret store")]
    SecretNotFound { secret: String },

    /// The document exists but lacks a declared secret-sourced key.
    #[error("secret '{secret}' is missing key '{key}'")]
    MissingSecretKey { secret: String, key: String },

    /// The store could not be reached or refused the request.
    #[error("secret store failed for '{secret}': {message}")]
    SecretStoreUnavailable { secret: String, message: String },

    /// The document is not a key -> string mapping.
    #[error("secret '{secret}' is not a JSON object: {reason}")]
    MalformedSecret { secret: String, reason: String },

    // =========================================================================
    // Structural validation
    // =========================================================================
    /// A resolver references a function that does not exist.
    #[error("resolver {type_name}.{field_name} references unknown data source '{data_source}'")]
    UnknownDataSource {
        type_name: String,
        field_name: String,
        data_source: String,
    },

    /// Two functions would provision under the same name.
    #[error("functions {functions:?} share the name '{name}'")]
    DuplicateFunctionName { name: String, functions: Vec<String> },

    /// More than one resolver claims the same API field.
    #[error("API field {type_name}.{field_name} has more than one resolver")]
    DuplicateResolver { type_name: String, field_name: String },

    #[error("invalid removal policy '{value}' (expected DESTROY or RETAIN)")]
    InvalidRemovalPolicy { value: String },

    /// A function draws from a secret that is not declared in `secrets`.
    #[error("function '{function}' references undeclared secret '{secret}'")]
    UnknownSecret { function: String, secret: String },

    /// A required field is unset even after merging the template.
    #[error("function '{function}' has no '{field}' (set it on the function or in defaultFunction)")]
    IncompleteFunction { function: String, field: String },

    #[error("function '{function}' has an invalid permission: {reason}")]
    InvalidPermission { function: String, reason: String },

    // =========================================================================
    // Deployment target
    // =========================================================================
    #[error("deployment target failed on {resource}: {message}")]
    Target { resource: String, message: String },
}

/// Every error found in one validation phase.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ValidationReport {
    pub errors: Vec<ProvisionError>,
}

impl ValidationReport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, error: ProvisionError) {
        self.errors.push(error);
    }

    pub fn extend(&mut self, errors: impl IntoIterator<Item = ProvisionError>) {
        self.errors.extend(errors);
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn len(&self) -> usize {
        self.errors.len()
    }

    /// `Ok(())` when nothing was reported.
    pub fn into_result(self) -> Result<(), ValidationReport> {
        if self.errors.is_empty() {
            Ok(())
        } else {
            Err(self)
        }
    }
}

impl From<ProvisionError> for ValidationReport {
    fn from(error: ProvisionError) -> Self {
        Self {
            errors: vec![error],
        }
    }
}

impl fmt::Display for ValidationReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} provisioning error(s):", self.errors.len())?;
        for error in &self.errors {
            write!(f, "\n  - {}", error)?;
        }
        Ok(())
    }
}

impl std::error::Error for ValidationReport {}
