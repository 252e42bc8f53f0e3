//! `svcforge check` command implementation.
//!
//! Validates a service configuration without touching the secret store:
//! - structural errors (dangling resolvers, duplicate names, bad policies, ...)
//! - warnings for settings that are legal but probably unintended

use anyhow::Result;
use svcforge_core::{AuthenticationType, ProvisionError, ServiceSpec, ValidationReport};
use svcforge_runtime::validate_structure;

use super::TargetArgs;

// ============================================================================
// Check Result Types
// ============================================================================

/// Severity level for check results.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Severity {
    Info,
    Warning,
    Error,
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Severity::Info => write!(f, "INFO"),
            Severity::Warning => write!(f, "WARN"),
            Severity::Error => write!(f, "ERROR"),
        }
    }
}

/// A single check finding.
#[derive(Debug, Clone)]
pub struct CheckFinding {
    pub severity: Severity,
    /// Category of the check that produced this finding.
    pub category: String,
    pub message: String,
    /// Location within the configuration (e.g., "functions.getItem").
    pub location: Option<String>,
}

impl CheckFinding {
    fn new(severity: Severity, category: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            severity,
            category: category.into(),
            message: message.into(),
            location: None,
        }
    }

    fn error(category: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(Severity::Error, category, message)
    }

    fn warning(category: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(Severity::Warning, category, message)
    }

    fn info(category: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(Severity::Info, category, message)
    }

    fn with_location(mut self, location: impl Into<String>) -> Self {
        self.location = Some(location.into());
        self
    }
}

impl From<&ProvisionError> for CheckFinding {
    fn from(error: &ProvisionError) -> Self {
        let (category, location) = match error {
            ProvisionError::SecretNotFound { secret }
            | ProvisionError::MissingSecretKey { secret, .. }
            | ProvisionError::SecretStoreUnavailable { secret, .. }
            | ProvisionError::MalformedSecret { secret, .. } => {
                ("secrets", format!("secrets.{}", secret))
            }
            ProvisionError::UnknownDataSource {
                type_name,
                field_name,
                ..
            }
            | ProvisionError::DuplicateResolver {
                type_name,
                field_name,
            } => ("wiring", format!("api.resolvers.{}.{}", type_name, field_name)),
            ProvisionError::DuplicateFunctionName { functions, .. } => {
                ("functions", format!("functions.{}", functions.join(",")))
            }
            ProvisionError::IncompleteFunction { function, .. }
            | ProvisionError::UnknownSecret { function, .. } => {
                ("functions", format!("functions.{}", function))
            }
            ProvisionError::InvalidPermission { function, .. } => {
                ("permissions", format!("functions.{}.permissions", function))
            }
            ProvisionError::InvalidRemovalPolicy { .. } => {
                ("table", "table.removalPolicy".to_string())
            }
            ProvisionError::Target { resource, .. } => ("target", resource.clone()),
        };
        CheckFinding::error(category, error.to_string()).with_location(location)
    }
}

/// Results from running all checks.
#[derive(Debug, Default)]
pub struct CheckResults {
    pub findings: Vec<CheckFinding>,
}

impl CheckResults {
    fn new() -> Self {
        Self::default()
    }

    fn extend(&mut self, findings: impl IntoIterator<Item = CheckFinding>) {
        self.findings.extend(findings);
    }

    fn extend_report(&mut self, report: &ValidationReport) {
        self.extend(report.errors.iter().map(CheckFinding::from));
    }

    pub fn has_errors(&self) -> bool {
        self.findings.iter().any(|f| f.severity == Severity::Error)
    }

    pub fn error_count(&self) -> usize {
        self.count(Severity::Error)
    }

    pub fn warning_count(&self) -> usize {
        self.count(Severity::Warning)
    }

    fn count(&self, severity: Severity) -> usize {
        self.findings
            .iter()
            .filter(|f| f.severity == severity)
            .count()
    }

    /// Print human-readable summary, most severe first.
    pub fn print_summary(&self) {
        for (severity, title) in [
            (Severity::Error, "Errors"),
            (Severity::Warning, "Warnings"),
            (Severity::Info, "Info"),
        ] {
            let mut group: Vec<_> = self
                .findings
                .iter()
                .filter(|f| f.severity == severity)
                .collect();
            if group.is_empty() {
                continue;
            }
            group.sort_by(|a, b| a.category.cmp(&b.category));

            println!("\n{} ({}):", title, group.len());
            println!("{}", "-".repeat(60));
            for finding in group {
                print_finding(finding);
            }
        }

        println!();
        println!("{}", "=".repeat(60));
        if self.findings.is_empty() {
            println!("All checks passed.");
        } else {
            println!(
                "Summary: {} error(s), {} warning(s)",
                self.error_count(),
                self.warning_count()
            );
        }
    }
}

fn print_finding(finding: &CheckFinding) {
    let location = finding
        .location
        .as_deref()
        .map(|l| format!(" [{}]", l))
        .unwrap_or_default();
    println!(
        "  {} [{}]{}: {}",
        finding.severity, finding.category, location, finding.message
    );
}

// ============================================================================
// Checks
// ============================================================================

/// Run every check against a loaded spec.
pub fn check_spec(spec: &ServiceSpec) -> CheckResults {
    let mut results = CheckResults::new();

    if let Err(report) = validate_structure(spec) {
        results.extend_report(&report);
    }
    results.extend(check_unused_functions(spec));
    results.extend(check_ungranted_functions(spec));
    results.extend(check_secrets(spec));
    results.extend(check_api(spec));

    results
}

fn check_unused_functions(spec: &ServiceSpec) -> Vec<CheckFinding> {
    spec.functions
        .keys()
        .filter(|key| !spec.api.resolvers.iter().any(|r| &r.data_source == *key))
        .map(|key| {
            CheckFinding::warning(
                "wiring",
                format!("function '{}' is not routed from any API field", key),
            )
            .with_location(format!("functions.{}", key))
        })
        .collect()
}

fn check_ungranted_functions(spec: &ServiceSpec) -> Vec<CheckFinding> {
    spec.functions
        .iter()
        .filter(|(_, function)| {
            function.permissions().is_empty()
                && spec
                    .default_function
                    .as_ref()
                    .is_none_or(|d| d.permissions().is_empty())
        })
        .map(|(key, _)| {
            CheckFinding::info(
                "permissions",
                format!("function '{}' declares no permissions", key),
            )
            .with_location(format!("functions.{}.permissions", key))
        })
        .collect()
}

fn check_secrets(spec: &ServiceSpec) -> Vec<CheckFinding> {
    let mut findings = Vec::new();
    for secret in &spec.secrets {
        if secret.required_keys().next().is_none() {
            findings.push(
                CheckFinding::warning(
                    "secrets",
                    format!(
                        "secret '{}' has no secret-sourced variables but must still exist",
                        secret.name
                    ),
                )
                .with_location(format!("secrets.{}", secret.name)),
            );
        }
    }
    findings
}

fn check_api(spec: &ServiceSpec) -> Vec<CheckFinding> {
    let api = &spec.api;
    if api.authentication == AuthenticationType::ApiKey && api.api_key_expiry_days.is_none() {
        return vec![
            CheckFinding::info(
                "api",
                "api key authentication without apiKeyExpiryDays uses the target's default expiry",
            )
            .with_location("api.apiKeyExpiryDays"),
        ];
    }
    Vec::new()
}

/// Run all configuration checks.
pub fn run(target: &TargetArgs) -> Result<()> {
    println!("Checking {} (stage {})...", target.config.display(), target.stage);

    let spec = target.load_spec()?;
    let results = check_spec(&spec);
    results.print_summary();

    if results.has_errors() {
        anyhow::bail!(
            "Configuration check failed with {} error(s)",
            results.error_count()
        );
    }

    Ok(())
}
