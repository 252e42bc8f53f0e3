//! Structural checks run before any secret is fetched.
//!
//! Every problem is collected, so one run lists every malformed entry.

use std::collections::{BTreeMap, BTreeSet};
use svcforge_core::{ConfigMerger, ProvisionError, ServiceSpec, ValidationReport};
use svcforge_policy::PermissionGranter;

pub fn validate_structure(spec: &ServiceSpec) -> Result<(), ValidationReport> {
    let mut report = ValidationReport::new();

    if let Err(value) = spec.table.parsed_removal_policy() {
        report.push(ProvisionError::InvalidRemovalPolicy { value });
    }

    let mut by_name: BTreeMap<String, Vec<String>> = BTreeMap::new();
    for (key, function) in &spec.functions {
        let effective = ConfigMerger::merge(spec.default_function.as_ref(), function);

        by_name
            .entry(spec.resource_name(effective.unit_name(key)))
            .or_default()
            .push(key.clone());

        if effective.entry.as_deref().map_or(true, |e| e.trim().is_empty()) {
            report.push(ProvisionError::IncompleteFunction {
                function: key.clone(),
                field: "entry".to_string(),
            });
        }

        report.extend(PermissionGranter::validate_permissions(
            key,
            effective.permissions(),
        ));

        // Unset means every declared secret, which is always resolvable.
        if let Some(names) = &effective.secrets {
            let mut seen = BTreeSet::new();
            for name in names.iter().filter(|n| seen.insert(n.as_str())) {
                if spec.get_secret(name).is_none() {
                    report.push(ProvisionError::UnknownSecret {
                        function: key.clone(),
                        secret: name.clone(),
                    });
                }
            }
        }
    }

    for (name, functions) in by_name {
        if functions.len() > 1 {
            report.push(ProvisionError::DuplicateFunctionName { name, functions });
        }
    }

    let mut claimed = BTreeSet::new();
    for resolver in &spec.api.resolvers {
        if !spec.functions.contains_key(&resolver.data_source) {
            report.push(ProvisionError::UnknownDataSource {
                type_name: resolver.type_name.clone(),
                field_name: resolver.field_name.clone(),
                data_source: resolver.data_source.clone(),
            });
        }
        if !claimed.insert((resolver.type_name.as_str(), resolver.field_name.as_str())) {
            report.push(ProvisionError::DuplicateResolver {
                type_name: resolver.type_name.clone(),
                field_name: resolver.field_name.clone(),
            });
        }
    }

    if report.is_empty() {
        tracing::debug!(functions = spec.functions.len(), "Structure is valid");
    }
    report.into_result()
}
