//! Layering of function settings over the `defaultFunction` template.
//!
//! Scalar fields: the function's value wins when set, otherwise the template's.
//! `environment` and `bundling` are merged key by key. `name` identifies the
//! function and is never taken from the template.

use super::function::{BundlingOptions, FunctionSpec};

/// Computes effective function settings.
pub struct ConfigMerger;

impl ConfigMerger {
    /// Merge `function` over `template`, producing the effective spec.
    ///
    /// Idempotent: merging an effective spec again with the same template
    /// returns it unchanged.
    pub fn merge(template: Option<&FunctionSpec>, function: &FunctionSpec) -> FunctionSpec {
        let Some(template) = template else {
            return function.clone();
        };

        let mut environment = template.environment.clone();
        environment.extend(
            function
                .environment
                .iter()
                .map(|(k, v)| (k.clone(), v.clone())),
        );

        FunctionSpec {
            name: function.name.clone(),
            entry: pick(&function.entry, &template.entry),
            handler: pick(&function.handler, &template.handler),
            runtime: pick(&function.runtime, &template.runtime),
            timeout_seconds: function.timeout_seconds.or(template.timeout_seconds),
            memory_size: function.memory_size.or(template.memory_size),
            log_retention_days: function.log_retention_days.or(template.log_retention_days),
            environment,
            permissions: pick(&function.permissions, &template.permissions),
            secrets: pick(&function.secrets, &template.secrets),
            bundling: merge_bundling(&template.bundling, &function.bundling),
        }
    }
}

fn pick<T: Clone>(own: &Option<T>, inherited: &Option<T>) -> Option<T> {
    own.as_ref().or(inherited.as_ref()).cloned()
}

fn merge_bundling(template: &BundlingOptions, own: &BundlingOptions) -> BundlingOptions {
    BundlingOptions {
        minify: own.minify.or(template.minify),
        source_map: own.source_map.or(template.source_map),
        target: pick(&own.target, &template.target),
        external_modules: pick(&own.external_modules, &template.external_modules),
    }
}
