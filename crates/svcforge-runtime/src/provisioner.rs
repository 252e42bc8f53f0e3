//! Turns a service spec into a named, wired resource graph.
//!
//! Nothing here talks to the deployment target; the graph is applied later
//! by the orchestrator once every node and edge is known.

use std::collections::{BTreeMap, BTreeSet};
use svcforge_core::graph::INVOKE_ACTION;
use svcforge_core::{
    ApiEdge, ApiNode, ApiSpec, ComputeNode, ConfigMerger, FunctionSpec, ProvisionError,
    ResolvedEnvironment, ResourceGraph, ServiceSpec, TableNode, ValidationReport,
};
use svcforge_secrets::SecretResolver;

pub struct ResourceProvisioner<'a> {
    spec: &'a ServiceSpec,
}

impl<'a> ResourceProvisioner<'a> {
    pub fn new(spec: &'a ServiceSpec) -> Self {
        Self { spec }
    }

    /// Effective settings of the function stored under `key`.
    pub fn effective_function(&self, key: &str) -> Option<FunctionSpec> {
        self.spec
            .functions
            .get(key)
            .map(|function| ConfigMerger::merge(self.spec.default_function.as_ref(), function))
    }

    pub fn provision_table(&self) -> Result<TableNode, ProvisionError> {
        let table = &self.spec.table;
        let removal_policy = table
            .parsed_removal_policy()
            .map_err(|value| ProvisionError::InvalidRemovalPolicy { value })?;

        let node = TableNode {
            name: self.spec.table_name(),
            arn: self.spec.table_arn(),
            partition_key: table.partition_key.clone(),
            sort_key: table.sort_key.clone(),
            billing_mode: table.billing_mode,
            capacity: table.capacity,
            removal_policy,
            tags: self.spec.tags.clone(),
        };
        tracing::debug!(table = %node.name, "Planned table");
        Ok(node)
    }

    /// One compute node for an effective (already merged) function.
    pub fn provision_function(
        &self,
        key: &str,
        effective: &FunctionSpec,
        environment: ResolvedEnvironment,
    ) -> Result<ComputeNode, ProvisionError> {
        let entry = effective
            .entry
            .clone()
            .ok_or_else(|| ProvisionError::IncompleteFunction {
                function: key.to_string(),
                field: "entry".to_string(),
            })?;

        let node = ComputeNode {
            key: key.to_string(),
            name: self.spec.resource_name(effective.unit_name(key)),
            entry,
            handler: effective.handler_or_default().to_string(),
            runtime: effective.runtime_or_default().to_string(),
            timeout_seconds: effective.timeout_or_default(),
            memory_size: effective.memory_or_default(),
            log_retention_days: effective.log_retention_days,
            bundling: effective.bundling.clone(),
            environment,
            tags: self.spec.tags.clone(),
            grants: Vec::new(),
        };
        tracing::debug!(
            function = %key,
            name = %node.name,
            variables = node.environment.len(),
            "Planned compute unit"
        );
        Ok(node)
    }

    /// The API node plus one edge per resolver.
    ///
    /// Every resolver must name an existing compute node, and each API field
    /// is served by exactly one node.
    pub fn wire_api(
        &self,
        api: &ApiSpec,
        compute: &BTreeMap<String, ComputeNode>,
    ) -> Result<(ApiNode, Vec<ApiEdge>), ProvisionError> {
        let mut claimed = BTreeSet::new();
        let mut edges = Vec::with_capacity(api.resolvers.len());

        for resolver in &api.resolvers {
            let node = compute.get(&resolver.data_source).ok_or_else(|| {
                ProvisionError::UnknownDataSource {
                    type_name: resolver.type_name.clone(),
                    field_name: resolver.field_name.clone(),
                    data_source: resolver.data_source.clone(),
                }
            })?;

            if !claimed.insert((resolver.type_name.as_str(), resolver.field_name.as_str())) {
                return Err(ProvisionError::DuplicateResolver {
                    type_name: resolver.type_name.clone(),
                    field_name: resolver.field_name.clone(),
                });
            }

            edges.push(ApiEdge {
                type_name: resolver.type_name.clone(),
                field_name: resolver.field_name.clone(),
                function: node.key.clone(),
                compute_name: node.name.clone(),
                actions: vec![INVOKE_ACTION.to_string()],
            });
        }

        let node = ApiNode {
            name: self.spec.resource_name(&api.name),
            schema: api.schema.clone(),
            authentication: api.authentication,
            api_key_expiry_days: api.api_key_expiry_days,
            log_level: api.log_level,
            xray_enabled: api.xray_enabled,
            tags: self.spec.tags.clone(),
        };
        tracing::debug!(api = %node.name, edges = edges.len(), "Planned API");
        Ok((node, edges))
    }

    /// Build the full graph, without grants.
    ///
    /// `resolver` must already have validated the service's secrets.
    pub fn build_graph(
        &self,
        resolver: &mut SecretResolver,
    ) -> Result<ResourceGraph, ValidationReport> {
        let mut report = ValidationReport::new();

        let table = self.provision_table();
        let mut compute = BTreeMap::new();

        for key in self.spec.functions.keys() {
            let Some(effective) = self.effective_function(key) else {
                continue;
            };
            let node = resolver
                .bind_environment(key, &effective, &self.spec.secrets)
                .and_then(|environment| self.provision_function(key, &effective, environment));
            match node {
                Ok(node) => {
                    compute.insert(key.clone(), node);
                }
                Err(error) => report.push(error),
            }
        }

        let api = self.wire_api(&self.spec.api, &compute);

        match (table, api) {
            (Ok(table), Ok((api, api_edges))) if report.is_empty() => Ok(ResourceGraph {
                table,
                compute,
                api,
                api_edges,
                grant_edges: Vec::new(),
            }),
            (table, api) => {
                if let Err(error) = table {
                    report.push(error);
                }
                if let Err(error) = api {
                    report.push(error);
                }
                Err(report)
            }
        }
    }
}
