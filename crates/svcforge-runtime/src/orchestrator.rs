use crate::provisioner::ResourceProvisioner;
use crate::target::{ApiHandle, ComputeHandle, DeploymentTarget, TableHandle};
use crate::validate::validate_structure;
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::Arc;
use svcforge_core::{Permission, ProvisionError, ResourceGraph, ServiceSpec, ValidationReport};
use svcforge_policy::PermissionGranter;
use svcforge_secrets::{SecretResolver, SecretStore};

/// Handles returned by the target for a completed run.
#[derive(Debug, Clone, Serialize)]
pub struct ProvisionOutcome {
    pub graph: ResourceGraph,
    pub table: TableHandle,
    pub compute: BTreeMap<String, ComputeHandle>,
    pub api: ApiHandle,
}

/// Drives one provisioning run per call.
///
/// Phases run in order: structure, secrets, graph, grants, apply. The target
/// is only called once every earlier phase has succeeded.
pub struct Orchestrator<T: DeploymentTarget> {
    secrets: Arc<dyn SecretStore>,
    target: T,
}

impl<T: DeploymentTarget> Orchestrator<T> {
    pub fn new(secrets: Arc<dyn SecretStore>, target: T) -> Self {
        Self { secrets, target }
    }

    pub fn target(&self) -> &T {
        &self.target
    }

    /// Structure and secret phases only.
    pub async fn verify_secrets(&self, spec: &ServiceSpec) -> Result<(), ValidationReport> {
        validate_structure(spec)?;
        let mut resolver = SecretResolver::new(self.secrets.clone());
        resolver.validate_all(&spec.secrets).await
    }

    /// Everything except applying: the fully granted resource graph.
    pub async fn plan(&self, spec: &ServiceSpec) -> Result<ResourceGraph, ValidationReport> {
        validate_structure(spec)?;
        tracing::info!(service = %spec.service_name, stage = %spec.stage, "Structure validated");

        // One resolver per run; its cache never outlives this call.
        let mut resolver = SecretResolver::new(self.secrets.clone());
        resolver.validate_all(&spec.secrets).await?;
        tracing::info!(secrets = spec.secrets.len(), "Secrets validated");

        let provisioner = ResourceProvisioner::new(spec);
        let mut graph = provisioner.build_graph(&mut resolver)?;

        let permissions: BTreeMap<String, Vec<Permission>> = spec
            .functions
            .keys()
            .filter_map(|key| {
                provisioner
                    .effective_function(key)
                    .map(|f| (key.clone(), f.permissions().to_vec()))
            })
            .collect();
        PermissionGranter::new(spec).grant(&mut graph, &permissions)?;

        tracing::info!(
            nodes = graph.node_count(),
            api_edges = graph.api_edges.len(),
            grant_edges = graph.grant_edges.len(),
            "Resource graph planned"
        );
        Ok(graph)
    }

    /// Plan, then create every resource on the target.
    pub async fn run(&self, spec: &ServiceSpec) -> Result<ProvisionOutcome, ValidationReport> {
        let graph = self.plan(spec).await?;
        self.apply(graph).await.map_err(ValidationReport::from)
    }

    async fn apply(&self, graph: ResourceGraph) -> Result<ProvisionOutcome, ProvisionError> {
        let table = self
            .target
            .create_table(&graph.table)
            .await
            .map_err(|e| target_error(&graph.table.name, e))?;

        let mut compute = BTreeMap::new();
        for (key, node) in &graph.compute {
            let handle = self
                .target
                .create_function(node)
                .await
                .map_err(|e| target_error(&node.name, e))?;
            compute.insert(key.clone(), handle);
        }

        let api = self
            .target
            .create_api(&graph.api, &graph.api_edges)
            .await
            .map_err(|e| target_error(&graph.api.name, e))?;

        for (key, node) in &graph.compute {
            let Some(handle) = compute.get(key) else {
                continue;
            };
            for statement in &node.grants {
                self.target
                    .attach_grant(handle, statement)
                    .await
                    .map_err(|e| target_error(&node.name, e))?;
            }
        }

        tracing::info!(
            table = %table.name,
            functions = compute.len(),
            endpoint = %api.endpoint,
            "Provisioning complete"
        );
        Ok(ProvisionOutcome {
            graph,
            table,
            compute,
            api,
        })
    }
}

fn target_error(resource: &str, error: anyhow::Error) -> ProvisionError {
    tracing::error!(resource = %resource, error = %error, "Deployment target failed");
    ProvisionError::Target {
        resource: resource.to_string(),
        message: format!("{:#}", error),
    }
}
