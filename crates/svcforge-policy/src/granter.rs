//! Grant synthesis for compute nodes.
//!
//! Each compute node receives exactly:
//!
//! 1. one statement per declared [`Permission`], scoped to its actions and
//!    resource ids (`${table}` resolves to the service's table), and
//! 2. one secret-read statement per secret its environment references,
//!    scoped to that single secret.
//!
//! Nothing else is attached. Identical statements are attached once.

use std::collections::{BTreeMap, BTreeSet};
use svcforge_core::{
    ComputeNode, GrantEdge, GrantTarget, Permission, PolicyStatement, ProvisionError,
    ResourceGraph, ServiceSpec,
};

/// Action granted on every secret a function's environment references.
pub const SECRET_READ_ACTION: &str = "secretsmanager:GetSecretValue";

/// Resource id that refers to the service's own table.
pub const TABLE_PLACEHOLDER: &str = "${table}";

/// Computes and attaches grants.
pub struct PermissionGranter<'a> {
    spec: &'a ServiceSpec,
}

impl<'a> PermissionGranter<'a> {
    pub fn new(spec: &'a ServiceSpec) -> Self {
        Self { spec }
    }

    /// Check declared permissions for shapes that cannot become a statement.
    pub fn validate_permissions(function: &str, permissions: &[Permission]) -> Vec<ProvisionError> {
        let mut errors = Vec::new();
        for (idx, permission) in permissions.iter().enumerate() {
            if permission.actions.iter().all(|a| a.trim().is_empty()) {
                errors.push(ProvisionError::InvalidPermission {
                    function: function.to_string(),
                    reason: format!("permission #{} lists no actions", idx + 1),
                });
            }
            if permission.resource_ids.iter().all(|r| r.trim().is_empty()) {
                errors.push(ProvisionError::InvalidPermission {
                    function: function.to_string(),
                    reason: format!("permission #{} lists no resource ids", idx + 1),
                });
            }
        }
        errors
    }

    /// Statements and edges for one compute node.
    pub fn statements_for(
        &self,
        table_arn: &str,
        node: &ComputeNode,
        permissions: &[Permission],
    ) -> Result<(Vec<PolicyStatement>, Vec<GrantEdge>), ProvisionError> {
        let errors = Self::validate_permissions(&node.key, permissions);
        if let Some(first) = errors.into_iter().next() {
            return Err(first);
        }

        let mut statements = Vec::new();
        let mut seen = BTreeSet::new();
        let mut edges = BTreeSet::new();

        for permission in permissions {
            let resource_ids: Vec<String> = permission
                .resource_ids
                .iter()
                .map(|id| self.resolve_resource_id(table_arn, id))
                .collect();

            for (raw, resolved) in permission.resource_ids.iter().zip(&resource_ids) {
                edges.insert(GrantEdge {
                    function: node.key.clone(),
                    target: self.target_of(raw, resolved),
                    actions: permission.actions.clone(),
                });
            }

            let statement = PolicyStatement::allow(permission.actions.clone(), resource_ids);
            if seen.insert(statement.clone()) {
                statements.push(statement);
            }
        }

        for secret in node.environment.referenced_secrets() {
            let statement = PolicyStatement::allow(
                vec![SECRET_READ_ACTION.to_string()],
                vec![self.spec.secret_arn(secret)],
            );
            if seen.insert(statement.clone()) {
                statements.push(statement);
            }
            edges.insert(GrantEdge {
                function: node.key.clone(),
                target: GrantTarget::Secret {
                    name: secret.to_string(),
                },
                actions: vec![SECRET_READ_ACTION.to_string()],
            });
        }

        Ok((statements, edges.into_iter().collect()))
    }

    /// Attach grants to every compute node in the graph.
    ///
    /// Replaces grants from any earlier call, so granting twice yields the
    /// same graph.
    pub fn grant(
        &self,
        graph: &mut ResourceGraph,
        function_permissions: &BTreeMap<String, Vec<Permission>>,
    ) -> Result<(), ProvisionError> {
        let table_arn = graph.table.arn.clone();
        let mut grant_edges = Vec::new();

        for (key, node) in graph.compute.iter_mut() {
            let permissions = function_permissions
                .get(key)
                .map(Vec::as_slice)
                .unwrap_or(&[]);
            let (statements, edges) = self.statements_for(&table_arn, node, permissions)?;

            tracing::debug!(
                function = %key,
                statements = statements.len(),
                "Attached grants"
            );
            node.grants = statements;
            grant_edges.extend(edges);
        }

        graph.grant_edges = grant_edges;
        Ok(())
    }

    fn resolve_resource_id(&self, table_arn: &str, id: &str) -> String {
        if id == TABLE_PLACEHOLDER {
            table_arn.to_string()
        } else {
            id.to_string()
        }
    }

    fn target_of(&self, raw: &str, resolved: &str) -> GrantTarget {
        if raw == TABLE_PLACEHOLDER || resolved == self.spec.table_arn() {
            return GrantTarget::Table;
        }
        match self
            .spec
            .secrets
            .iter()
            .find(|s| self.spec.secret_arn(&s.name) == resolved)
        {
            Some(secret) => GrantTarget::Secret {
                name: secret.name.clone(),
            },
            None => GrantTarget::External {
                resource_id: resolved.to_string(),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use svcforge_core::config::{ApiSpec, AttributeType, BillingMode, TableSpec};
    use svcforge_core::{
        BundlingOptions, EnvBinding, KeyAttribute, RemovalPolicy, ResolvedEnvironment, TableNode,
    };
    use svcforge_core::graph::ApiNode;

    fn spec() -> ServiceSpec {
        ServiceSpec {
            service_name: "items".to_string(),
            stage: "dev".to_string(),
            region: "us-east-1".to_string(),
            account: "123456789012".to_string(),
            tags: BTreeMap::new(),
            table: TableSpec {
                logical_name: "table".to_string(),
                partition_key: KeyAttribute {
                    name: "id".to_string(),
                    attr_type: AttributeType::String,
                },
                sort_key: None,
                billing_mode: BillingMode::PayPerRequest,
                capacity: None,
                removal_policy: None,
            },
            api: ApiSpec {
                name: "api".to_string(),
                schema: "schema.graphql".to_string(),
                authentication: Default::default(),
                api_key_expiry_days: None,
                log_level: None,
                xray_enabled: false,
                resolvers: vec![],
            },
            functions: BTreeMap::new(),
            secrets: vec![svcforge_core::SecretSpec::new("dev/app")],
            default_function: None,
        }
    }

    fn node(key: &str, environment: ResolvedEnvironment) -> ComputeNode {
        ComputeNode {
            key: key.to_string(),
            name: format!("items-dev-{}", key),
            entry: "x.ts".to_string(),
            handler: "handler".to_string(),
            runtime: "nodejs20.x".to_string(),
            timeout_seconds: 30,
            memory_size: 256,
            log_retention_days: None,
            bundling: BundlingOptions::default(),
            environment,
            tags: BTreeMap::new(),
            grants: vec![],
        }
    }

    fn graph(spec: &ServiceSpec, nodes: Vec<ComputeNode>) -> ResourceGraph {
        ResourceGraph {
            table: TableNode {
                name: spec.table_name(),
                arn: spec.table_arn(),
                partition_key: spec.table.partition_key.clone(),
                sort_key: None,
                billing_mode: BillingMode::PayPerRequest,
                capacity: None,
                removal_policy: RemovalPolicy::Retain,
                tags: BTreeMap::new(),
            },
            compute: nodes.into_iter().map(|n| (n.key.clone(), n)).collect(),
            api: ApiNode {
                name: spec.resource_name("api"),
                schema: "schema.graphql".to_string(),
                authentication: Default::default(),
                api_key_expiry_days: None,
                log_level: None,
                xray_enabled: false,
                tags: BTreeMap::new(),
            },
            api_edges: vec![],
            grant_edges: vec![],
        }
    }

    fn secret_env() -> ResolvedEnvironment {
        let mut env = ResolvedEnvironment::new();
        env.insert("API_KEY", EnvBinding::secret_ref("dev/app", "API_KEY"));
        env.insert("STAGE", EnvBinding::literal("dev"));
        env
    }

    #[test]
    fn test_grants_are_union_of_declared_and_secret_read() {
        let spec = spec();
        let mut graph = graph(&spec, vec![node("getItem", secret_env())]);
        let perms = BTreeMap::from([(
            "getItem".to_string(),
            vec![Permission::new(["dynamodb:GetItem"], [TABLE_PLACEHOLDER])],
        )]);

        PermissionGranter::new(&spec).grant(&mut graph, &perms).unwrap();

        assert_eq!(
            graph.compute["getItem"].grants,
            vec![
                PolicyStatement::allow(
                    vec!["dynamodb:GetItem".to_string()],
                    vec![spec.table_arn()]
                ),
                PolicyStatement::allow(
                    vec![SECRET_READ_ACTION.to_string()],
                    vec![spec.secret_arn("dev/app")]
                ),
            ]
        );
        assert_eq!(
            graph.grant_edges,
            vec![
                GrantEdge {
                    function: "getItem".to_string(),
                    target: GrantTarget::Table,
                    actions: vec!["dynamodb:GetItem".to_string()],
                },
                GrantEdge {
                    function: "getItem".to_string(),
                    target: GrantTarget::Secret {
                        name: "dev/app".to_string()
                    },
                    actions: vec![SECRET_READ_ACTION.to_string()],
                },
            ]
        );
    }

    #[test]
    fn test_no_permissions_no_secrets_means_no_grants() {
        let spec = spec();
        let mut graph = graph(&spec, vec![node("ping", ResolvedEnvironment::new())]);

        PermissionGranter::new(&spec)
            .grant(&mut graph, &BTreeMap::new())
            .unwrap();

        assert!(graph.compute["ping"].grants.is_empty());
        assert!(graph.grant_edges.is_empty());
    }

    #[test]
    fn test_duplicate_permissions_attach_once() {
        let spec = spec();
        let mut graph = graph(&spec, vec![node("getItem", ResolvedEnvironment::new())]);
        let permission = Permission::new(["dynamodb:GetItem"], [TABLE_PLACEHOLDER]);
        let perms = BTreeMap::from([(
            "getItem".to_string(),
            vec![permission.clone(), permission],
        )]);

        PermissionGranter::new(&spec).grant(&mut graph, &perms).unwrap();
        assert_eq!(graph.compute["getItem"].grants.len(), 1);
        assert_eq!(graph.grant_edges.len(), 1);
    }

    #[test]
    fn test_granting_twice_is_stable() {
        let spec = spec();
        let mut graph = graph(&spec, vec![node("getItem", secret_env())]);
        let granter = PermissionGranter::new(&spec);

        granter.grant(&mut graph, &BTreeMap::new()).unwrap();
        let first = graph.clone();
        granter.grant(&mut graph, &BTreeMap::new()).unwrap();
        assert_eq!(first, graph);
    }

    #[test]
    fn test_external_resource_ids_pass_through() {
        let spec = spec();
        let mut graph = graph(&spec, vec![node("audit", ResolvedEnvironment::new())]);
        let perms = BTreeMap::from([(
            "audit".to_string(),
            vec![Permission::new(
                ["sqs:SendMessage"],
                ["arn:aws:sqs:us-east-1:123456789012:audit"],
            )],
        )]);

        PermissionGranter::new(&spec).grant(&mut graph, &perms).unwrap();
        assert_eq!(
            graph.grant_edges[0].target,
            GrantTarget::External {
                resource_id: "arn:aws:sqs:us-east-1:123456789012:audit".to_string()
            }
        );
    }

    #[test]
    fn test_empty_permission_is_rejected() {
        let errors = PermissionGranter::validate_permissions(
            "getItem",
            &[Permission::new(Vec::<String>::new(), [TABLE_PLACEHOLDER])],
        );
        assert_eq!(errors.len(), 1);
        assert!(matches!(errors[0], ProvisionError::InvalidPermission { .. }));
    }
}
