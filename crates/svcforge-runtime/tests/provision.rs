//! End-to-end provisioning runs against the items service.

use async_trait::async_trait;
use pretty_assertions::assert_eq;
use std::sync::Arc;
use svcforge_core::{
    ApiEdge, ApiNode, ComputeNode, EnvBinding, GrantTarget, PolicyStatement, ProvisionError,
    ResolverSpec, ServiceSpec, StageContext, TableNode,
};
use svcforge_runtime::{
    ApiHandle, ComputeHandle, DeploymentTarget, Orchestrator, RecordingTarget, TableHandle,
    TargetCall,
};
use svcforge_secrets::InMemorySecretStore;

const ITEMS_SERVICE: &str = include_str!("../../../config/items-service.yaml");
const ACCOUNT: &str = "123456789012";

fn items_spec() -> ServiceSpec {
    let context = StageContext::new("dev").with_account(ACCOUNT);
    ServiceSpec::from_yaml(ITEMS_SERVICE, &context).unwrap()
}

fn full_store() -> Arc<InMemorySecretStore> {
    Arc::new(InMemorySecretStore::new().with_secret(
        "dev/appsync",
        [("API_KEY", "k-123"), ("DATABASE_URL", "postgres://db")],
    ))
}

#[tokio::test]
async fn test_items_service_provisions_fully() {
    let spec = items_spec();
    let orchestrator = Orchestrator::new(full_store(), RecordingTarget::new());

    let outcome = orchestrator.run(&spec).await.unwrap();
    let graph = &outcome.graph;

    assert_eq!(graph.compute.len(), 5);
    assert_eq!(graph.node_count(), 7);
    assert_eq!(graph.table.name, "appsync-lambda-svc-dev-items-table");
    assert_eq!(graph.api.name, "appsync-lambda-svc-dev-api");
    assert_eq!(graph.api_edges.len(), 5);
    assert!(outcome.api.api_key.is_some());

    let secret_arn = spec.secret_arn("dev/appsync");
    for node in graph.compute.values() {
        let secret_grants: Vec<&PolicyStatement> = node
            .grants
            .iter()
            .filter(|g| g.actions == vec!["secretsmanager:GetSecretValue".to_string()])
            .collect();
        assert_eq!(secret_grants.len(), 1, "{}", node.key);
        assert_eq!(secret_grants[0].resource_ids, vec![secret_arn.clone()]);
        assert_eq!(node.grants.len(), 2);
    }

    let get_item = &graph.compute["getItem"];
    assert_eq!(get_item.name, "appsync-lambda-svc-dev-get-item");
    assert_eq!(
        get_item.environment.get("DATABASE_URL"),
        Some(&EnvBinding::secret_ref("dev/appsync", "DATABASE_URL"))
    );
    assert_eq!(
        get_item.environment.get("STAGE"),
        Some(&EnvBinding::literal("dev"))
    );
    assert_eq!(
        graph.grants_of("getItem").map(|e| &e.target).collect::<Vec<_>>(),
        vec![
            &GrantTarget::Table,
            &GrantTarget::Secret {
                name: "dev/appsync".to_string()
            }
        ]
    );

    // 1 table + 5 functions + 1 API + 10 grants.
    assert_eq!(orchestrator.target().call_count(), 17);
    assert!(matches!(
        orchestrator.target().calls()[0],
        TargetCall::CreateTable { .. }
    ));
}

#[tokio::test]
async fn test_missing_secret_key_creates_nothing() {
    let spec = items_spec();
    let store = Arc::new(
        InMemorySecretStore::new().with_secret("dev/appsync", [("API_KEY", "k-123")]),
    );
    let orchestrator = Orchestrator::new(store, RecordingTarget::new());

    let report = orchestrator.run(&spec).await.unwrap_err();

    assert_eq!(
        report.errors,
        vec![ProvisionError::MissingSecretKey {
            secret: "dev/appsync".to_string(),
            key: "DATABASE_URL".to_string(),
        }]
    );
    assert_eq!(orchestrator.target().call_count(), 0);
}

#[tokio::test]
async fn test_dangling_resolver_creates_nothing() {
    let mut spec = items_spec();
    spec.api
        .resolvers
        .push(ResolverSpec::new("Mutation", "renameItem", "renameItem"));
    let store = full_store();
    let orchestrator = Orchestrator::new(store.clone(), RecordingTarget::new());

    let report = orchestrator.run(&spec).await.unwrap_err();

    assert_eq!(
        report.errors,
        vec![ProvisionError::UnknownDataSource {
            type_name: "Mutation".to_string(),
            field_name: "renameItem".to_string(),
            data_source: "renameItem".to_string(),
        }]
    );
    assert_eq!(orchestrator.target().call_count(), 0);
    // Structural failures stop the run before the secret store is asked.
    assert_eq!(store.lookup_count("dev/appsync"), 0);
}

#[tokio::test]
async fn test_repeated_plans_are_identical() {
    let spec = items_spec();
    let store = full_store();
    let orchestrator = Orchestrator::new(store.clone(), RecordingTarget::new());

    let first = orchestrator.plan(&spec).await.unwrap();
    let second = orchestrator.plan(&spec).await.unwrap();

    assert_eq!(first, second);
    // Each run owns its own cache: one fetch per run.
    assert_eq!(store.lookup_count("dev/appsync"), 2);
    assert_eq!(orchestrator.target().call_count(), 0);
}

#[tokio::test]
async fn test_verify_secrets_reports_without_planning() {
    let spec = items_spec();
    let orchestrator = Orchestrator::new(
        Arc::new(InMemorySecretStore::new()),
        RecordingTarget::new(),
    );

    let report = orchestrator.verify_secrets(&spec).await.unwrap_err();
    assert_eq!(
        report.errors,
        vec![ProvisionError::SecretNotFound {
            secret: "dev/appsync".to_string()
        }]
    );
}

/// Target that refuses to create compute units.
struct FailingTarget;

#[async_trait]
impl DeploymentTarget for FailingTarget {
    async fn create_table(&self, table: &TableNode) -> anyhow::Result<TableHandle> {
        Ok(TableHandle {
            name: table.name.clone(),
            arn: table.arn.clone(),
        })
    }

    async fn create_function(&self, _node: &ComputeNode) -> anyhow::Result<ComputeHandle> {
        anyhow::bail!("quota exceeded")
    }

    async fn create_api(&self, _api: &ApiNode, _edges: &[ApiEdge]) -> anyhow::Result<ApiHandle> {
        anyhow::bail!("unreachable in this test")
    }

    async fn attach_grant(
        &self,
        _compute: &ComputeHandle,
        _statement: &PolicyStatement,
    ) -> anyhow::Result<()> {
        Ok(())
    }
}

#[tokio::test]
async fn test_target_failure_aborts_run() {
    let spec = items_spec();
    let orchestrator = Orchestrator::new(full_store(), FailingTarget);

    let report = orchestrator.run(&spec).await.unwrap_err();

    assert_eq!(report.len(), 1);
    assert!(matches!(
        &report.errors[0],
        ProvisionError::Target { message, .. } if message == "quota exceeded"
    ));
}
