use async_trait::async_trait;
use serde::Serialize;
use std::sync::RwLock;
use svcforge_core::{ApiEdge, ApiNode, AuthenticationType, ComputeNode, PolicyStatement, TableNode};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TableHandle {
    pub name: String,
    pub arn: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ComputeHandle {
    pub key: String,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ApiHandle {
    pub name: String,
    /// Endpoint URL of the deployed API.
    pub endpoint: String,
    /// Present for api-key authentication only.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
}

/// The system that actually creates resources.
///
/// Secret references in a compute node's environment are resolved by the
/// target when it creates the unit.
#[async_trait]
pub trait DeploymentTarget: Send + Sync {
    async fn create_table(&self, table: &TableNode) -> anyhow::Result<TableHandle>;

    async fn create_function(&self, node: &ComputeNode) -> anyhow::Result<ComputeHandle>;

    async fn create_api(&self, api: &ApiNode, edges: &[ApiEdge]) -> anyhow::Result<ApiHandle>;

    async fn attach_grant(
        &self,
        compute: &ComputeHandle,
        statement: &PolicyStatement,
    ) -> anyhow::Result<()>;
}

/// One call received by a [`RecordingTarget`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "call", rename_all = "snake_case")]
pub enum TargetCall {
    CreateTable { name: String },
    CreateFunction { name: String },
    CreateApi { name: String, edges: usize },
    AttachGrant {
        function: String,
        actions: Vec<String>,
        resource_ids: Vec<String>,
    },
}

/// Target that creates nothing and records every call, in order.
///
/// Used for dry runs (`svcforge plan`) and tests.
#[derive(Debug, Default)]
pub struct RecordingTarget {
    calls: RwLock<Vec<TargetCall>>,
}

impl RecordingTarget {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn calls(&self) -> Vec<TargetCall> {
        self.calls.read().map(|c| c.clone()).unwrap_or_default()
    }

    pub fn call_count(&self) -> usize {
        self.calls.read().map(|c| c.len()).unwrap_or(0)
    }

    fn record(&self, call: TargetCall) -> anyhow::Result<()> {
        let mut calls = self
            .calls
            .write()
            .map_err(|_| anyhow::anyhow!("recording target lock poisoned"))?;
        calls.push(call);
        Ok(())
    }
}

#[async_trait]
impl DeploymentTarget for RecordingTarget {
    async fn create_table(&self, table: &TableNode) -> anyhow::Result<TableHandle> {
        self.record(TargetCall::CreateTable {
            name: table.name.clone(),
        })?;
        Ok(TableHandle {
            name: table.name.clone(),
            arn: table.arn.clone(),
        })
    }

    async fn create_function(&self, node: &ComputeNode) -> anyhow::Result<ComputeHandle> {
        self.record(TargetCall::CreateFunction {
            name: node.name.clone(),
        })?;
        Ok(ComputeHandle {
            key: node.key.clone(),
            name: node.name.clone(),
        })
    }

    async fn create_api(&self, api: &ApiNode, edges: &[ApiEdge]) -> anyhow::Result<ApiHandle> {
        self.record(TargetCall::CreateApi {
            name: api.name.clone(),
            edges: edges.len(),
        })?;
        let api_key = match api.authentication {
            AuthenticationType::ApiKey => Some(format!("dry-run-key-{}", api.name)),
            _ => None,
        };
        Ok(ApiHandle {
            name: api.name.clone(),
            endpoint: format!("dry-run://{}/graphql", api.name),
            api_key,
        })
    }

    async fn attach_grant(
        &self,
        compute: &ComputeHandle,
        statement: &PolicyStatement,
    ) -> anyhow::Result<()> {
        self.record(TargetCall::AttachGrant {
            function: compute.name.clone(),
            actions: statement.actions.clone(),
            resource_ids: statement.resource_ids.clone(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    #[tokio::test]
    async fn test_recording_target_keeps_call_order() {
        let target = RecordingTarget::new();
        let api = ApiNode {
            name: "svc-dev-api".to_string(),
            schema: "schema.graphql".to_string(),
            authentication: AuthenticationType::ApiKey,
            api_key_expiry_days: Some(365),
            log_level: None,
            xray_enabled: false,
            tags: BTreeMap::new(),
        };

        let handle = target.create_api(&api, &[]).await.unwrap();
        let compute = ComputeHandle {
            key: "getItem".to_string(),
            name: "svc-dev-get-item".to_string(),
        };
        target
            .attach_grant(
                &compute,
                &PolicyStatement::allow(vec!["dynamodb:GetItem".to_string()], vec!["t".to_string()]),
            )
            .await
            .unwrap();

        assert_eq!(handle.api_key.as_deref(), Some("dry-run-key-svc-dev-api"));
        assert_eq!(target.call_count(), 2);
        assert!(matches!(target.calls()[0], TargetCall::CreateApi { edges: 0, .. }));
    }

    #[tokio::test]
    async fn test_iam_api_has_no_key() {
        let target = RecordingTarget::new();
        let api = ApiNode {
            name: "svc-dev-api".to_string(),
            schema: "schema.graphql".to_string(),
            authentication: AuthenticationType::Iam,
            api_key_expiry_days: None,
            log_level: None,
            xray_enabled: true,
            tags: BTreeMap::new(),
        };
        let handle = target.create_api(&api, &[]).await.unwrap();
        assert_eq!(handle.api_key, None);
    }
}
