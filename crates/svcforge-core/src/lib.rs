// Configuration types shared across all svcforge crates
pub mod config;
pub mod environment;
pub mod error;
pub mod graph;

// Re-export commonly used types for convenience
pub use config::{
    ApiSpec, AuthenticationType, BillingMode, BundlingOptions, ConfigError, ConfigMerger,
    FunctionSpec, KeyAttribute, Permission, RemovalPolicy, ResolverSpec, SecretSpec,
    SecretVariable, ServiceSpec, StageContext, TableSpec, VariableSource,
};
pub use environment::{EnvBinding, ResolvedEnvironment};
pub use error::{ProvisionError, ValidationReport};
pub use graph::{
    ApiEdge, ApiNode, ComputeNode, GrantEdge, GrantTarget, PolicyStatement, ResourceGraph,
    TableNode,
};

/// Deterministic resource name: `{serviceName}-{stage}-{kind}`.
pub fn resource_name(spec: &ServiceSpec, kind: &str) -> String {
    spec.resource_name(kind)
}
