//! svcforge provisioning runtime.
//!
//! Validates a service's structure, builds its resource graph, attaches
//! grants, and applies the result to a [`DeploymentTarget`]. Nothing reaches
//! the target unless every earlier phase succeeded.

pub mod orchestrator;
pub mod provisioner;
pub mod target;
pub mod validate;

pub use orchestrator::{Orchestrator, ProvisionOutcome};
pub use provisioner::ResourceProvisioner;
pub use target::{
    ApiHandle, ComputeHandle, DeploymentTarget, RecordingTarget, TableHandle, TargetCall,
};
pub use validate::validate_structure;
