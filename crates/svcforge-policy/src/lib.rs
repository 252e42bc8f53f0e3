//! svcforge access grants.
//!
//! Compute nodes get least-privilege statements only: what their function
//! declares, plus read access to each secret their environment references.
//! The set of nodes comes from the resource graph built during provisioning,
//! never from inspecting arbitrary structures.

pub mod granter;

pub use granter::{PermissionGranter, SECRET_READ_ACTION, TABLE_PLACEHOLDER};
