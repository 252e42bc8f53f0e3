//! svcforge secret handling.
//!
//! Validates that the secret documents a service declares exist in the backing
//! store with every key the service needs, and turns function environments
//! into reference bindings the deployment target resolves later.

pub mod resolver;
pub mod store;

pub use resolver::{referenced_secrets, SecretHandle, SecretResolver};
pub use store::{
    FileSecretStore, InMemorySecretStore, SecretDocument, SecretStore, SecretStoreError,
};
