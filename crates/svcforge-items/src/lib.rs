//! Item CRUD operations.
//!
//! Each operation performs exactly one storage call and returns the affected
//! record(s), a boolean, or null. Storage failures propagate unchanged.

pub mod handlers;
pub mod model;
pub mod store;

pub use handlers::{HandlerError, ItemHandlers, ResolverEvent};
pub use model::{CreateItemInput, Item, ItemChanges, UpdateItemInput};
pub use store::{InMemoryItemStore, ItemStore, StoreError};
