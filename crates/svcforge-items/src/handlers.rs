//! The five item operations and the resolver-event entry point.

use crate::model::{CreateItemInput, Item, ItemChanges, UpdateItemInput};
use crate::store::{ItemStore, StoreError};
use chrono::Utc;
use serde::Deserialize;
use serde_json::Value;
use std::sync::Arc;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum HandlerError {
    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("invalid arguments for {field}: {source}")]
    InvalidArguments {
        field: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("no handler for field '{0}'")]
    UnknownField(String),

    #[error("failed to serialize result: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// An API call routed to a compute unit.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolverEvent {
    pub field_name: String,
    #[serde(default)]
    pub arguments: Value,
}

impl ResolverEvent {
    pub fn new(field_name: impl Into<String>, arguments: Value) -> Self {
        Self {
            field_name: field_name.into(),
            arguments,
        }
    }
}

#[derive(Deserialize)]
struct IdArgs {
    id: String,
}

#[derive(Deserialize)]
struct CreateArgs {
    input: CreateItemInput,
}

#[derive(Deserialize)]
struct UpdateArgs {
    id: String,
    #[serde(default)]
    input: UpdateItemInput,
}

pub struct ItemHandlers {
    store: Arc<dyn ItemStore>,
}

impl ItemHandlers {
    pub fn new(store: Arc<dyn ItemStore>) -> Self {
        Self { store }
    }

    pub async fn get_item(&self, id: &str) -> Result<Option<Item>, HandlerError> {
        Ok(self.store.get(id).await?)
    }

    pub async fn list_items(&self) -> Result<Vec<Item>, HandlerError> {
        Ok(self.store.scan().await?)
    }

    pub async fn create_item(&self, input: CreateItemInput) -> Result<Item, HandlerError> {
        let now = Utc::now();
        let item = Item {
            id: uuid::Uuid::new_v4().to_string(),
            name: input.name,
            description: input.description,
            created_at: now,
            updated_at: now,
        };
        self.store.put(&item).await?;
        tracing::debug!(id = %item.id, "Created item");
        Ok(item)
    }

    /// Returns `None` when no item has this id.
    pub async fn update_item(
        &self,
        id: &str,
        input: UpdateItemInput,
    ) -> Result<Option<Item>, HandlerError> {
        let changes = ItemChanges::from_input(input, Utc::now());
        Ok(self.store.update(id, &changes).await?)
    }

    pub async fn delete_item(&self, id: &str) -> Result<bool, HandlerError> {
        self.store.delete(id).await?;
        Ok(true)
    }

    /// Dispatch on the event's field name.
    pub async fn handle(&self, event: ResolverEvent) -> Result<Value, HandlerError> {
        let field = event.field_name.as_str();
        tracing::debug!(field = %field, "Handling resolver event");

        let result = match field {
            "getItem" => {
                let args: IdArgs = parse_args(field, event.arguments)?;
                serde_json::to_value(self.get_item(&args.id).await?)?
            }
            "listItems" => serde_json::to_value(self.list_items().await?)?,
            "createItem" => {
                let args: CreateArgs = parse_args(field, event.arguments)?;
                serde_json::to_value(self.create_item(args.input).await?)?
            }
            "updateItem" => {
                let args: UpdateArgs = parse_args(field, event.arguments)?;
                serde_json::to_value(self.update_item(&args.id, args.input).await?)?
            }
            "deleteItem" => {
                let args: IdArgs = parse_args(field, event.arguments)?;
                Value::Bool(self.delete_item(&args.id).await?)
            }
            other => return Err(HandlerError::UnknownField(other.to_string())),
        };
        Ok(result)
    }
}

fn parse_args<T: for<'de> Deserialize<'de>>(field: &str, arguments: Value) -> Result<T, HandlerError> {
    serde_json::from_value(arguments).map_err(|source| HandlerError::InvalidArguments {
        field: field.to_string(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::InMemoryItemStore;
    use serde_json::json;

    fn handlers() -> ItemHandlers {
        ItemHandlers::new(Arc::new(InMemoryItemStore::new()))
    }

    #[tokio::test]
    async fn test_create_sets_id_and_timestamps() {
        let handlers = handlers();
        let item = handlers
            .create_item(CreateItemInput {
                name: "lamp".to_string(),
                description: None,
            })
            .await
            .unwrap();

        assert!(uuid::Uuid::parse_str(&item.id).is_ok());
        assert_eq!(item.created_at, item.updated_at);
        assert_eq!(handlers.get_item(&item.id).await.unwrap(), Some(item));
    }

    #[tokio::test]
    async fn test_update_unknown_id_returns_none() {
        let handlers = handlers();
        let result = handlers
            .update_item("missing", UpdateItemInput::default())
            .await
            .unwrap();
        assert_eq!(result, None);
        assert!(handlers.list_items().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_delete_always_returns_true() {
        let handlers = handlers();
        assert!(handlers.delete_item("missing").await.unwrap());
    }

    #[tokio::test]
    async fn test_unknown_field_is_rejected() {
        let err = handlers()
            .handle(ResolverEvent::new("renameItem", json!({})))
            .await
            .unwrap_err();
        assert!(matches!(err, HandlerError::UnknownField(ref f) if f == "renameItem"));
    }

    #[tokio::test]
    async fn test_missing_id_is_invalid_arguments() {
        let err = handlers()
            .handle(ResolverEvent::new("getItem", json!({})))
            .await
            .unwrap_err();
        assert!(matches!(err, HandlerError::InvalidArguments { .. }));
    }
}
