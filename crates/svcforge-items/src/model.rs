use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A stored item, keyed by `id`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Item {
    pub id: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct CreateItemInput {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Deserialize)]
pub struct UpdateItemInput {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
}

/// Field changes applied by a single update.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ItemChanges {
    /// Only set for a non-empty name.
    pub name: Option<String>,
    pub description: Option<String>,
    pub updated_at: DateTime<Utc>,
}

impl ItemChanges {
    pub fn from_input(input: UpdateItemInput, now: DateTime<Utc>) -> Self {
        Self {
            name: input.name.filter(|n| !n.is_empty()),
            description: input.description,
            updated_at: now,
        }
    }

    pub fn apply(&self, item: &mut Item) {
        if let Some(name) = &self.name {
            item.name = name.clone();
        }
        if let Some(description) = &self.description {
            item.description = Some(description.clone());
        }
        item.updated_at = self.updated_at;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_name_is_not_a_change() {
        let changes = ItemChanges::from_input(
            UpdateItemInput {
                name: Some(String::new()),
                description: Some("d".to_string()),
            },
            Utc::now(),
        );
        assert_eq!(changes.name, None);
        assert_eq!(changes.description.as_deref(), Some("d"));
    }

    #[test]
    fn test_item_serializes_camel_case() {
        let now = Utc::now();
        let item = Item {
            id: "1".to_string(),
            name: "n".to_string(),
            description: None,
            created_at: now,
            updated_at: now,
        };
        let json = serde_json::to_value(&item).unwrap();
        assert!(json.get("createdAt").is_some());
        assert!(json.get("description").is_none());
    }
}
