// ABOUTME: Tag type definitions
// ABOUTME: Tag records, create/update inputs, loose tag references and sync results

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct Tag {
    pub id: i64,
    pub name: String,
    pub category: Option<String>,
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TagCreateInput {
    pub name: String,
    pub category: Option<String>,
    pub description: Option<String>,
}

impl TagCreateInput {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    pub fn category(mut self, category: impl Into<String>) -> Self {
        self.category = Some(category.into());
        self
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TagUpdateInput {
    pub name: Option<String>,
    pub category: Option<String>,
    pub description: Option<String>,
}

/// A loose reference to one or more tags.
///
/// Ids are used as-is; names are resolved against the tags table together
/// with the category passed alongside the reference.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TagRef {
    Id(i64),
    Name(String),
    Many(Vec<TagRef>),
}

impl TagRef {
    /// Flatten nested collections into single id/name references, preserving order
    pub fn into_leaves(self) -> Vec<TagKey> {
        let mut leaves = Vec::new();
        let mut stack = vec![self];

        while let Some(item) = stack.pop() {
            match item {
                TagRef::Id(id) => leaves.push(TagKey::Id(id)),
                TagRef::Name(name) => leaves.push(TagKey::Name(name)),
                TagRef::Many(items) => stack.extend(items.into_iter().rev()),
            }
        }

        leaves
    }
}

/// A single tag reference: one id or one name
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TagKey {
    Id(i64),
    Name(String),
}

impl From<i64> for TagRef {
    fn from(id: i64) -> Self {
        TagRef::Id(id)
    }
}

impl From<&str> for TagRef {
    fn from(name: &str) -> Self {
        TagRef::Name(name.to_string())
    }
}

impl From<String> for TagRef {
    fn from(name: String) -> Self {
        TagRef::Name(name)
    }
}

impl From<&String> for TagRef {
    fn from(name: &String) -> Self {
        TagRef::Name(name.clone())
    }
}

impl From<&Tag> for TagRef {
    fn from(tag: &Tag) -> Self {
        TagRef::Id(tag.id)
    }
}

impl<T: Into<TagRef>> From<Vec<T>> for TagRef {
    fn from(items: Vec<T>) -> Self {
        TagRef::Many(items.into_iter().map(Into::into).collect())
    }
}

impl<T: Into<TagRef>, const N: usize> From<[T; N]> for TagRef {
    fn from(items: [T; N]) -> Self {
        TagRef::Many(items.into_iter().map(Into::into).collect())
    }
}

/// Identifies one taggable record in the association table
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AssociationKey {
    pub taggable_type: String,
    pub taggable_id: i64,
}

impl AssociationKey {
    pub fn new(taggable_type: impl Into<String>, taggable_id: i64) -> Self {
        Self {
            taggable_type: taggable_type.into(),
            taggable_id,
        }
    }
}

/// Outcome of replacing an entity's association set
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncChanges {
    pub attached: Vec<i64>,
    pub detached: Vec<i64>,
}

impl SyncChanges {
    pub fn is_empty(&self) -> bool {
        self.attached.is_empty() && self.detached.is_empty()
    }
}
