// ABOUTME: Composable filters over the tags table
// ABOUTME: Category, exact name and name-set restrictions with deterministic first-match

use sqlx::{Executor, QueryBuilder, Sqlite};
use tracing::debug;

use crate::error::{TagError, TagResult};
use crate::types::Tag;
use polytag_storage::{StorageError, StorageResult};

/// Filter builder for tag lookups.
///
/// Filters compose: `TagQuery::new().category(Some("work")).name("Urgent")`
/// matches only tags named exactly `Urgent` in category `work`. A `None`
/// category leaves the category unconstrained.
#[derive(Debug, Clone, Default)]
pub struct TagQuery<'a> {
    category: Option<&'a str>,
    name: Option<&'a str>,
    names: Option<&'a [String]>,
}

impl<'a> TagQuery<'a> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Restrict to a category; `None` does not filter
    pub fn category(mut self, category: Option<&'a str>) -> Self {
        self.category = category;
        self
    }

    /// Restrict to an exact name
    pub fn name(mut self, name: &'a str) -> Self {
        self.name = Some(name);
        self
    }

    /// Restrict to any of the given exact names
    pub fn names(mut self, names: &'a [String]) -> Self {
        self.names = Some(names);
        self
    }

    fn build(&self, order_by: &str) -> QueryBuilder<'a, Sqlite> {
        let mut builder = QueryBuilder::new(
            "SELECT id, name, category, description, created_at FROM tags WHERE 1 = 1",
        );

        if let Some(category) = self.category {
            builder.push(" AND category = ");
            builder.push_bind(category);
        }
        if let Some(name) = self.name {
            builder.push(" AND name = ");
            builder.push_bind(name);
        }
        if let Some(names) = self.names {
            builder.push(" AND name IN (");
            let mut separated = builder.separated(", ");
            for name in names {
                separated.push_bind(name.as_str());
            }
            separated.push_unseparated(")");
        }

        builder.push(" ORDER BY ");
        builder.push(order_by);
        builder
    }

    /// All matching tags ordered by name
    pub async fn get<'e, E>(&self, executor: E) -> StorageResult<Vec<Tag>>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        if matches!(self.names, Some(names) if names.is_empty()) {
            return Ok(Vec::new());
        }

        debug!("Fetching tags matching {:?}", self);

        let mut builder = self.build("name, id");
        builder
            .build_query_as::<Tag>()
            .fetch_all(executor)
            .await
            .map_err(StorageError::Sqlx)
    }

    /// The lowest-id matching tag, if any
    pub async fn first<'e, E>(&self, executor: E) -> StorageResult<Option<Tag>>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        if matches!(self.names, Some(names) if names.is_empty()) {
            return Ok(None);
        }

        debug!("Fetching first tag matching {:?}", self);

        let mut builder = self.build("id LIMIT 1");
        builder
            .build_query_as::<Tag>()
            .fetch_optional(executor)
            .await
            .map_err(StorageError::Sqlx)
    }

    /// Like [`TagQuery::first`], but a miss is a `TagNotFound` error
    pub async fn first_or_fail<'e, E>(&self, executor: E) -> TagResult<Tag>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        self.first(executor).await?.ok_or_else(|| TagError::TagNotFound {
            name: self
                .name
                .map(str::to_string)
                .or_else(|| self.names.map(|names| names.join(", ")))
                .unwrap_or_default(),
            category: self.category.map(str::to_string),
        })
    }
}
