// ABOUTME: Tagger service, the public API for tagging records
// ABOUTME: Resolves loose tag references and drives the association store on behalf of callers

use std::sync::Arc;

use chrono::Utc;
use sqlx::{QueryBuilder, Sqlite, SqlitePool};
use tracing::{debug, warn};

use crate::associations::AssociationStore;
use crate::error::{TagError, TagResult};
use crate::query::TagQuery;
use crate::taggable::{Taggable, TaggableRegistry, TaggedEntity};
use crate::types::{SyncChanges, Tag, TagCreateInput, TagKey, TagRef, TagUpdateInput};
use polytag_storage::StorageError;

/// Tag manager.
///
/// Holds no state besides the pool handle and the type registry, so it is
/// cheap to clone and can be built once at startup and shared.
#[derive(Clone, Debug)]
pub struct Tagger {
    pool: SqlitePool,
    registry: Arc<TaggableRegistry>,
}

impl Tagger {
    pub fn new(pool: SqlitePool, registry: TaggableRegistry) -> Self {
        Self {
            pool,
            registry: Arc::new(registry),
        }
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    pub fn registry(&self) -> &TaggableRegistry {
        &self.registry
    }

    /// Association store scoped to one record
    pub fn associations<T: Taggable + ?Sized>(&self, entity: &T) -> AssociationStore<'_> {
        AssociationStore::new(&self.pool, entity.association_key())
    }

    /// Tag a record by id, name, or a collection of either.
    ///
    /// Names are looked up within `category` and must exist; ids are attached
    /// without a lookup.
    pub async fn tag<T: Taggable + ?Sized>(
        &self,
        entity: &T,
        tag: impl Into<TagRef>,
        category: Option<&str>,
    ) -> TagResult<()> {
        for leaf in tag.into().into_leaves() {
            match leaf {
                TagKey::Id(id) => {
                    self.tag_with_id(entity, id).await?;
                }
                TagKey::Name(name) => {
                    self.tag_with_name(entity, &name, category).await?;
                }
            }
        }

        Ok(())
    }

    /// Attach a tag by id. Returns false if the record already had it.
    pub async fn tag_with_id<T: Taggable + ?Sized>(&self, entity: &T, id: i64) -> TagResult<bool> {
        Ok(self.associations(entity).attach(id).await?)
    }

    pub async fn tag_with_name<T: Taggable + ?Sized>(
        &self,
        entity: &T,
        name: &str,
        category: Option<&str>,
    ) -> TagResult<bool> {
        let tag = TagQuery::new()
            .category(category)
            .name(name)
            .first_or_fail(&self.pool)
            .await?;

        self.tag_with_id(entity, tag.id).await
    }

    /// Tag a record, creating the tag first if no (name, category) match exists.
    ///
    /// Attach is idempotent, so repeating the call for the same record reuses
    /// the tag and leaves a single association row. Two concurrent callers can
    /// both miss the lookup and create duplicate tags.
    pub async fn tag_or_create<T: Taggable + ?Sized>(
        &self,
        entity: &T,
        name: &str,
        category: Option<&str>,
        description: Option<&str>,
    ) -> TagResult<Tag> {
        let existing = TagQuery::new()
            .category(category)
            .name(name)
            .first(&self.pool)
            .await?;

        let tag = match existing {
            Some(tag) => tag,
            None => {
                self.create_tag(TagCreateInput {
                    name: name.to_string(),
                    category: category.map(str::to_string),
                    description: description.map(str::to_string),
                })
                .await?
            }
        };

        self.tag_with_id(entity, tag.id).await?;
        Ok(tag)
    }

    /// Remove tags from a record; mirror of [`Tagger::tag`]
    pub async fn untag<T: Taggable + ?Sized>(
        &self,
        entity: &T,
        tag: impl Into<TagRef>,
        category: Option<&str>,
    ) -> TagResult<()> {
        for leaf in tag.into().into_leaves() {
            match leaf {
                TagKey::Id(id) => {
                    self.untag_with_id(entity, id).await?;
                }
                TagKey::Name(name) => {
                    self.untag_with_name(entity, &name, category).await?;
                }
            }
        }

        Ok(())
    }

    pub async fn untag_with_id<T: Taggable + ?Sized>(&self, entity: &T, id: i64) -> TagResult<u64> {
        Ok(self.associations(entity).detach(id).await?)
    }

    pub async fn untag_with_name<T: Taggable + ?Sized>(
        &self,
        entity: &T,
        name: &str,
        category: Option<&str>,
    ) -> TagResult<u64> {
        let tag = TagQuery::new()
            .category(category)
            .name(name)
            .first_or_fail(&self.pool)
            .await?;

        self.untag_with_id(entity, tag.id).await
    }

    /// Replace a record's tags with the tags carrying the given names.
    ///
    /// Names match in any category and unknown names are skipped silently.
    pub async fn sync_tags<T, S>(&self, entity: &T, names: &[S]) -> TagResult<SyncChanges>
    where
        T: Taggable + ?Sized,
        S: AsRef<str>,
    {
        let names: Vec<String> = names.iter().map(|n| n.as_ref().to_string()).collect();
        let tag_ids: Vec<i64> = TagQuery::new()
            .names(&names)
            .get(&self.pool)
            .await?
            .into_iter()
            .map(|tag| tag.id)
            .collect();

        let changes = self.associations(entity).sync(&tag_ids).await?;

        debug!(
            "Synced {}#{}: attached {:?}, detached {:?}",
            entity.taggable_type(),
            entity.taggable_id(),
            changes.attached,
            changes.detached
        );

        Ok(changes)
    }

    /// Insert a new tag; chainable
    pub async fn create(
        &self,
        name: &str,
        category: Option<&str>,
        description: Option<&str>,
    ) -> TagResult<&Self> {
        self.create_tag(TagCreateInput {
            name: name.to_string(),
            category: category.map(str::to_string),
            description: description.map(str::to_string),
        })
        .await?;

        Ok(self)
    }

    /// Insert a new tag and return it
    pub async fn create_tag(&self, input: TagCreateInput) -> TagResult<Tag> {
        debug!(
            "Creating tag: {} (category: {:?})",
            input.name, input.category
        );

        let tag = sqlx::query_as::<_, Tag>(
            r#"
            INSERT INTO tags (name, category, description, created_at)
            VALUES (?, ?, ?, ?)
            RETURNING id, name, category, description, created_at
            "#,
        )
        .bind(&input.name)
        .bind(&input.category)
        .bind(&input.description)
        .bind(Utc::now())
        .fetch_one(&self.pool)
        .await
        .map_err(StorageError::Sqlx)?;

        Ok(tag)
    }

    /// Update the provided fields of a tag
    pub async fn update_tag(&self, id: i64, input: TagUpdateInput) -> TagResult<Tag> {
        debug!("Updating tag: {}", id);

        if input.name.is_none() && input.category.is_none() && input.description.is_none() {
            return self.find(id).await;
        }

        let mut builder: QueryBuilder<Sqlite> = QueryBuilder::new("UPDATE tags SET ");
        let mut fields = builder.separated(", ");

        if let Some(name) = input.name {
            fields.push("name = ");
            fields.push_bind_unseparated(name);
        }
        if let Some(category) = input.category {
            fields.push("category = ");
            fields.push_bind_unseparated(category);
        }
        if let Some(description) = input.description {
            fields.push("description = ");
            fields.push_bind_unseparated(description);
        }

        builder.push(" WHERE id = ");
        builder.push_bind(id);

        let result = builder
            .build()
            .execute(&self.pool)
            .await
            .map_err(StorageError::Sqlx)?;

        if result.rows_affected() == 0 {
            return Err(TagError::TagIdNotFound(id));
        }

        self.find(id).await
    }

    /// Get a tag by id
    pub async fn find(&self, id: i64) -> TagResult<Tag> {
        debug!("Fetching tag: {}", id);

        sqlx::query_as::<_, Tag>(
            "SELECT id, name, category, description, created_at FROM tags WHERE id = ?",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(StorageError::Sqlx)?
        .ok_or(TagError::TagIdNotFound(id))
    }

    /// First tag with this name in `category` (any category when `None`)
    pub async fn find_by_name(&self, name: &str, category: Option<&str>) -> TagResult<Option<Tag>> {
        Ok(TagQuery::new()
            .category(category)
            .name(name)
            .first(&self.pool)
            .await?)
    }

    /// All tags, optionally restricted to one category, ordered by name
    pub async fn list_tags(&self, category: Option<&str>) -> TagResult<Vec<Tag>> {
        Ok(TagQuery::new().category(category).get(&self.pool).await?)
    }

    /// Tags currently attached to a record, ordered by name
    pub async fn tags_for<T: Taggable + ?Sized>(&self, entity: &T) -> TagResult<Vec<Tag>> {
        debug!(
            "Fetching tags of {}#{}",
            entity.taggable_type(),
            entity.taggable_id()
        );

        let tags = sqlx::query_as::<_, Tag>(
            r#"
            SELECT t.id, t.name, t.category, t.description, t.created_at
            FROM tags t
            INNER JOIN taggables tg ON tg.tag_id = t.id
            WHERE tg.taggable_type = ? AND tg.taggable_id = ?
            ORDER BY t.name, t.id
            "#,
        )
        .bind(entity.taggable_type())
        .bind(entity.taggable_id())
        .fetch_all(&self.pool)
        .await
        .map_err(StorageError::Sqlx)?;

        Ok(tags)
    }

    /// Delete tags and every association pointing at them.
    ///
    /// All referenced tags are resolved and removed in one transaction, so a
    /// missing element leaves every tag in place. Returns the number of tag
    /// rows removed. Tagged records themselves are never touched.
    pub async fn delete(&self, tag: impl Into<TagRef>, category: Option<&str>) -> TagResult<u64> {
        let mut tx = self.pool.begin().await.map_err(StorageError::Sqlx)?;
        let mut deleted = 0;

        for leaf in tag.into().into_leaves() {
            let tag = match leaf {
                TagKey::Id(id) => sqlx::query_as::<_, Tag>(
                    "SELECT id, name, category, description, created_at FROM tags WHERE id = ?",
                )
                .bind(id)
                .fetch_optional(&mut *tx)
                .await
                .map_err(StorageError::Sqlx)?
                .ok_or(TagError::TagIdNotFound(id))?,
                TagKey::Name(name) => {
                    TagQuery::new()
                        .category(category)
                        .name(&name)
                        .first_or_fail(&mut *tx)
                        .await?
                }
            };

            debug!("Deleting tag: {} ({})", tag.id, tag.name);

            let detached = AssociationStore::detach_all_for_tag(&mut *tx, tag.id).await?;

            let result = sqlx::query("DELETE FROM tags WHERE id = ?")
                .bind(tag.id)
                .execute(&mut *tx)
                .await
                .map_err(StorageError::Sqlx)?;

            debug!("Deleted tag {} and {} associations", tag.id, detached);
            deleted += result.rows_affected();
        }

        tx.commit().await.map_err(StorageError::Sqlx)?;

        Ok(deleted)
    }

    /// Remove a tag from every record it is attached to
    pub async fn detach_for_tag(&self, tag_id: i64) -> TagResult<u64> {
        Ok(AssociationStore::detach_all_for_tag(&self.pool, tag_id).await?)
    }

    /// Drop all associations of a record. Call this when deleting the record.
    pub async fn forget_entity<T: Taggable + ?Sized>(&self, entity: &T) -> TagResult<u64> {
        Ok(self.associations(entity).detach_all().await?)
    }

    /// Load every record carrying the tag(s).
    ///
    /// Each association row is resolved through the registry; an unregistered
    /// type fails the whole call, while rows whose record no longer exists are
    /// skipped.
    pub async fn get_with_tag(
        &self,
        tag: impl Into<TagRef>,
        category: Option<&str>,
    ) -> TagResult<Vec<TaggedEntity>> {
        let mut entities = Vec::new();

        for leaf in tag.into().into_leaves() {
            let tag = match leaf {
                TagKey::Id(id) => self.find(id).await?,
                TagKey::Name(name) => {
                    TagQuery::new()
                        .category(category)
                        .name(&name)
                        .first_or_fail(&self.pool)
                        .await?
                }
            };

            for key in AssociationStore::keys_for_tag(&self.pool, tag.id).await? {
                match self
                    .registry
                    .load(&self.pool, &key.taggable_type, key.taggable_id)
                    .await?
                {
                    Some(entity) => entities.push(entity),
                    None => warn!(
                        "Skipping dangling association: tag {} -> {}#{}",
                        tag.id, key.taggable_type, key.taggable_id
                    ),
                }
            }
        }

        Ok(entities)
    }
}
