// ABOUTME: Association store for the polymorphic taggables table
// ABOUTME: Attach, detach, full-replace sync and cascade delete by tag id

use std::collections::BTreeSet;

use sqlx::{Executor, Sqlite, SqlitePool};
use tracing::debug;

use crate::types::{AssociationKey, SyncChanges};
use polytag_storage::{StorageError, StorageResult};

/// Associations of a single taggable record
pub struct AssociationStore<'a> {
    pool: &'a SqlitePool,
    key: AssociationKey,
}

impl<'a> AssociationStore<'a> {
    pub fn new(pool: &'a SqlitePool, key: AssociationKey) -> Self {
        Self { pool, key }
    }

    pub fn key(&self) -> &AssociationKey {
        &self.key
    }

    /// Link a tag to this record. Returns false if the link already existed.
    pub async fn attach(&self, tag_id: i64) -> StorageResult<bool> {
        debug!(
            "Attaching tag {} to {}#{}",
            tag_id, self.key.taggable_type, self.key.taggable_id
        );

        insert_association(self.pool, &self.key, tag_id).await
    }

    /// Remove the link to a tag. Returns the number of rows removed.
    pub async fn detach(&self, tag_id: i64) -> StorageResult<u64> {
        debug!(
            "Detaching tag {} from {}#{}",
            tag_id, self.key.taggable_type, self.key.taggable_id
        );

        delete_association(self.pool, &self.key, tag_id).await
    }

    /// Remove every tag link of this record
    pub async fn detach_all(&self) -> StorageResult<u64> {
        debug!(
            "Detaching all tags from {}#{}",
            self.key.taggable_type, self.key.taggable_id
        );

        let result =
            sqlx::query("DELETE FROM taggables WHERE taggable_type = ? AND taggable_id = ?")
                .bind(&self.key.taggable_type)
                .bind(self.key.taggable_id)
                .execute(self.pool)
                .await
                .map_err(StorageError::Sqlx)?;

        Ok(result.rows_affected())
    }

    /// Ids of all tags currently linked to this record, ascending
    pub async fn tag_ids(&self) -> StorageResult<Vec<i64>> {
        select_tag_ids(self.pool, &self.key).await
    }

    /// Replace the record's links with exactly `tag_ids`.
    ///
    /// Links outside the set are removed, links already present are kept and
    /// missing ones are added, all in one transaction.
    pub async fn sync(&self, tag_ids: &[i64]) -> StorageResult<SyncChanges> {
        debug!(
            "Syncing {}#{} to tags {:?}",
            self.key.taggable_type, self.key.taggable_id, tag_ids
        );

        let mut tx = self.pool.begin().await.map_err(StorageError::Sqlx)?;

        let current: BTreeSet<i64> = select_tag_ids(&mut *tx, &self.key)
            .await?
            .into_iter()
            .collect();
        let wanted: BTreeSet<i64> = tag_ids.iter().copied().collect();

        let mut changes = SyncChanges::default();

        for tag_id in current.difference(&wanted) {
            delete_association(&mut *tx, &self.key, *tag_id).await?;
            changes.detached.push(*tag_id);
        }

        for tag_id in wanted.difference(&current) {
            insert_association(&mut *tx, &self.key, *tag_id).await?;
            changes.attached.push(*tag_id);
        }

        tx.commit().await.map_err(StorageError::Sqlx)?;

        Ok(changes)
    }

    /// Remove every link to a tag regardless of record type
    pub async fn detach_all_for_tag<'e, E>(executor: E, tag_id: i64) -> StorageResult<u64>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        debug!("Detaching tag {} from all records", tag_id);

        let result = sqlx::query("DELETE FROM taggables WHERE tag_id = ?")
            .bind(tag_id)
            .execute(executor)
            .await
            .map_err(StorageError::Sqlx)?;

        Ok(result.rows_affected())
    }

    /// Keys of every record linked to a tag, in insertion order
    pub async fn keys_for_tag(pool: &SqlitePool, tag_id: i64) -> StorageResult<Vec<AssociationKey>> {
        debug!("Fetching records linked to tag {}", tag_id);

        let rows: Vec<(String, i64)> = sqlx::query_as(
            "SELECT taggable_type, taggable_id FROM taggables WHERE tag_id = ? ORDER BY rowid",
        )
        .bind(tag_id)
        .fetch_all(pool)
        .await
        .map_err(StorageError::Sqlx)?;

        Ok(rows
            .into_iter()
            .map(|(taggable_type, taggable_id)| AssociationKey::new(taggable_type, taggable_id))
            .collect())
    }
}

async fn insert_association<'e, E>(executor: E, key: &AssociationKey, tag_id: i64) -> StorageResult<bool>
where
    E: Executor<'e, Database = Sqlite>,
{
    // Duplicate links are absorbed by the unique index; foreign key errors still surface
    let result = sqlx::query(
        "INSERT OR IGNORE INTO taggables (tag_id, taggable_type, taggable_id) VALUES (?, ?, ?)",
    )
    .bind(tag_id)
    .bind(&key.taggable_type)
    .bind(key.taggable_id)
    .execute(executor)
    .await
    .map_err(StorageError::Sqlx)?;

    Ok(result.rows_affected() > 0)
}

async fn delete_association<'e, E>(executor: E, key: &AssociationKey, tag_id: i64) -> StorageResult<u64>
where
    E: Executor<'e, Database = Sqlite>,
{
    let result = sqlx::query(
        "DELETE FROM taggables WHERE tag_id = ? AND taggable_type = ? AND taggable_id = ?",
    )
    .bind(tag_id)
    .bind(&key.taggable_type)
    .bind(key.taggable_id)
    .execute(executor)
    .await
    .map_err(StorageError::Sqlx)?;

    Ok(result.rows_affected())
}

async fn select_tag_ids<'e, E>(executor: E, key: &AssociationKey) -> StorageResult<Vec<i64>>
where
    E: Executor<'e, Database = Sqlite>,
{
    sqlx::query_scalar(
        "SELECT tag_id FROM taggables WHERE taggable_type = ? AND taggable_id = ? ORDER BY tag_id",
    )
    .bind(&key.taggable_type)
    .bind(key.taggable_id)
    .fetch_all(executor)
    .await
    .map_err(StorageError::Sqlx)
}
