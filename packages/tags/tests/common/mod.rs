// ABOUTME: Common test utilities for tagging integration tests
// ABOUTME: In-memory database setup and two sample taggable models

#![allow(dead_code)]

use async_trait::async_trait;
use polytag_storage::{open_pool, StorageConfig};
use polytag_tags::{Taggable, TaggableModel, TaggableRegistry, Tagger};
use sqlx::{FromRow, SqlitePool};

#[derive(Debug, Clone, PartialEq, Eq, FromRow)]
pub struct Task {
    pub id: i64,
    pub title: String,
}

impl Taggable for Task {
    fn taggable_type(&self) -> &str {
        Self::TAGGABLE_TYPE
    }

    fn taggable_id(&self) -> i64 {
        self.id
    }
}

#[async_trait]
impl TaggableModel for Task {
    const TAGGABLE_TYPE: &'static str = "test.task";

    async fn find(pool: &SqlitePool, id: i64) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, Task>("SELECT id, title FROM tasks WHERE id = ?")
            .bind(id)
            .fetch_optional(pool)
            .await
    }
}

#[derive(Debug, Clone, PartialEq, Eq, FromRow)]
pub struct Note {
    pub id: i64,
    pub body: String,
}

impl Taggable for Note {
    fn taggable_type(&self) -> &str {
        Self::TAGGABLE_TYPE
    }

    fn taggable_id(&self) -> i64 {
        self.id
    }
}

#[async_trait]
impl TaggableModel for Note {
    const TAGGABLE_TYPE: &'static str = "test.note";

    async fn find(pool: &SqlitePool, id: i64) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, Note>("SELECT id, body FROM notes WHERE id = ?")
            .bind(id)
            .fetch_optional(pool)
            .await
    }
}

/// Helper to create an in-memory database with the tagging schema and host tables
pub async fn create_test_db() -> SqlitePool {
    let pool = open_pool(&StorageConfig::in_memory()).await.unwrap();

    sqlx::query(
        r#"
        CREATE TABLE tasks (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            title TEXT NOT NULL
        )
        "#,
    )
    .execute(&pool)
    .await
    .unwrap();

    sqlx::query(
        r#"
        CREATE TABLE notes (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            body TEXT NOT NULL
        )
        "#,
    )
    .execute(&pool)
    .await
    .unwrap();

    pool
}

/// Tagger with both sample models registered
pub async fn create_tagger() -> Tagger {
    let pool = create_test_db().await;
    let registry = TaggableRegistry::new().with::<Task>().with::<Note>();
    Tagger::new(pool, registry)
}

pub async fn create_task(pool: &SqlitePool, title: &str) -> Task {
    sqlx::query_as::<_, Task>("INSERT INTO tasks (title) VALUES (?) RETURNING id, title")
        .bind(title)
        .fetch_one(pool)
        .await
        .unwrap()
}

pub async fn create_note(pool: &SqlitePool, body: &str) -> Note {
    sqlx::query_as::<_, Note>("INSERT INTO notes (body) VALUES (?) RETURNING id, body")
        .bind(body)
        .fetch_one(pool)
        .await
        .unwrap()
}

pub async fn delete_task(pool: &SqlitePool, task: &Task) {
    sqlx::query("DELETE FROM tasks WHERE id = ?")
        .bind(task.id)
        .execute(pool)
        .await
        .unwrap();
}

/// Raw association rows of a record, ordered by tag id
pub async fn association_rows(pool: &SqlitePool, entity: &impl Taggable) -> Vec<i64> {
    sqlx::query_scalar(
        "SELECT tag_id FROM taggables WHERE taggable_type = ? AND taggable_id = ? ORDER BY tag_id",
    )
    .bind(entity.taggable_type())
    .bind(entity.taggable_id())
    .fetch_all(pool)
    .await
    .unwrap()
}

pub async fn count_rows(pool: &SqlitePool, table: &str) -> i64 {
    sqlx::query_scalar(&format!("SELECT COUNT(*) FROM {}", table))
        .fetch_one(pool)
        .await
        .unwrap()
}
