// ABOUTME: Error taxonomy for tagging operations
// ABOUTME: Lookup misses, unresolvable entity types, and pass-through storage failures

use polytag_storage::StorageError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum TagError {
    #[error("Tag '{name}' not found (category: {category:?})")]
    TagNotFound {
        name: String,
        category: Option<String>,
    },

    #[error("Tag with id {0} not found")]
    TagIdNotFound(i64),

    #[error("No loader registered for taggable type '{0}'")]
    UnresolvableType(String),

    #[error(transparent)]
    Storage(#[from] StorageError),
}

impl TagError {
    /// True for both name and id lookup misses
    pub fn is_not_found(&self) -> bool {
        matches!(self, TagError::TagNotFound { .. } | TagError::TagIdNotFound(_))
    }
}

impl From<sqlx::Error> for TagError {
    fn from(err: sqlx::Error) -> Self {
        TagError::Storage(StorageError::Sqlx(err))
    }
}

pub type TagResult<T> = Result<T, TagError>;
