// ABOUTME: Taggable capability and the registry of loadable entity types
// ABOUTME: Maps stored taggable_type strings back to typed loaders for reverse lookup

use std::any::Any;
use std::collections::HashMap;
use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;

use async_trait::async_trait;
use sqlx::SqlitePool;
use tracing::debug;

use crate::error::{TagError, TagResult};
use crate::types::AssociationKey;

/// Anything that can own tag associations
pub trait Taggable {
    /// Stable type identifier stored in `taggables.taggable_type`
    fn taggable_type(&self) -> &str;

    fn taggable_id(&self) -> i64;

    fn association_key(&self) -> AssociationKey {
        AssociationKey::new(self.taggable_type(), self.taggable_id())
    }
}

impl<T: Taggable + ?Sized> Taggable for &T {
    fn taggable_type(&self) -> &str {
        (**self).taggable_type()
    }

    fn taggable_id(&self) -> i64 {
        (**self).taggable_id()
    }
}

impl Taggable for AssociationKey {
    fn taggable_type(&self) -> &str {
        &self.taggable_type
    }

    fn taggable_id(&self) -> i64 {
        self.taggable_id
    }
}

/// A taggable record type that can be loaded back from its stored key.
///
/// Implement this for every entity type that should come back out of
/// `Tagger::get_with_tag`, then register it with [`TaggableRegistry::register`].
/// `Taggable::taggable_type` must return `TAGGABLE_TYPE`: writes store the
/// former, the registry looks records up by the latter.
#[async_trait]
pub trait TaggableModel: Taggable + Sized + Send + Sync + 'static {
    const TAGGABLE_TYPE: &'static str;

    /// Load the record, `None` if it no longer exists
    async fn find(pool: &SqlitePool, id: i64) -> Result<Option<Self>, sqlx::Error>;
}

/// A record loaded through the registry
pub struct TaggedEntity {
    key: AssociationKey,
    record: Box<dyn Any + Send + Sync>,
}

impl TaggedEntity {
    pub fn new<T: TaggableModel>(record: T) -> Self {
        debug_assert_eq!(
            record.taggable_type(),
            T::TAGGABLE_TYPE,
            "taggable_type() must match TAGGABLE_TYPE"
        );
        Self {
            key: AssociationKey::new(T::TAGGABLE_TYPE, record.taggable_id()),
            record: Box::new(record),
        }
    }

    pub fn key(&self) -> &AssociationKey {
        &self.key
    }

    pub fn is<T: TaggableModel>(&self) -> bool {
        self.record.is::<T>()
    }

    pub fn downcast_ref<T: TaggableModel>(&self) -> Option<&T> {
        self.record.downcast_ref::<T>()
    }

    /// Take the concrete record out, or get `self` back on a type mismatch
    pub fn downcast<T: TaggableModel>(self) -> Result<T, Self> {
        let key = self.key;
        match self.record.downcast::<T>() {
            Ok(record) => Ok(*record),
            Err(record) => Err(Self { key, record }),
        }
    }
}

impl Taggable for TaggedEntity {
    fn taggable_type(&self) -> &str {
        &self.key.taggable_type
    }

    fn taggable_id(&self) -> i64 {
        self.key.taggable_id
    }
}

impl fmt::Debug for TaggedEntity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TaggedEntity")
            .field("taggable_type", &self.key.taggable_type)
            .field("taggable_id", &self.key.taggable_id)
            .finish()
    }
}

#[async_trait]
trait EntityLoader: Send + Sync {
    async fn load(&self, pool: &SqlitePool, id: i64) -> Result<Option<TaggedEntity>, sqlx::Error>;
}

struct ModelLoader<T>(PhantomData<fn() -> T>);

#[async_trait]
impl<T: TaggableModel> EntityLoader for ModelLoader<T> {
    async fn load(&self, pool: &SqlitePool, id: i64) -> Result<Option<TaggedEntity>, sqlx::Error> {
        Ok(T::find(pool, id).await?.map(TaggedEntity::new))
    }
}

/// Type registry consulted when turning association rows back into records.
///
/// Built once at startup; types are never checked at write time, so a row
/// whose type was never registered only fails when it is read.
#[derive(Clone, Default)]
pub struct TaggableRegistry {
    loaders: HashMap<String, Arc<dyn EntityLoader>>,
}

impl TaggableRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a model type under its `TAGGABLE_TYPE`, replacing any previous loader
    pub fn register<T: TaggableModel>(&mut self) -> &mut Self {
        debug!("Registering taggable type: {}", T::TAGGABLE_TYPE);
        self.loaders.insert(
            T::TAGGABLE_TYPE.to_string(),
            Arc::new(ModelLoader::<T>(PhantomData)),
        );
        self
    }

    /// Builder form of [`TaggableRegistry::register`]
    pub fn with<T: TaggableModel>(mut self) -> Self {
        self.register::<T>();
        self
    }

    pub fn is_registered(&self, taggable_type: &str) -> bool {
        self.loaders.contains_key(taggable_type)
    }

    pub fn types(&self) -> Vec<&str> {
        let mut types: Vec<&str> = self.loaders.keys().map(String::as_str).collect();
        types.sort_unstable();
        types
    }

    /// Load one record by its stored key
    pub async fn load(
        &self,
        pool: &SqlitePool,
        taggable_type: &str,
        taggable_id: i64,
    ) -> TagResult<Option<TaggedEntity>> {
        let loader = self
            .loaders
            .get(taggable_type)
            .ok_or_else(|| TagError::UnresolvableType(taggable_type.to_string()))?;

        Ok(loader.load(pool, taggable_id).await?)
    }
}

impl fmt::Debug for TaggableRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TaggableRegistry")
            .field("types", &self.types())
            .finish()
    }
}
