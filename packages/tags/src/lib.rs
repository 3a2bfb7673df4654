// ABOUTME: Polymorphic tagging for any taggable record
// ABOUTME: Provides the Tagger service, association store, tag filters and taggable registry

pub mod associations;
pub mod error;
pub mod manager;
pub mod query;
pub mod taggable;
pub mod types;

// Re-export main types
pub use associations::AssociationStore;
pub use error::{TagError, TagResult};
pub use manager::Tagger;
pub use query::TagQuery;
pub use taggable::{Taggable, TaggableModel, TaggableRegistry, TaggedEntity};
pub use types::{
    AssociationKey, SyncChanges, Tag, TagCreateInput, TagKey, TagRef, TagUpdateInput,
};
