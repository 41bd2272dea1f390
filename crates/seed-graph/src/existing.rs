//! Port for objects already present in the backing store.
//!
//! The resolver asks the [`ExistingDataSource`] once per entity type it will
//! touch. Non-empty answers become the shared [`ExistingItems`] cache, which
//! satisfies dependencies without a seed and reduces a seed's own target.

use std::any::Any;
use std::collections::HashMap;

use crate::entity::{Entity, EntityType};
use crate::error::ExistingDataError;

/// Lookup of already-persisted objects by entity type.
///
/// Implementations return an empty vector when no objects of the requested
/// type exist.
#[cfg_attr(test, mockall::automock)]
pub trait ExistingDataSource {
    /// Fetches every persisted object of `entity_type`.
    ///
    /// # Errors
    ///
    /// Returns [`ExistingDataError`] when the store cannot be queried.
    fn fetch_existing(&self, entity_type: &EntityType) -> Result<Vec<Entity>, ExistingDataError>;
}

/// Source reporting an empty store for every entity type.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoExistingData;

impl ExistingDataSource for NoExistingData {
    fn fetch_existing(&self, _entity_type: &EntityType) -> Result<Vec<Entity>, ExistingDataError> {
        Ok(Vec::new())
    }
}

/// In-memory stand-in for a backing store.
///
/// # Example
///
/// ```
/// use seed_graph::{EntityType, ExistingDataSource, InMemoryExistingData};
///
/// struct Country(&'static str);
///
/// let store = InMemoryExistingData::new()
///     .with_items(vec![Country("NZ"), Country("GB")]);
/// let countries = store
///     .fetch_existing(&EntityType::of::<Country>())
///     .expect("in-memory lookups succeed");
///
/// assert_eq!(countries.len(), 2);
/// ```
#[derive(Debug, Clone, Default)]
pub struct InMemoryExistingData {
    items: HashMap<EntityType, Vec<Entity>>,
}

impl InMemoryExistingData {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds persisted objects of type `T`, consuming the store.
    #[must_use]
    pub fn with_items<T: Any>(mut self, items: impl IntoIterator<Item = T>) -> Self {
        self.insert(items);
        self
    }

    /// Adds persisted objects of type `T`.
    pub fn insert<T: Any>(&mut self, items: impl IntoIterator<Item = T>) {
        self.items
            .entry(EntityType::of::<T>())
            .or_default()
            .extend(items.into_iter().map(Entity::new));
    }
}

impl ExistingDataSource for InMemoryExistingData {
    fn fetch_existing(&self, entity_type: &EntityType) -> Result<Vec<Entity>, ExistingDataError> {
        Ok(self.items.get(entity_type).cloned().unwrap_or_default())
    }
}

/// Non-empty existing-data results, keyed by entity type.
///
/// Built once per resolution run and shared read-only by every resolved seed.
#[derive(Debug, Clone, Default)]
pub struct ExistingItems {
    items: HashMap<EntityType, Vec<Entity>>,
}

impl ExistingItems {
    /// Records the lookup result for `entity_type`, ignoring empty results.
    pub(crate) fn record(&mut self, entity_type: EntityType, items: Vec<Entity>) -> bool {
        if items.is_empty() {
            return false;
        }
        self.items.insert(entity_type, items);
        true
    }

    /// Returns the cached objects of `entity_type`.
    #[must_use]
    pub fn get(&self, entity_type: &EntityType) -> Option<&[Entity]> {
        self.items.get(entity_type).map(Vec::as_slice)
    }

    /// Returns `true` if objects of `entity_type` already exist.
    #[must_use]
    pub fn contains(&self, entity_type: &EntityType) -> bool {
        self.items.contains_key(entity_type)
    }

    /// Returns the number of cached objects of `entity_type`.
    #[must_use]
    pub fn count(&self, entity_type: &EntityType) -> usize {
        self.items.get(entity_type).map_or(0, Vec::len)
    }

    /// Returns `true` if no entity type has existing objects.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}
