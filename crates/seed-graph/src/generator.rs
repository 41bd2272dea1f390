//! Generation of all resolved seeds and grouping for bulk handoff.
//!
//! Seeds are driven in resolution order, although any order yields the same
//! objects: dependency reads inside a factory materialise the supplying seed
//! on demand and later productions replay memoised items.

use std::any::Any;
use std::collections::HashMap;
use std::rc::Rc;

use tracing::{debug, info};

use crate::entity::{Entity, EntityType};
use crate::error::{SeedError, SinkError};
use crate::resolver::ResolvedSeeds;

/// Objects of one runtime type, ready for a single bulk insert.
#[derive(Debug, Clone)]
pub struct EntityBatch {
    entity_type: EntityType,
    items: Vec<Entity>,
}

impl EntityBatch {
    /// Returns the runtime type shared by every object in the batch.
    #[must_use]
    pub const fn entity_type(&self) -> EntityType {
        self.entity_type
    }

    /// Returns the objects in production order.
    #[must_use]
    pub fn items(&self) -> &[Entity] {
        &self.items
    }

    /// Returns typed handles to every object.
    ///
    /// Returns an empty vector if the batch holds a different type.
    #[must_use]
    pub fn values<T: Any>(&self) -> Vec<Rc<T>> {
        self.items
            .iter()
            .filter_map(Entity::downcast::<T>)
            .collect()
    }

    /// Returns the number of objects.
    #[must_use]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Returns `true` if the batch is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

/// Consumer of generated batches, typically a persistence adapter.
#[cfg_attr(test, mockall::automock)]
pub trait BatchSink {
    /// Accepts one batch of objects sharing a runtime type.
    ///
    /// # Errors
    ///
    /// Returns [`SinkError`] when the batch cannot be stored.
    fn insert_batch(&mut self, batch: &EntityBatch) -> Result<(), SinkError>;
}

/// All generated objects grouped by runtime type.
///
/// Batches are ordered by the first appearance of their type.
#[derive(Debug, Clone, Default)]
pub struct GeneratedBatches {
    batches: Vec<EntityBatch>,
    index: HashMap<EntityType, usize>,
}

impl GeneratedBatches {
    fn push(&mut self, entity: Entity) {
        let entity_type = entity.runtime_type();
        let slot = *self.index.entry(entity_type).or_insert_with(|| {
            self.batches.push(EntityBatch {
                entity_type,
                items: Vec::new(),
            });
            self.batches.len() - 1
        });
        if let Some(batch) = self.batches.get_mut(slot) {
            batch.items.push(entity);
        }
    }

    /// Returns the batch holding objects of runtime type `T`.
    #[must_use]
    pub fn batch<T: Any>(&self) -> Option<&EntityBatch> {
        self.batch_of(&EntityType::of::<T>())
    }

    /// Returns the batch holding objects of `entity_type`.
    #[must_use]
    pub fn batch_of(&self, entity_type: &EntityType) -> Option<&EntityBatch> {
        self.index
            .get(entity_type)
            .and_then(|slot| self.batches.get(*slot))
    }

    /// Returns typed handles to every generated object of type `T`.
    #[must_use]
    pub fn values<T: Any>(&self) -> Vec<Rc<T>> {
        self.batch::<T>()
            .map(EntityBatch::values)
            .unwrap_or_default()
    }

    /// Iterates over the batches.
    pub fn iter(&self) -> std::slice::Iter<'_, EntityBatch> {
        self.batches.iter()
    }

    /// Returns the number of batches.
    #[must_use]
    pub fn len(&self) -> usize {
        self.batches.len()
    }

    /// Returns `true` if nothing was generated.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.batches.is_empty()
    }

    /// Returns the number of objects across all batches.
    #[must_use]
    pub fn total_items(&self) -> usize {
        self.batches.iter().map(EntityBatch::len).sum()
    }

    /// Feeds every batch to `sink` in order.
    ///
    /// Returns the number of objects handed off.
    ///
    /// # Errors
    ///
    /// Returns the first [`SinkError`]; later batches are not offered.
    pub fn hand_off<K>(&self, sink: &mut K) -> Result<usize, SinkError>
    where
        K: BatchSink + ?Sized,
    {
        let mut handed_off = 0;
        for batch in &self.batches {
            sink.insert_batch(batch)?;
            handed_off += batch.len();
            debug!(entity = %batch.entity_type, count = batch.len(), "batch handed off");
        }
        Ok(handed_off)
    }
}

impl<'a> IntoIterator for &'a GeneratedBatches {
    type Item = &'a EntityBatch;
    type IntoIter = std::slice::Iter<'a, EntityBatch>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// Produces every resolved seed's objects and groups them by runtime type.
///
/// # Errors
///
/// Returns the first [`SeedError`] raised while producing objects.
///
/// # Example
///
/// ```
/// use seed_graph::{
///     NamedDependencies, NoExistingData, Resolver, Seed, SeedCatalogue, SeedContext,
///     SeedDefinition, SeedError, generate_all,
/// };
///
/// struct Tag(u8);
///
/// #[derive(Default)]
/// struct TagSeed;
///
/// impl Seed for TagSeed {
///     type Entity = Tag;
///
///     fn single(&mut self, _ctx: &mut SeedContext<'_>) -> Result<Tag, SeedError> {
///         Ok(Tag(1))
///     }
/// }
///
/// let mut catalogue = SeedCatalogue::new();
/// catalogue
///     .register(SeedDefinition::of::<TagSeed>().with_count(4))
///     .expect("register tags");
/// let seeds = Resolver::default()
///     .resolve(&catalogue, &NoExistingData, NamedDependencies::new())
///     .expect("resolves");
///
/// let batches = generate_all(&seeds).expect("generates");
/// assert_eq!(batches.len(), 1);
/// assert_eq!(batches.values::<Tag>().len(), 4);
/// ```
pub fn generate_all(seeds: &ResolvedSeeds) -> Result<GeneratedBatches, SeedError> {
    let mut batches = GeneratedBatches::default();

    for seed in seeds.iter() {
        let mut emitted = 0_usize;
        for entity in seed.produce() {
            batches.push(entity?);
            emitted += 1;
        }
        debug!(entity = %seed.entity_type(), emitted, "seed produced");
    }

    info!(
        batches = batches.len(),
        items = batches.total_items(),
        "fixture generation complete"
    );
    Ok(batches)
}
