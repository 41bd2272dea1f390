//! Seed contracts and definitions.
//!
//! A seed produces test objects of one entity type. Authors implement
//! [`Seed`] for typed output or [`ObjectSeed`] when a seed emits values of
//! several runtime types, then register a [`SeedDefinition`] per seed in a
//! [`SeedCatalogue`]. The catalogue is what the resolver consumes; it creates
//! a fresh seed instance from each definition on every resolution run.

use std::any::Any;
use std::convert::Infallible;
use std::fmt;

use crate::entity::{Entity, EntityType};
use crate::error::{PlanError, ResolveError, SeedError};
use crate::plan::FixturePlan;
use crate::resolved::SeedContext;

/// Number of objects a seed produces unless configured otherwise.
pub const DEFAULT_SEED_COUNT: usize = 20;

/// A seed producing objects of a single, statically known type.
///
/// # Example
///
/// ```
/// use seed_graph::{EntityType, Seed, SeedContext, SeedError};
///
/// struct Customer {
///     name: String,
/// }
///
/// struct Order {
///     customer_name: String,
/// }
///
/// #[derive(Default)]
/// struct OrderSeed;
///
/// impl Seed for OrderSeed {
///     type Entity = Order;
///
///     fn dependency_types() -> Vec<EntityType> {
///         vec![EntityType::of::<Customer>()]
///     }
///
///     fn single(&mut self, ctx: &mut SeedContext<'_>) -> Result<Order, SeedError> {
///         let customer = ctx.pick::<Customer>()?;
///         Ok(Order {
///             customer_name: customer.name.clone(),
///         })
///     }
/// }
/// ```
pub trait Seed: 'static {
    /// The entity type this seed produces.
    type Entity: Any;

    /// Entity types that must be available before this seed runs.
    #[must_use]
    fn dependency_types() -> Vec<EntityType> {
        Vec::new()
    }

    /// Creates one new object.
    ///
    /// # Errors
    ///
    /// Returns [`SeedError`] when a dependency cannot be read or the object
    /// cannot be built.
    fn single(&mut self, ctx: &mut SeedContext<'_>) -> Result<Self::Entity, SeedError>;
}

/// Type-erased seed factory.
///
/// Implement this directly when a seed emits objects whose runtime type
/// differs from its declared entity type, such as several variants of a
/// family of records. Output grouping follows each object's runtime type.
pub trait ObjectSeed {
    /// Creates one new object.
    ///
    /// # Errors
    ///
    /// Returns [`SeedError`] when a dependency cannot be read or the object
    /// cannot be built.
    fn single_object(&mut self, ctx: &mut SeedContext<'_>) -> Result<Entity, SeedError>;
}

struct TypedSeed<S>(S);

impl<S: Seed> ObjectSeed for TypedSeed<S> {
    fn single_object(&mut self, ctx: &mut SeedContext<'_>) -> Result<Entity, SeedError> {
        self.0.single(ctx).map(Entity::new)
    }
}

type Constructor = Box<dyn Fn() -> Result<Box<dyn ObjectSeed>, String>>;

/// Registration record for one seed.
///
/// Holds the seed's entity type, its declared dependency types, the desired
/// count, and a constructor used to create a fresh instance per resolution
/// run.
pub struct SeedDefinition {
    entity_type: EntityType,
    dependency_types: Vec<EntityType>,
    count: usize,
    constructor: Constructor,
}

impl SeedDefinition {
    /// Defines a seed built with [`Default`].
    #[must_use]
    pub fn of<S: Seed + Default>() -> Self {
        Self::with_constructor(|| Ok::<S, Infallible>(S::default()))
    }

    /// Defines a typed seed with a fallible constructor.
    ///
    /// A constructor error surfaces from resolution as
    /// [`ResolveError::Instantiation`].
    #[must_use]
    pub fn with_constructor<S, F, E>(constructor: F) -> Self
    where
        S: Seed,
        F: Fn() -> Result<S, E> + 'static,
        E: fmt::Display,
    {
        Self::from_parts(
            EntityType::of::<S::Entity>(),
            S::dependency_types(),
            Box::new(move || {
                constructor()
                    .map(|seed| Box::new(TypedSeed(seed)) as Box<dyn ObjectSeed>)
                    .map_err(|err| err.to_string())
            }),
        )
    }

    /// Defines a type-erased seed.
    #[must_use]
    pub fn object<F, E>(
        entity_type: EntityType,
        dependency_types: Vec<EntityType>,
        constructor: F,
    ) -> Self
    where
        F: Fn() -> Result<Box<dyn ObjectSeed>, E> + 'static,
        E: fmt::Display,
    {
        Self::from_parts(
            entity_type,
            dependency_types,
            Box::new(move || constructor().map_err(|err| err.to_string())),
        )
    }

    fn from_parts(
        entity_type: EntityType,
        declared: Vec<EntityType>,
        constructor: Constructor,
    ) -> Self {
        let mut dependency_types: Vec<EntityType> = Vec::with_capacity(declared.len());
        for dependency in declared {
            if !dependency_types.contains(&dependency) {
                dependency_types.push(dependency);
            }
        }
        Self {
            entity_type,
            dependency_types,
            count: DEFAULT_SEED_COUNT,
            constructor,
        }
    }

    /// Sets the desired count, consuming the definition.
    #[must_use]
    pub fn with_count(mut self, count: usize) -> Self {
        self.count = count;
        self
    }

    /// Sets the desired count.
    pub fn set_count(&mut self, count: usize) {
        self.count = count;
    }

    /// Returns the entity type this seed produces.
    #[must_use]
    pub const fn entity_type(&self) -> EntityType {
        self.entity_type
    }

    /// Returns the declared dependency types, without duplicates.
    #[must_use]
    pub fn dependency_types(&self) -> &[EntityType] {
        &self.dependency_types
    }

    /// Returns the desired number of objects.
    #[must_use]
    pub const fn count(&self) -> usize {
        self.count
    }

    pub(crate) fn instantiate(&self) -> Result<Box<dyn ObjectSeed>, ResolveError> {
        (self.constructor)().map_err(|message| ResolveError::Instantiation {
            seed: self.entity_type,
            message,
        })
    }
}

impl fmt::Debug for SeedDefinition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SeedDefinition")
            .field("entity_type", &self.entity_type.name())
            .field("dependency_types", &self.dependency_types)
            .field("count", &self.count)
            .finish_non_exhaustive()
    }
}

/// The explicit list of seed definitions to resolve.
///
/// Definitions keep their registration order, which also fixes the random
/// stream each seed instance receives.
#[derive(Debug, Default)]
pub struct SeedCatalogue {
    definitions: Vec<SeedDefinition>,
}

impl SeedCatalogue {
    /// Creates an empty catalogue.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a seed definition.
    ///
    /// # Errors
    ///
    /// Returns [`ResolveError::DuplicateSeed`] if a definition for the same
    /// entity type is already registered.
    pub fn register(&mut self, definition: SeedDefinition) -> Result<(), ResolveError> {
        let entity = definition.entity_type();
        if self.find(&entity).is_some() {
            return Err(ResolveError::DuplicateSeed { entity });
        }
        self.definitions.push(definition);
        Ok(())
    }

    /// Returns all definitions in registration order.
    #[must_use]
    pub fn definitions(&self) -> &[SeedDefinition] {
        &self.definitions
    }

    /// Returns the number of registered definitions.
    #[must_use]
    pub fn len(&self) -> usize {
        self.definitions.len()
    }

    /// Returns `true` if no definitions are registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.definitions.is_empty()
    }

    /// Finds the definition producing `entity_type`.
    #[must_use]
    pub fn find(&self, entity_type: &EntityType) -> Option<&SeedDefinition> {
        self.definitions
            .iter()
            .find(|definition| definition.entity_type == *entity_type)
    }

    /// Sets the count of the seed producing `T`.
    ///
    /// Returns `false` if no such seed is registered.
    pub fn set_count<T: Any>(&mut self, count: usize) -> bool {
        let entity_type = EntityType::of::<T>();
        self.definitions
            .iter_mut()
            .find(|definition| definition.entity_type == entity_type)
            .map(|definition| definition.set_count(count))
            .is_some()
    }

    /// Applies the per-entity counts of a fixture plan.
    ///
    /// A plan key matches a seed's fully qualified type name first and its
    /// short type name otherwise.
    ///
    /// # Errors
    ///
    /// Returns [`PlanError::UnknownEntity`] if the plan names an entity no
    /// registered seed produces, or [`PlanError::AmbiguousEntity`] if a short
    /// name matches more than one seed. No count is changed in either case.
    pub fn apply_plan(&mut self, plan: &FixturePlan) -> Result<(), PlanError> {
        let updates = plan
            .counts()
            .iter()
            .map(|(name, count)| self.plan_target(name).map(|index| (index, *count)))
            .collect::<Result<Vec<_>, _>>()?;

        for (index, count) in updates {
            if let Some(definition) = self.definitions.get_mut(index) {
                definition.set_count(count);
            }
        }
        Ok(())
    }

    fn plan_target(&self, name: &str) -> Result<usize, PlanError> {
        if let Some(index) = self
            .definitions
            .iter()
            .position(|definition| definition.entity_type.full_name() == name)
        {
            return Ok(index);
        }

        let mut matches = self
            .definitions
            .iter()
            .enumerate()
            .filter(|(_, definition)| definition.entity_type.name() == name)
            .map(|(index, _)| index);
        match (matches.next(), matches.next()) {
            (Some(index), None) => Ok(index),
            (Some(_), Some(_)) => Err(PlanError::AmbiguousEntity {
                name: name.to_owned(),
            }),
            (None, _) => Err(PlanError::UnknownEntity {
                name: name.to_owned(),
            }),
        }
    }
}
