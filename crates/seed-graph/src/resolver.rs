//! Dependency resolution for seed catalogues.
//!
//! The resolver turns a [`SeedCatalogue`] into [`ResolvedSeeds`]: every
//! definition instantiated once, after the seeds it depends on, and wired to
//! them. Resolution is a fixpoint over the pending definitions; a pass that
//! resolves nothing means the remaining definitions depend on each other.

use std::collections::{HashMap, HashSet};
use std::iter;
use std::rc::Rc;

use rand::SeedableRng;
use tracing::{debug, info, warn};

use crate::entity::EntityType;
use crate::error::ResolveError;
use crate::existing::{ExistingDataSource, ExistingItems};
use crate::named::NamedDependencies;
use crate::plan::FixturePlan;
use crate::resolved::{ResolvedSeed, SeedRng, Wiring};
use crate::seed::{SeedCatalogue, SeedDefinition};

/// RNG seed used when none is configured.
pub const DEFAULT_RNG_SEED: u64 = 2026;

/// Orders, instantiates, and wires seed definitions.
///
/// # Example
///
/// ```
/// use seed_graph::{
///     EntityType, NamedDependencies, NoExistingData, Resolver, Seed, SeedCatalogue,
///     SeedContext, SeedDefinition, SeedError,
/// };
///
/// struct Customer;
/// struct Order;
///
/// #[derive(Default)]
/// struct CustomerSeed;
///
/// impl Seed for CustomerSeed {
///     type Entity = Customer;
///
///     fn single(&mut self, _ctx: &mut SeedContext<'_>) -> Result<Customer, SeedError> {
///         Ok(Customer)
///     }
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
///     fn single(&mut self, _ctx: &mut SeedContext<'_>) -> Result<Order, SeedError> {
///         Ok(Order)
///     }
/// }
///
/// let mut catalogue = SeedCatalogue::new();
/// catalogue.register(SeedDefinition::of::<OrderSeed>()).expect("orders");
/// catalogue.register(SeedDefinition::of::<CustomerSeed>()).expect("customers");
///
/// let seeds = Resolver::default()
///     .resolve(&catalogue, &NoExistingData, NamedDependencies::new())
///     .expect("acyclic graph");
///
/// assert_eq!(
///     seeds.resolution_order(),
///     &[EntityType::of::<Customer>(), EntityType::of::<Order>()]
/// );
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Resolver {
    rng_seed: u64,
}

impl Default for Resolver {
    fn default() -> Self {
        Self::new(DEFAULT_RNG_SEED)
    }
}

impl Resolver {
    /// Creates a resolver whose seeds draw randomness from `rng_seed`.
    #[must_use]
    pub const fn new(rng_seed: u64) -> Self {
        Self { rng_seed }
    }

    /// Creates a resolver using the RNG seed of a fixture plan.
    #[must_use]
    pub const fn from_plan(plan: &FixturePlan) -> Self {
        Self::new(plan.rng_seed())
    }

    /// Returns the configured RNG seed.
    #[must_use]
    pub const fn rng_seed(&self) -> u64 {
        self.rng_seed
    }

    /// Resolves every definition in `catalogue`.
    ///
    /// Existing data is fetched once per distinct entity type named by the
    /// catalogue, either as a seed's own type or as a dependency. A
    /// dependency is satisfied by an already resolved seed or by non-empty
    /// existing data.
    ///
    /// # Errors
    ///
    /// Returns [`ResolveError::CyclicDependency`] listing every pending seed
    /// when a pass resolves nothing, [`ResolveError::Instantiation`] when a
    /// constructor fails, or [`ResolveError::ExistingData`] when the lookup
    /// fails.
    pub fn resolve<S>(
        &self,
        catalogue: &SeedCatalogue,
        source: &S,
        named: NamedDependencies,
    ) -> Result<ResolvedSeeds, ResolveError>
    where
        S: ExistingDataSource + ?Sized,
    {
        let existing = Rc::new(fetch_existing(catalogue, source)?);
        let named = Rc::new(named);

        let mut seeds: HashMap<EntityType, Rc<ResolvedSeed>> = HashMap::new();
        let mut order = Vec::with_capacity(catalogue.len());
        let mut pending: Vec<(usize, &SeedDefinition)> =
            catalogue.definitions().iter().enumerate().collect();
        let mut passes = 0_usize;

        while !pending.is_empty() {
            passes += 1;
            let (ready, blocked): (Vec<_>, Vec<_>) = pending
                .into_iter()
                .partition(|(_, definition)| is_ready(definition, &seeds, &existing));

            if ready.is_empty() {
                let pending_types: Vec<EntityType> = blocked
                    .iter()
                    .map(|(_, definition)| definition.entity_type())
                    .collect();
                warn!(
                    pass = passes,
                    pending = ?pending_types.iter().map(EntityType::name).collect::<Vec<_>>(),
                    "seed resolution stalled on a dependency cycle"
                );
                return Err(ResolveError::CyclicDependency {
                    pending: pending_types,
                });
            }

            for (index, definition) in ready {
                let seed = self.instantiate(index, definition, &seeds, &existing, &named)?;
                let entity_type = definition.entity_type();
                debug!(
                    entity = %entity_type,
                    pass = passes,
                    count = seed.count(),
                    target = seed.target_count(),
                    "seed resolved"
                );
                seeds.insert(entity_type, Rc::new(seed));
                order.push(entity_type);
            }
            pending = blocked;
        }

        info!(
            seeds = order.len(),
            passes,
            named = named.len(),
            "seed graph resolved"
        );
        Ok(ResolvedSeeds { seeds, order })
    }

    fn instantiate(
        &self,
        index: usize,
        definition: &SeedDefinition,
        seeds: &HashMap<EntityType, Rc<ResolvedSeed>>,
        existing: &Rc<ExistingItems>,
        named: &Rc<NamedDependencies>,
    ) -> Result<ResolvedSeed, ResolveError> {
        let instance = definition.instantiate()?;

        // Existing data covers a dependency without wiring the seed.
        let dependencies = definition
            .dependency_types()
            .iter()
            .filter(|dependency| !existing.contains(dependency))
            .filter_map(|dependency| {
                seeds
                    .get(dependency)
                    .map(|seed| (*dependency, Rc::clone(seed)))
            })
            .collect();

        let wiring = Wiring {
            entity_type: definition.entity_type(),
            dependency_types: definition.dependency_types().to_vec(),
            dependencies,
            existing: Rc::clone(existing),
            named: Rc::clone(named),
        };

        Ok(ResolvedSeed::new(
            wiring,
            definition.count(),
            instance,
            self.stream_for(index),
        ))
    }

    /// Each definition draws from its own stream so output does not depend
    /// on the order seeds are resolved or produced in.
    fn stream_for(&self, index: usize) -> SeedRng {
        let mut rng = SeedRng::seed_from_u64(self.rng_seed);
        rng.set_stream(u64::try_from(index).unwrap_or(u64::MAX));
        rng
    }
}

fn is_ready(
    definition: &SeedDefinition,
    seeds: &HashMap<EntityType, Rc<ResolvedSeed>>,
    existing: &ExistingItems,
) -> bool {
    definition
        .dependency_types()
        .iter()
        .all(|dependency| seeds.contains_key(dependency) || existing.contains(dependency))
}

fn fetch_existing<S>(catalogue: &SeedCatalogue, source: &S) -> Result<ExistingItems, ResolveError>
where
    S: ExistingDataSource + ?Sized,
{
    let mut seen = HashSet::new();
    let mut existing = ExistingItems::default();

    let referenced = catalogue
        .definitions()
        .iter()
        .flat_map(|definition| {
            iter::once(definition.entity_type())
                .chain(definition.dependency_types().iter().copied())
        });

    for entity_type in referenced {
        if !seen.insert(entity_type) {
            continue;
        }
        let items = source
            .fetch_existing(&entity_type)
            .map_err(|err| ResolveError::ExistingData {
                entity: entity_type,
                message: err.message,
            })?;
        let found = items.len();
        if existing.record(entity_type, items) {
            debug!(entity = %entity_type, count = found, "existing items found");
        }
    }

    Ok(existing)
}

/// Resolved seeds keyed by entity type.
///
/// Iteration follows resolution order, so every seed appears after the
/// seeds it depends on.
#[derive(Debug, Clone, Default)]
pub struct ResolvedSeeds {
    seeds: HashMap<EntityType, Rc<ResolvedSeed>>,
    order: Vec<EntityType>,
}

impl ResolvedSeeds {
    /// Returns the seed producing `T`.
    #[must_use]
    pub fn get<T: std::any::Any>(&self) -> Option<&Rc<ResolvedSeed>> {
        self.seeds.get(&EntityType::of::<T>())
    }

    /// Returns the seed producing `entity_type`.
    #[must_use]
    pub fn get_type(&self, entity_type: &EntityType) -> Option<&Rc<ResolvedSeed>> {
        self.seeds.get(entity_type)
    }

    /// Returns the entity types in the order they were resolved.
    #[must_use]
    pub fn resolution_order(&self) -> &[EntityType] {
        &self.order
    }

    /// Iterates over the seeds in resolution order.
    pub fn iter(&self) -> impl Iterator<Item = &Rc<ResolvedSeed>> {
        self.order
            .iter()
            .filter_map(|entity_type| self.seeds.get(entity_type))
    }

    /// Returns the number of resolved seeds.
    #[must_use]
    pub fn len(&self) -> usize {
        self.seeds.len()
    }

    /// Returns `true` if nothing was resolved.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.seeds.is_empty()
    }
}
