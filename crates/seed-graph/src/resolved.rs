//! Wired seed instances and their lazy production protocol.
//!
//! A [`ResolvedSeed`] is a seed instance after resolution: it knows which
//! other resolved seeds supply its dependencies, shares the existing-items
//! cache and the named values, and memoises every object it creates.

use std::any::Any;
use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

use rand::seq::IndexedRandom;
use rand_chacha::ChaCha8Rng;

use crate::entity::{Entity, EntityType};
use crate::error::SeedError;
use crate::existing::ExistingItems;
use crate::named::NamedDependencies;
use crate::seed::ObjectSeed;

/// Random source handed to every seed instance.
pub type SeedRng = ChaCha8Rng;

/// Fixed wiring of a resolved seed.
pub(crate) struct Wiring {
    pub(crate) entity_type: EntityType,
    pub(crate) dependency_types: Vec<EntityType>,
    pub(crate) dependencies: HashMap<EntityType, Rc<ResolvedSeed>>,
    pub(crate) existing: Rc<ExistingItems>,
    pub(crate) named: Rc<NamedDependencies>,
}

impl Wiring {
    fn dependency_entities(&self, dependency: EntityType) -> Result<Vec<Entity>, SeedError> {
        // Persisted data wins over generated data.
        if let Some(items) = self.existing.get(&dependency) {
            return Ok(items.to_vec());
        }

        if !self.dependency_types.contains(&dependency) {
            return Err(SeedError::UndeclaredDependency {
                seed: self.entity_type,
                dependency,
            });
        }

        match self.dependencies.get(&dependency) {
            Some(seed) => seed.materialise(),
            None => Err(SeedError::MissingDependency {
                seed: self.entity_type,
                dependency,
            }),
        }
    }

    fn dependency_values<D: Any>(&self) -> Result<Vec<Rc<D>>, SeedError> {
        self.dependency_entities(EntityType::of::<D>())?
            .iter()
            .map(downcast_entity::<D>)
            .collect()
    }

    fn named_value<D: Any>(&self) -> Result<Rc<D>, SeedError> {
        self.named
            .get::<D>()
            .ok_or_else(|| SeedError::NamedDependencyNotFound {
                dependency: EntityType::of::<D>(),
            })
    }
}

fn downcast_entity<D: Any>(entity: &Entity) -> Result<Rc<D>, SeedError> {
    entity
        .downcast::<D>()
        .ok_or_else(|| SeedError::EntityTypeMismatch {
            expected: EntityType::of::<D>(),
            found: entity.runtime_type(),
        })
}

/// View of a seed's wiring and random source, passed to its factory.
pub struct SeedContext<'a> {
    wiring: &'a Wiring,
    rng: &'a mut SeedRng,
}

impl SeedContext<'_> {
    /// Returns the entity type of the seed being run.
    #[must_use]
    pub fn entity_type(&self) -> EntityType {
        self.wiring.entity_type
    }

    /// Returns every available object of dependency type `D`.
    ///
    /// Existing data for `D` is returned when present. Otherwise `D` must be
    /// a declared dependency and the supplying seed is materialised first.
    ///
    /// # Errors
    ///
    /// Returns [`SeedError::UndeclaredDependency`] if `D` was not declared,
    /// [`SeedError::MissingDependency`] if nothing supplies it, or any error
    /// raised while the supplying seed produces its objects.
    pub fn dependencies<D: Any>(&self) -> Result<Vec<Rc<D>>, SeedError> {
        self.wiring.dependency_values::<D>()
    }

    /// Returns every available object of `dependency` without downcasting.
    ///
    /// # Errors
    ///
    /// As for [`SeedContext::dependencies`].
    pub fn dependency_entities(&self, dependency: EntityType) -> Result<Vec<Entity>, SeedError> {
        self.wiring.dependency_entities(dependency)
    }

    /// Picks one object of dependency type `D` at random.
    ///
    /// # Errors
    ///
    /// Returns [`SeedError::EmptyDependency`] if no objects of `D` exist, or
    /// any error [`SeedContext::dependencies`] returns.
    pub fn pick<D: Any>(&mut self) -> Result<Rc<D>, SeedError> {
        let values = self.wiring.dependency_values::<D>()?;
        values
            .choose(&mut *self.rng)
            .cloned()
            .ok_or_else(|| SeedError::EmptyDependency {
                seed: self.wiring.entity_type,
                dependency: EntityType::of::<D>(),
            })
    }

    /// Returns the named value registered for `D`.
    ///
    /// # Errors
    ///
    /// Returns [`SeedError::NamedDependencyNotFound`] if none was registered.
    pub fn named<D: Any>(&self) -> Result<Rc<D>, SeedError> {
        self.wiring.named_value::<D>()
    }

    /// Returns the seed's random source.
    pub fn rng(&mut self) -> &mut SeedRng {
        &mut *self.rng
    }
}

struct Factory {
    seed: Box<dyn ObjectSeed>,
    rng: SeedRng,
}

/// A seed instance wired to its dependencies.
pub struct ResolvedSeed {
    wiring: Wiring,
    count: usize,
    factory: RefCell<Factory>,
    items: RefCell<Vec<Entity>>,
}

impl ResolvedSeed {
    pub(crate) fn new(
        wiring: Wiring,
        count: usize,
        seed: Box<dyn ObjectSeed>,
        rng: SeedRng,
    ) -> Self {
        Self {
            wiring,
            count,
            factory: RefCell::new(Factory { seed, rng }),
            items: RefCell::new(Vec::new()),
        }
    }

    /// Returns the entity type this seed produces.
    #[must_use]
    pub fn entity_type(&self) -> EntityType {
        self.wiring.entity_type
    }

    /// Returns the declared dependency types.
    #[must_use]
    pub fn dependency_types(&self) -> &[EntityType] {
        &self.wiring.dependency_types
    }

    /// Returns the dependency types supplied by other seeds.
    ///
    /// Dependencies satisfied by existing data are not listed.
    #[must_use]
    pub fn seeded_dependencies(&self) -> Vec<EntityType> {
        self.wiring
            .dependency_types
            .iter()
            .filter(|dependency| self.wiring.dependencies.contains_key(dependency))
            .copied()
            .collect()
    }

    /// Returns the configured count.
    #[must_use]
    pub const fn count(&self) -> usize {
        self.count
    }

    /// Returns the number of persisted objects of this seed's own type.
    #[must_use]
    pub fn existing_count(&self) -> usize {
        self.wiring.existing.count(&self.wiring.entity_type)
    }

    /// Returns the total number of objects this seed will hold.
    ///
    /// Persisted objects of the seed's own type count towards the configured
    /// count; the target never drops below zero.
    #[must_use]
    pub fn target_count(&self) -> usize {
        self.count.saturating_sub(self.existing_count())
    }

    /// Returns the objects produced so far.
    #[must_use]
    pub fn items(&self) -> Vec<Entity> {
        self.items.borrow().clone()
    }

    /// Returns the shared existing-items cache.
    #[must_use]
    pub fn existing_items(&self) -> &ExistingItems {
        &self.wiring.existing
    }

    /// Lazily yields this seed's objects.
    ///
    /// Objects created earlier are replayed first with the same identities;
    /// the factory runs only for positions not yet filled. Production stops
    /// after the first error.
    #[must_use]
    pub fn produce(&self) -> Production<'_> {
        Production {
            seed: self,
            position: 0,
            target: self.target_count(),
        }
    }

    /// Produces every object and returns them in order.
    ///
    /// # Errors
    ///
    /// Returns the first [`SeedError`] raised by the factory.
    pub fn materialise(&self) -> Result<Vec<Entity>, SeedError> {
        self.produce().collect()
    }

    /// Returns every available object of dependency type `D`.
    ///
    /// # Errors
    ///
    /// As for [`SeedContext::dependencies`].
    pub fn dependency_values<D: Any>(&self) -> Result<Vec<Rc<D>>, SeedError> {
        self.wiring.dependency_values::<D>()
    }

    /// Returns the named value registered for `D`.
    ///
    /// # Errors
    ///
    /// Returns [`SeedError::NamedDependencyNotFound`] if none was registered.
    pub fn named_value<D: Any>(&self) -> Result<Rc<D>, SeedError> {
        self.wiring.named_value::<D>()
    }

    fn create_next(&self) -> Result<Entity, SeedError> {
        let mut factory =
            self.factory
                .try_borrow_mut()
                .map_err(|_| SeedError::ReentrantProduction {
                    seed: self.entity_type(),
                })?;
        let Factory { seed, rng } = &mut *factory;
        let mut ctx = SeedContext {
            wiring: &self.wiring,
            rng,
        };
        let entity = seed.single_object(&mut ctx)?;
        self.items.borrow_mut().push(entity.clone());
        Ok(entity)
    }
}

impl fmt::Debug for ResolvedSeed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResolvedSeed")
            .field("entity_type", &self.entity_type().name())
            .field("dependency_types", &self.wiring.dependency_types)
            .field("count", &self.count)
            .field("produced", &self.items.borrow().len())
            .finish_non_exhaustive()
    }
}

/// Lazy iterator over a seed's objects, returned by [`ResolvedSeed::produce`].
pub struct Production<'a> {
    seed: &'a ResolvedSeed,
    position: usize,
    target: usize,
}

impl Iterator for Production<'_> {
    type Item = Result<Entity, SeedError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.position >= self.target {
            return None;
        }

        let replayed = self.seed.items.borrow().get(self.position).cloned();
        let next = replayed.map_or_else(|| self.seed.create_next(), Ok);

        if next.is_ok() {
            self.position += 1;
        } else {
            self.position = self.target;
        }
        Some(next)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (0, Some(self.target.saturating_sub(self.position)))
    }
}

#[cfg(test)]
mod tests {
    use std::cell::Cell;

    use rand::{Rng, SeedableRng};
    use rstest::rstest;

    use super::*;

    #[derive(Debug, PartialEq, Eq)]
    struct Customer {
        number: u32,
    }

    #[derive(Debug)]
    struct Order {
        customer: Rc<Customer>,
    }

    struct Counter {
        calls: Rc<Cell<u32>>,
    }

    impl ObjectSeed for Counter {
        fn single_object(&mut self, ctx: &mut SeedContext<'_>) -> Result<Entity, SeedError> {
            let number = self.calls.get() + 1;
            self.calls.set(number);
            let _noise: u8 = ctx.rng().random();
            Ok(Entity::new(Customer { number }))
        }
    }

    struct OrderFactory;

    impl ObjectSeed for OrderFactory {
        fn single_object(&mut self, ctx: &mut SeedContext<'_>) -> Result<Entity, SeedError> {
            let customer = ctx.pick::<Customer>()?;
            Ok(Entity::new(Order { customer }))
        }
    }

    fn wiring(
        entity_type: EntityType,
        dependency_types: Vec<EntityType>,
        dependencies: Vec<Rc<ResolvedSeed>>,
        existing: Rc<ExistingItems>,
    ) -> Wiring {
        Wiring {
            entity_type,
            dependency_types,
            dependencies: dependencies
                .into_iter()
                .map(|seed| (seed.entity_type(), seed))
                .collect(),
            existing,
            named: Rc::new(NamedDependencies::new()),
        }
    }

    fn customer_seed(count: usize, existing: Rc<ExistingItems>) -> (ResolvedSeed, Rc<Cell<u32>>) {
        let calls = Rc::new(Cell::new(0));
        let seed = ResolvedSeed::new(
            wiring(
                EntityType::of::<Customer>(),
                Vec::new(),
                Vec::new(),
                existing,
            ),
            count,
            Box::new(Counter {
                calls: Rc::clone(&calls),
            }),
            SeedRng::seed_from_u64(1),
        );
        (seed, calls)
    }

    fn existing_customers(count: u32) -> Rc<ExistingItems> {
        let mut cache = ExistingItems::default();
        cache.record(
            EntityType::of::<Customer>(),
            (1000..1000 + count)
                .map(|number| Entity::new(Customer { number }))
                .collect(),
        );
        Rc::new(cache)
    }

    #[test]
    fn produce_creates_configured_count() {
        let (seed, calls) = customer_seed(4, Rc::default());

        let items = seed.materialise().expect("production succeeds");

        assert_eq!(items.len(), 4);
        assert_eq!(calls.get(), 4);
        assert_eq!(seed.items().len(), 4);
    }

    #[test]
    fn second_production_replays_same_objects() {
        let (seed, calls) = customer_seed(3, Rc::default());

        let first = seed.materialise().expect("first production");
        let second = seed.materialise().expect("second production");

        assert_eq!(calls.get(), 3);
        assert_eq!(first.len(), second.len());
        assert!(first.iter().zip(&second).all(|(a, b)| a.ptr_eq(b)));
    }

    #[test]
    fn interleaved_productions_share_positions() {
        let (seed, calls) = customer_seed(2, Rc::default());
        let mut first = seed.produce();
        let mut second = seed.produce();

        let a = first.next().expect("item").expect("ok");
        let b = second.next().expect("item").expect("ok");
        let c = second.next().expect("item").expect("ok");
        let d = first.next().expect("item").expect("ok");

        assert!(a.ptr_eq(&b));
        assert!(c.ptr_eq(&d));
        assert!(first.next().is_none());
        assert_eq!(calls.get(), 2);
    }

    #[rstest]
    #[case::partial_existing(20, 5, 15)]
    #[case::existing_meets_count(20, 20, 0)]
    #[case::existing_exceeds_count(20, 25, 0)]
    #[case::zero_count(0, 3, 0)]
    fn existing_items_reduce_generation(
        #[case] count: usize,
        #[case] existing: u32,
        #[case] expected_new: u32,
    ) {
        let (seed, calls) = customer_seed(count, existing_customers(existing));

        let items = seed.materialise().expect("production succeeds");

        assert_eq!(calls.get(), expected_new);
        assert_eq!(items.len(), expected_new as usize);
        assert_eq!(seed.existing_count(), existing as usize);
    }

    #[test]
    fn existing_data_does_not_regenerate_on_replay() {
        let (seed, calls) = customer_seed(20, existing_customers(5));

        let first = seed.materialise().expect("first production");
        let second = seed.materialise().expect("second production");

        assert_eq!(calls.get(), 15);
        assert_eq!(first.len(), 15);
        assert!(first.iter().zip(&second).all(|(a, b)| a.ptr_eq(b)));
    }

    #[test]
    fn dependency_access_materialises_supplying_seed() {
        let (supplier, calls) = customer_seed(3, Rc::default());
        let customers = Rc::new(supplier);
        let orders = ResolvedSeed::new(
            wiring(
                EntityType::of::<Order>(),
                vec![EntityType::of::<Customer>()],
                vec![Rc::clone(&customers)],
                Rc::default(),
            ),
            6,
            Box::new(OrderFactory),
            SeedRng::seed_from_u64(2),
        );

        let produced = orders.materialise().expect("orders produced");
        let known = customers.items();

        assert_eq!(produced.len(), 6);
        assert_eq!(calls.get(), 3);
        for entity in produced {
            let order = entity.downcast::<Order>().expect("order entity");
            assert!(
                known
                    .iter()
                    .filter_map(|customer| customer.downcast::<Customer>())
                    .any(|customer| Rc::ptr_eq(&customer, &order.customer))
            );
        }
    }

    #[test]
    fn existing_data_takes_precedence_over_seeded_items() {
        let (customers, calls) = customer_seed(3, Rc::default());
        let orders = ResolvedSeed::new(
            wiring(
                EntityType::of::<Order>(),
                vec![EntityType::of::<Customer>()],
                vec![Rc::new(customers)],
                existing_customers(2),
            ),
            1,
            Box::new(OrderFactory),
            SeedRng::seed_from_u64(2),
        );

        let values = orders
            .dependency_values::<Customer>()
            .expect("dependency values");

        let numbers: Vec<u32> = values.iter().map(|customer| customer.number).collect();
        assert_eq!(numbers, vec![1000, 1001]);
        assert_eq!(calls.get(), 0);
    }

    #[test]
    fn undeclared_dependency_access_fails() {
        let (seed, _) = customer_seed(1, Rc::default());

        let result = seed.dependency_values::<Order>();

        assert_eq!(
            result.map(|values| values.len()),
            Err(SeedError::UndeclaredDependency {
                seed: EntityType::of::<Customer>(),
                dependency: EntityType::of::<Order>(),
            })
        );
    }

    #[test]
    fn declared_but_unwired_dependency_is_missing() {
        let orders = ResolvedSeed::new(
            wiring(
                EntityType::of::<Order>(),
                vec![EntityType::of::<Customer>()],
                Vec::new(),
                Rc::default(),
            ),
            1,
            Box::new(OrderFactory),
            SeedRng::seed_from_u64(2),
        );

        let result = orders.materialise().map(|items| items.len());

        assert_eq!(
            result,
            Err(SeedError::MissingDependency {
                seed: EntityType::of::<Order>(),
                dependency: EntityType::of::<Customer>(),
            })
        );
        assert!(orders.items().is_empty());
    }

    #[test]
    fn pick_from_empty_dependency_fails() {
        let (customers, _) = customer_seed(0, Rc::default());
        let orders = ResolvedSeed::new(
            wiring(
                EntityType::of::<Order>(),
                vec![EntityType::of::<Customer>()],
                vec![Rc::new(customers)],
                Rc::default(),
            ),
            1,
            Box::new(OrderFactory),
            SeedRng::seed_from_u64(2),
        );

        let result = orders.materialise().map(|items| items.len());

        assert_eq!(
            result,
            Err(SeedError::EmptyDependency {
                seed: EntityType::of::<Order>(),
                dependency: EntityType::of::<Customer>(),
            })
        );
    }

    #[test]
    fn missing_named_value_is_reported() {
        let (seed, _) = customer_seed(1, Rc::default());

        let result = seed.named_value::<String>().map(|value| value.len());

        assert_eq!(
            result,
            Err(SeedError::NamedDependencyNotFound {
                dependency: EntityType::of::<String>(),
            })
        );
    }
}
