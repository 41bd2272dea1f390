//! Dependency-ordered fixture data generation for automated tests.
//!
//! This crate builds believable, reproducible test objects from small
//! producer units called seeds. Each seed declares the entity types it
//! depends on; the resolver orders seeds so that dependencies are wired
//! first, reuses objects already present in the backing store, and the
//! generator groups every produced object by runtime type for bulk insertion.
//!
//! # Overview
//!
//! The crate supports:
//!
//! - Registering seeds with per-type counts in a [`SeedCatalogue`]
//! - Resolving the dependency graph with cycle detection
//! - Reducing generation by objects already in the store
//! - Memoised production, so repeated reads return the same objects
//! - Named singleton values shared by every seed
//! - Loading RNG seeds and count overrides from a JSON [`FixturePlan`]
//!
//! # Example
//!
//! ```
//! use seed_graph::{
//!     EntityType, NamedDependencies, NoExistingData, Resolver, Seed, SeedCatalogue,
//!     SeedContext, SeedDefinition, SeedError, generate_all,
//! };
//! use seed_graph::fake::{Fake, faker::name::raw::Name, locales::EN};
//!
//! struct Customer {
//!     name: String,
//! }
//!
//! struct Order {
//!     customer: String,
//! }
//!
//! #[derive(Default)]
//! struct CustomerSeed;
//!
//! impl Seed for CustomerSeed {
//!     type Entity = Customer;
//!
//!     fn single(&mut self, ctx: &mut SeedContext<'_>) -> Result<Customer, SeedError> {
//!         Ok(Customer {
//!             name: Name(EN).fake_with_rng(ctx.rng()),
//!         })
//!     }
//! }
//!
//! #[derive(Default)]
//! struct OrderSeed;
//!
//! impl Seed for OrderSeed {
//!     type Entity = Order;
//!
//!     fn dependency_types() -> Vec<EntityType> {
//!         vec![EntityType::of::<Customer>()]
//!     }
//!
//!     fn single(&mut self, ctx: &mut SeedContext<'_>) -> Result<Order, SeedError> {
//!         let customer = ctx.pick::<Customer>()?;
//!         Ok(Order {
//!             customer: customer.name.clone(),
//!         })
//!     }
//! }
//!
//! let mut catalogue = SeedCatalogue::new();
//! catalogue
//!     .register(SeedDefinition::of::<OrderSeed>().with_count(12))
//!     .expect("register orders");
//! catalogue
//!     .register(SeedDefinition::of::<CustomerSeed>().with_count(3))
//!     .expect("register customers");
//!
//! let seeds = Resolver::new(2026)
//!     .resolve(&catalogue, &NoExistingData, NamedDependencies::new())
//!     .expect("acyclic graph");
//! let batches = generate_all(&seeds).expect("generation succeeds");
//!
//! let customers = batches.values::<Customer>();
//! assert_eq!(customers.len(), 3);
//! assert_eq!(batches.values::<Order>().len(), 12);
//! assert!(
//!     batches
//!         .values::<Order>()
//!         .iter()
//!         .all(|order| customers.iter().any(|c| c.name == order.customer))
//! );
//! ```

mod container;
mod entity;
mod error;
mod existing;
mod generator;
mod named;
mod plan;
mod resolved;
mod resolver;
mod seed;

pub use container::SeedContainer;
pub use entity::{Entity, EntityType};
pub use error::{ExistingDataError, PlanError, ResolveError, SeedError, SinkError};
pub use existing::{ExistingDataSource, ExistingItems, InMemoryExistingData, NoExistingData};
pub use generator::{BatchSink, EntityBatch, GeneratedBatches, generate_all};
pub use named::NamedDependencies;
pub use plan::FixturePlan;
pub use resolved::{Production, ResolvedSeed, SeedContext, SeedRng};
pub use resolver::{DEFAULT_RNG_SEED, ResolvedSeeds, Resolver};
pub use seed::{DEFAULT_SEED_COUNT, ObjectSeed, Seed, SeedCatalogue, SeedDefinition};

/// Fake-data generators for use inside seed factories.
pub use fake;
