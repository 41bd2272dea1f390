//! Facade tying named values, resolution, and generation together.

use std::any::Any;
use std::rc::Rc;

use tracing::{info, warn};

use crate::error::{ResolveError, SeedError};
use crate::existing::ExistingDataSource;
use crate::generator::{GeneratedBatches, generate_all};
use crate::named::NamedDependencies;
use crate::plan::FixturePlan;
use crate::resolved::ResolvedSeed;
use crate::resolver::{ResolvedSeeds, Resolver};
use crate::seed::SeedCatalogue;

/// Owns an existing-data source and the seeds resolved against it.
///
/// # Example
///
/// ```
/// use seed_graph::{
///     NoExistingData, Seed, SeedCatalogue, SeedContainer, SeedContext, SeedDefinition,
///     SeedError,
/// };
///
/// struct Tenant(&'static str);
/// struct Project {
///     tenant: &'static str,
/// }
///
/// #[derive(Default)]
/// struct ProjectSeed;
///
/// impl Seed for ProjectSeed {
///     type Entity = Project;
///
///     fn single(&mut self, ctx: &mut SeedContext<'_>) -> Result<Project, SeedError> {
///         let tenant = ctx.named::<Tenant>()?;
///         Ok(Project { tenant: tenant.0 })
///     }
/// }
///
/// let mut catalogue = SeedCatalogue::new();
/// catalogue
///     .register(SeedDefinition::of::<ProjectSeed>().with_count(2))
///     .expect("register projects");
///
/// let mut container = SeedContainer::new(NoExistingData);
/// container.load_dependency(Tenant("acme")).expect("first tenant");
/// container.load_seeds(&catalogue).expect("resolves");
///
/// let batches = container.generate().expect("generates");
/// assert!(batches.values::<Project>().iter().all(|p| p.tenant == "acme"));
/// ```
#[derive(Debug)]
pub struct SeedContainer<S> {
    source: S,
    resolver: Resolver,
    named: NamedDependencies,
    seeds: ResolvedSeeds,
}

impl<S: ExistingDataSource> SeedContainer<S> {
    /// Creates a container reading existing data from `source`.
    #[must_use]
    pub fn new(source: S) -> Self {
        Self {
            source,
            resolver: Resolver::default(),
            named: NamedDependencies::new(),
            seeds: ResolvedSeeds::default(),
        }
    }

    /// Uses `rng_seed` for subsequent resolutions, consuming the container.
    #[must_use]
    pub const fn with_rng_seed(mut self, rng_seed: u64) -> Self {
        self.resolver = Resolver::new(rng_seed);
        self
    }

    /// Uses the plan's RNG seed for subsequent resolutions.
    ///
    /// Count overrides are applied to the catalogue with
    /// [`SeedCatalogue::apply_plan`].
    #[must_use]
    pub const fn with_plan(mut self, plan: &FixturePlan) -> Self {
        self.resolver = Resolver::from_plan(plan);
        self
    }

    /// Registers a named value visible to seeds loaded afterwards.
    ///
    /// # Errors
    ///
    /// Returns [`ResolveError::DuplicateNamedDependency`] if a value of the
    /// same type is already loaded.
    pub fn load_dependency<T: Any>(&mut self, value: T) -> Result<(), ResolveError> {
        self.named.insert(value)
    }

    /// Resolves `catalogue`, replacing any previously loaded seeds.
    ///
    /// # Errors
    ///
    /// Returns any [`ResolveError`] raised by the resolver. Previously
    /// loaded seeds are kept on failure.
    pub fn load_seeds(&mut self, catalogue: &SeedCatalogue) -> Result<(), ResolveError> {
        let seeds = self
            .resolver
            .resolve(catalogue, &self.source, self.named.clone())?;
        info!(seeds = seeds.len(), "seeds loaded into container");
        self.seeds = seeds;
        Ok(())
    }

    /// Generates every loaded seed's objects.
    ///
    /// Repeated calls replay the same objects.
    ///
    /// # Errors
    ///
    /// Returns the first [`SeedError`] raised while producing objects.
    pub fn generate(&self) -> Result<GeneratedBatches, SeedError> {
        if self.seeds.is_empty() {
            warn!("generate called with no seeds loaded");
        }
        generate_all(&self.seeds)
    }

    /// Returns the loaded seed producing `T`.
    #[must_use]
    pub fn seed<T: Any>(&self) -> Option<&Rc<ResolvedSeed>> {
        self.seeds.get::<T>()
    }

    /// Returns every loaded seed.
    #[must_use]
    pub const fn seeds(&self) -> &ResolvedSeeds {
        &self.seeds
    }

    /// Returns the existing-data source.
    #[must_use]
    pub const fn source(&self) -> &S {
        &self.source
    }
}

#[cfg(test)]
mod tests {
    use rstest::{fixture, rstest};

    use super::*;
    use crate::entity::EntityType;
    use crate::existing::{InMemoryExistingData, NoExistingData};
    use crate::resolved::SeedContext;
    use crate::seed::{Seed, SeedDefinition};

    struct Tenant(&'static str);

    #[derive(Debug)]
    struct Account {
        tenant: &'static str,
        number: u32,
    }

    #[derive(Debug)]
    struct Invoice {
        account: u32,
    }

    #[derive(Default)]
    struct AccountSeed {
        issued: u32,
    }

    impl Seed for AccountSeed {
        type Entity = Account;

        fn single(&mut self, ctx: &mut SeedContext<'_>) -> Result<Account, SeedError> {
            self.issued += 1;
            Ok(Account {
                tenant: ctx.named::<Tenant>()?.0,
                number: self.issued,
            })
        }
    }

    #[derive(Default)]
    struct InvoiceSeed;

    impl Seed for InvoiceSeed {
        type Entity = Invoice;

        fn dependency_types() -> Vec<EntityType> {
            vec![EntityType::of::<Account>()]
        }

        fn single(&mut self, ctx: &mut SeedContext<'_>) -> Result<Invoice, SeedError> {
            Ok(Invoice {
                account: ctx.pick::<Account>()?.number,
            })
        }
    }

    #[fixture]
    fn catalogue() -> SeedCatalogue {
        let mut catalogue = SeedCatalogue::new();
        catalogue
            .register(SeedDefinition::of::<InvoiceSeed>().with_count(6))
            .expect("invoices");
        catalogue
            .register(SeedDefinition::of::<AccountSeed>().with_count(2))
            .expect("accounts");
        catalogue
    }

    #[rstest]
    fn generates_loaded_seeds_with_named_values(catalogue: SeedCatalogue) {
        let mut container = SeedContainer::new(NoExistingData).with_rng_seed(11);
        container.load_dependency(Tenant("acme")).expect("tenant");
        container.load_seeds(&catalogue).expect("resolves");

        let batches = container.generate().expect("generates");

        let accounts = batches.values::<Account>();
        assert_eq!(accounts.len(), 2);
        assert!(accounts.iter().all(|account| account.tenant == "acme"));
        assert!(
            batches
                .values::<Invoice>()
                .iter()
                .all(|invoice| (1..=2).contains(&invoice.account))
        );
    }

    #[rstest]
    fn seed_lookup_exposes_resolved_seed(catalogue: SeedCatalogue) {
        let store = InMemoryExistingData::new().with_items(vec![Account {
            tenant: "legacy",
            number: 90,
        }]);
        let mut container = SeedContainer::new(store);
        container.load_dependency(Tenant("acme")).expect("tenant");
        container.load_seeds(&catalogue).expect("resolves");

        let accounts = container.seed::<Account>().expect("account seed");

        assert_eq!(accounts.existing_count(), 1);
        assert_eq!(accounts.target_count(), 1);
        assert!(container.seed::<Tenant>().is_none());
    }

    #[rstest]
    fn plan_rng_seed_makes_runs_reproducible(catalogue: SeedCatalogue) {
        let plan = FixturePlan::from_json(r#"{"version": 1, "rngSeed": 31}"#).expect("plan");
        let invoice_accounts = || {
            let mut container = SeedContainer::new(NoExistingData).with_plan(&plan);
            container.load_dependency(Tenant("acme")).expect("tenant");
            container.load_seeds(&catalogue).expect("resolves");
            container
                .generate()
                .expect("generates")
                .values::<Invoice>()
                .iter()
                .map(|invoice| invoice.account)
                .collect::<Vec<_>>()
        };

        assert_eq!(invoice_accounts(), invoice_accounts());
    }

    #[test]
    fn duplicate_named_value_is_rejected() {
        let mut container = SeedContainer::new(NoExistingData);
        container
            .load_dependency(Tenant("acme"))
            .expect("first tenant");

        let result = container.load_dependency(Tenant("globex"));

        assert_eq!(
            result,
            Err(ResolveError::DuplicateNamedDependency {
                dependency: EntityType::of::<Tenant>(),
            })
        );
    }

    #[rstest]
    fn missing_named_value_surfaces_during_generation(catalogue: SeedCatalogue) {
        let mut container = SeedContainer::new(NoExistingData);
        container.load_seeds(&catalogue).expect("resolves");

        let result = container.generate();

        assert!(matches!(
            result,
            Err(SeedError::NamedDependencyNotFound { .. })
        ));
    }

    #[test]
    fn generate_without_seeds_is_empty() {
        let container = SeedContainer::new(NoExistingData);

        let batches = container.generate().expect("nothing to generate");

        assert!(batches.is_empty());
    }

    #[rstest]
    fn failed_load_keeps_previous_seeds(catalogue: SeedCatalogue) {
        let mut container = SeedContainer::new(NoExistingData);
        container.load_dependency(Tenant("acme")).expect("tenant");
        container.load_seeds(&catalogue).expect("resolves");

        let mut orphaned = SeedCatalogue::new();
        orphaned
            .register(SeedDefinition::of::<InvoiceSeed>())
            .expect("invoices");
        let result = container.load_seeds(&orphaned);

        assert!(matches!(result, Err(ResolveError::CyclicDependency { .. })));
        assert_eq!(container.seeds().len(), 2);
    }
}
