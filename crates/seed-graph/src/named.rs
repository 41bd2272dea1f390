//! Named singleton dependencies.
//!
//! Some values seeds need are not entities at all: a tenant identifier, a
//! clock, shared configuration. Callers register one value per type before
//! resolution and every resolved seed can read it.

use std::any::Any;
use std::collections::HashMap;
use std::rc::Rc;

use crate::entity::EntityType;
use crate::error::ResolveError;

/// Externally supplied values keyed by their type.
///
/// # Example
///
/// ```
/// use seed_graph::NamedDependencies;
///
/// struct Tenant(&'static str);
///
/// let mut named = NamedDependencies::new();
/// named.insert(Tenant("acme")).expect("first registration");
/// assert!(named.insert(Tenant("globex")).is_err());
/// assert_eq!(named.get::<Tenant>().map(|tenant| tenant.0), Some("acme"));
/// ```
#[derive(Clone, Default)]
pub struct NamedDependencies {
    values: HashMap<EntityType, Rc<dyn Any>>,
}

impl NamedDependencies {
    /// Creates an empty set of named values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `value` under its type.
    ///
    /// # Errors
    ///
    /// Returns [`ResolveError::DuplicateNamedDependency`] if a value of the
    /// same type is already registered. The existing value is kept.
    pub fn insert<T: Any>(&mut self, value: T) -> Result<(), ResolveError> {
        let dependency = EntityType::of::<T>();
        if self.values.contains_key(&dependency) {
            return Err(ResolveError::DuplicateNamedDependency { dependency });
        }
        self.values.insert(dependency, Rc::new(value));
        Ok(())
    }

    /// Returns the value registered for `T`.
    #[must_use]
    pub fn get<T: Any>(&self) -> Option<Rc<T>> {
        self.values
            .get(&EntityType::of::<T>())
            .and_then(|value| Rc::clone(value).downcast::<T>().ok())
    }

    /// Returns `true` if a value is registered for `entity_type`.
    #[must_use]
    pub fn contains(&self, entity_type: &EntityType) -> bool {
        self.values.contains_key(entity_type)
    }

    /// Returns the number of registered values.
    #[must_use]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Returns `true` if no values are registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl std::fmt::Debug for NamedDependencies {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_set()
            .entries(self.values.keys().map(EntityType::name))
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, PartialEq, Eq)]
    struct Tenant(&'static str);

    #[test]
    fn registered_values_are_returned_by_type() {
        let mut named = NamedDependencies::new();
        named.insert(Tenant("acme")).expect("insert tenant");
        named.insert(42_u16).expect("insert number");

        assert_eq!(named.len(), 2);
        assert_eq!(named.get::<Tenant>().as_deref(), Some(&Tenant("acme")));
        assert_eq!(named.get::<u16>().as_deref(), Some(&42));
        assert!(named.get::<u32>().is_none());
    }

    #[test]
    fn duplicate_registration_fails_and_keeps_first_value() {
        let mut named = NamedDependencies::new();
        named.insert(Tenant("acme")).expect("insert tenant");

        let result = named.insert(Tenant("globex"));

        assert_eq!(
            result,
            Err(ResolveError::DuplicateNamedDependency {
                dependency: EntityType::of::<Tenant>(),
            })
        );
        assert_eq!(named.get::<Tenant>().as_deref(), Some(&Tenant("acme")));
    }
}
