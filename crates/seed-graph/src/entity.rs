//! Entity identity and type-erased entity values.
//!
//! Seeds produce values of arbitrary caller-defined types. The engine tracks
//! them as [`Entity`] handles keyed by [`EntityType`], which pairs the
//! compiler's [`TypeId`] with a readable name for diagnostics.

use std::any::{Any, TypeId, type_name};
use std::fmt;
use std::hash::{Hash, Hasher};
use std::rc::Rc;

/// Identity of an entity type produced or consumed by a seed.
///
/// Equality and hashing use the underlying [`TypeId`] only; the name is kept
/// for error messages and plan lookups.
///
/// # Example
///
/// ```
/// use seed_graph::EntityType;
///
/// struct Customer;
///
/// let entity_type = EntityType::of::<Customer>();
/// assert_eq!(entity_type.name(), "Customer");
/// assert_eq!(entity_type, EntityType::of::<Customer>());
/// ```
#[derive(Debug, Clone, Copy)]
pub struct EntityType {
    id: TypeId,
    full_name: &'static str,
}

impl EntityType {
    /// Returns the entity type for `T`.
    #[must_use]
    pub fn of<T: Any>() -> Self {
        Self {
            id: TypeId::of::<T>(),
            full_name: type_name::<T>(),
        }
    }

    /// Returns the type name without its module path.
    #[must_use]
    pub fn name(&self) -> &'static str {
        short_type_name(self.full_name)
    }

    /// Returns the fully qualified type name.
    #[must_use]
    pub const fn full_name(&self) -> &'static str {
        self.full_name
    }

    /// Returns `true` if this identity describes `T`.
    #[must_use]
    pub fn is<T: Any>(&self) -> bool {
        self.id == TypeId::of::<T>()
    }
}

impl PartialEq for EntityType {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for EntityType {}

impl Hash for EntityType {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl fmt::Display for EntityType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Strips the module path from the outermost segment of a type name.
///
/// Generic arguments are left untouched, so `a::Wrapper<b::Inner>` becomes
/// `Wrapper<b::Inner>`. Arrays, slices, tuples and other non-path types keep
/// their full name.
fn short_type_name(full_name: &'static str) -> &'static str {
    let head_end = full_name
        .find(['<', '[', '(', ';'])
        .unwrap_or(full_name.len());
    let (head, _) = full_name.split_at(head_end);
    if head.is_empty() {
        return full_name;
    }
    match head.rfind("::") {
        Some(index) => full_name.split_at(index + 2).1,
        None => full_name,
    }
}

/// A produced or pre-existing object, shared by reference.
///
/// Cloning an `Entity` clones the handle, not the value, so identities are
/// preserved when items are replayed or handed to dependent seeds.
#[derive(Clone)]
pub struct Entity {
    value: Rc<dyn Any>,
    runtime_type: EntityType,
}

impl Entity {
    /// Wraps a value in a new shared handle.
    #[must_use]
    pub fn new<T: Any>(value: T) -> Self {
        Self::from_rc(Rc::new(value))
    }

    /// Wraps an existing shared value without copying it.
    #[must_use]
    pub fn from_rc<T: Any>(value: Rc<T>) -> Self {
        Self {
            value,
            runtime_type: EntityType::of::<T>(),
        }
    }

    /// Returns the concrete type of the wrapped value.
    #[must_use]
    pub const fn runtime_type(&self) -> EntityType {
        self.runtime_type
    }

    /// Returns a typed handle to the value if it is a `T`.
    #[must_use]
    pub fn downcast<T: Any>(&self) -> Option<Rc<T>> {
        Rc::clone(&self.value).downcast::<T>().ok()
    }

    /// Returns `true` if both handles point at the same object.
    #[must_use]
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.value, &other.value)
    }
}

impl fmt::Debug for Entity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Entity")
            .field("runtime_type", &self.runtime_type.name())
            .finish_non_exhaustive()
    }
}
