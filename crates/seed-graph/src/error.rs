//! Error types for the seed-graph crate.
//!
//! This module defines semantic error enums for seed resolution, object
//! production, plan loading, and the external collaborator ports, following
//! the project's error handling conventions with `thiserror`.

use camino::Utf8PathBuf;
use thiserror::Error;

use crate::entity::EntityType;

/// Errors raised while registering or resolving seed definitions.
///
/// Resolution is a one-shot setup step, so every variant is fatal and names
/// the entity types involved.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ResolveError {
    /// A full resolution pass made no progress while seeds remained pending.
    #[error(
        "circular dependency detected between the following types: {}",
        join_names(.pending)
    )]
    CyclicDependency {
        /// Every seed still pending when progress stalled.
        pending: Vec<EntityType>,
    },

    /// The same named dependency type was registered twice.
    #[error("named dependency of type {dependency} is already registered")]
    DuplicateNamedDependency {
        /// Type of the duplicated named value.
        dependency: EntityType,
    },

    /// Two seed definitions target the same entity type.
    #[error("a seed for {entity} is already registered")]
    DuplicateSeed {
        /// Entity type claimed by both definitions.
        entity: EntityType,
    },

    /// A seed definition could not be constructed.
    #[error("could not create an instance of the {seed} seed: {message}")]
    Instantiation {
        /// Entity type of the seed that failed to construct.
        seed: EntityType,
        /// Description of the construction failure.
        message: String,
    },

    /// The existing-data lookup failed for an entity type.
    #[error("failed to fetch existing {entity} items: {message}")]
    ExistingData {
        /// Entity type being looked up.
        entity: EntityType,
        /// Description of the lookup failure.
        message: String,
    },
}

/// Errors raised while a resolved seed produces objects or reads its
/// dependencies.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SeedError {
    /// A seed read a dependency type it never declared.
    #[error("{seed} seed accessed {dependency}, which is not marked as a dependency")]
    UndeclaredDependency {
        /// Seed performing the access.
        seed: EntityType,
        /// Requested dependency type.
        dependency: EntityType,
    },

    /// A declared dependency was neither seeded nor present in existing data.
    #[error("no items of type {dependency} found for the {seed} seed")]
    MissingDependency {
        /// Seed performing the access.
        seed: EntityType,
        /// Requested dependency type.
        dependency: EntityType,
    },

    /// A declared dependency resolved to an empty set of items.
    #[error("{seed} seed cannot pick from {dependency}: no items available")]
    EmptyDependency {
        /// Seed performing the access.
        seed: EntityType,
        /// Requested dependency type.
        dependency: EntityType,
    },

    /// No named value was registered for the requested type.
    #[error("no named dependency of type {dependency} is registered")]
    NamedDependencyNotFound {
        /// Requested named value type.
        dependency: EntityType,
    },

    /// An item could not be viewed as the requested type.
    #[error("expected an item of type {expected}, found {found}")]
    EntityTypeMismatch {
        /// Type requested by the caller.
        expected: EntityType,
        /// Runtime type of the stored item.
        found: EntityType,
    },

    /// The caller-supplied factory reported a failure.
    #[error("{seed} seed failed to create an object: {message}")]
    Factory {
        /// Seed whose factory failed.
        seed: EntityType,
        /// Description of the failure.
        message: String,
    },

    /// Production of a seed was re-entered while it was already running.
    #[error("{seed} seed was re-entered while producing objects")]
    ReentrantProduction {
        /// Seed whose production was re-entered.
        seed: EntityType,
    },
}

/// Errors that can occur when parsing or applying a fixture plan.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PlanError {
    /// The plan file could not be read.
    #[error("failed to read plan file at '{path}': {message}")]
    IoError {
        /// Path to the plan file.
        path: Utf8PathBuf,
        /// Description of the I/O error.
        message: String,
    },

    /// The plan JSON is malformed or missing required fields.
    #[error("invalid plan JSON: {message}")]
    ParseError {
        /// Description of the parse error.
        message: String,
    },

    /// The plan version is not supported.
    #[error("unsupported plan version: expected {expected}, found {actual}")]
    UnsupportedVersion {
        /// Expected version number.
        expected: u32,
        /// Actual version found in the plan.
        actual: u32,
    },

    /// The plan names an entity that no registered seed produces.
    #[error("plan sets a count for '{name}', but no seed produces that entity")]
    UnknownEntity {
        /// Entity name as written in the plan.
        name: String,
    },

    /// The plan names an entity by a short type name shared by several seeds.
    #[error("plan entity '{name}' matches more than one seed; use the full type name")]
    AmbiguousEntity {
        /// Entity name as written in the plan.
        name: String,
    },
}

/// Failure reported by an existing-data lookup adapter.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct ExistingDataError {
    /// Description of the lookup failure.
    pub message: String,
}

/// Failure reported by a batch sink while accepting generated objects.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("batch sink rejected {entity} batch: {message}")]
pub struct SinkError {
    /// Runtime type of the rejected batch.
    pub entity: EntityType,
    /// Description of the failure.
    pub message: String,
}

fn join_names(types: &[EntityType]) -> String {
    types
        .iter()
        .map(EntityType::name)
        .collect::<Vec<_>>()
        .join(", ")
}
