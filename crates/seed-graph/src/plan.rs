//! Fixture plan configuration and JSON parsing.
//!
//! A fixture plan fixes the RNG seed for a run and overrides seed counts by
//! entity name, so a test suite can change the volume of generated data
//! without touching seed code. Plans are loaded from JSON.

use std::collections::BTreeMap;

use camino::Utf8Path;
use cap_std::{ambient_authority, fs::Dir};
use serde::Deserialize;

use crate::error::PlanError;

/// Current supported plan version.
const SUPPORTED_VERSION: u32 = 1;

/// Run configuration for seed resolution and generation.
///
/// # Example
///
/// ```
/// use seed_graph::FixturePlan;
///
/// let json = r#"{
///     "version": 1,
///     "rngSeed": 2026,
///     "counts": {"Customer": 3, "Order": 12}
/// }"#;
///
/// let plan = FixturePlan::from_json(json).expect("valid plan");
/// assert_eq!(plan.rng_seed(), 2026);
/// assert_eq!(plan.count_for("Order"), Some(12));
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FixturePlan {
    version: u32,
    rng_seed: u64,
    counts: BTreeMap<String, usize>,
}

impl FixturePlan {
    /// Parses a fixture plan from a JSON string.
    ///
    /// # Errors
    ///
    /// Returns [`PlanError`] if:
    /// - The JSON is malformed
    /// - Required fields are missing
    /// - The version is unsupported
    pub fn from_json(json: &str) -> Result<Self, PlanError> {
        let raw: RawFixturePlan =
            serde_json::from_str(json).map_err(|e| PlanError::ParseError {
                message: e.to_string(),
            })?;

        Self::from_raw(raw)
    }

    /// Loads a fixture plan from a JSON file.
    ///
    /// # Errors
    ///
    /// Returns [`PlanError`] if the file cannot be read or parsed.
    pub fn from_file(path: &Utf8Path) -> Result<Self, PlanError> {
        let io_error = |message: String| PlanError::IoError {
            path: path.to_path_buf(),
            message,
        };

        let parent = match path.parent() {
            Some(parent) if !parent.as_str().is_empty() => parent,
            _ => Utf8Path::new("."),
        };
        let file_name = path
            .file_name()
            .ok_or_else(|| io_error("plan path must be a file".to_owned()))?;
        let dir = Dir::open_ambient_dir(parent, ambient_authority())
            .map_err(|e| io_error(e.to_string()))?;
        let contents = dir
            .read_to_string(file_name)
            .map_err(|e| io_error(e.to_string()))?;

        Self::from_json(&contents)
    }

    fn from_raw(raw: RawFixturePlan) -> Result<Self, PlanError> {
        if raw.version != SUPPORTED_VERSION {
            return Err(PlanError::UnsupportedVersion {
                expected: SUPPORTED_VERSION,
                actual: raw.version,
            });
        }

        Ok(Self {
            version: raw.version,
            rng_seed: raw.rng_seed,
            counts: raw.counts,
        })
    }

    /// Returns the plan version.
    #[must_use]
    pub const fn version(&self) -> u32 {
        self.version
    }

    /// Returns the RNG seed for the run.
    #[must_use]
    pub const fn rng_seed(&self) -> u64 {
        self.rng_seed
    }

    /// Returns the count overrides keyed by entity name.
    #[must_use]
    pub const fn counts(&self) -> &BTreeMap<String, usize> {
        &self.counts
    }

    /// Returns the count override for an entity name.
    #[must_use]
    pub fn count_for(&self, entity_name: &str) -> Option<usize> {
        self.counts.get(entity_name).copied()
    }
}

/// Raw JSON representation for deserialization.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawFixturePlan {
    version: u32,
    rng_seed: u64,
    #[serde(default)]
    counts: BTreeMap<String, usize>,
}
