//! Named transformation, filter and aggregate functions.
//!
//! Names resolve against the built-in registry ([`builtins`]) and an optional
//! Lua plugin ([`plugin`]). Mutable state shared by the built-ins (mapping
//! files, uniqueness sets, the seeded generator) lives in [`FunctionState`].

pub mod anonymize;
pub mod args;
pub mod builtins;
pub mod plugin;
pub mod resolver;

use std::collections::btree_map::Entry;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::path::{Path, PathBuf};

use cbio_model::Result;
use rand::SeedableRng;
use rand::rngs::StdRng;

pub use anonymize::AnonymizationMapping;
pub use builtins::BuiltinFn;
pub use resolver::{FunctionKind, ResolvedFunction, Resolver};

/// Run-scoped state consulted by built-in functions.
#[derive(Debug)]
pub struct FunctionState {
    helper_dir: PathBuf,
    mappings: BTreeMap<String, AnonymizationMapping>,
    unique_sets: HashMap<String, HashSet<String>>,
    rng: StdRng,
}

impl FunctionState {
    pub fn new(helper_dir: impl Into<PathBuf>, seed: u64) -> Self {
        Self {
            helper_dir: helper_dir.into(),
            mappings: BTreeMap::new(),
            unique_sets: HashMap::new(),
            rng: StdRng::seed_from_u64(seed),
        }
    }

    pub fn helper_dir(&self) -> &Path {
        &self.helper_dir
    }

    /// Mapping for `file_name`, loaded from the helper directory on first use.
    pub fn mapping(&mut self, file_name: &str) -> Result<&mut AnonymizationMapping> {
        match self.mappings.entry(file_name.to_string()) {
            Entry::Occupied(entry) => Ok(entry.into_mut()),
            Entry::Vacant(entry) => {
                let mapping = AnonymizationMapping::load(&self.helper_dir.join(file_name))?;
                Ok(entry.insert(mapping))
            }
        }
    }

    /// True the first time `value` is seen within `context`.
    pub fn first_occurrence(&mut self, context: &str, value: String) -> bool {
        self.unique_sets
            .entry(context.to_string())
            .or_default()
            .insert(value)
    }

    pub fn rng(&mut self) -> &mut StdRng {
        &mut self.rng
    }
}
