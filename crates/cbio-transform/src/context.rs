//! Run configuration and the context threaded through every pipeline call.
//!
//! [`RunContext`] owns the function resolver, the state of the built-in
//! functions (anonymization mappings, uniqueness sets, seeded generator) and
//! the cosmetic generator used for cancer type colors.

use std::fs;
use std::path::{Path, PathBuf};

use cbio_model::{CellValue, FunctionArgs, FunctionSpec, Result};
use rand::SeedableRng;
use rand::rngs::StdRng;
use tracing::info;

use crate::functions::{FunctionKind, FunctionState, ResolvedFunction, Resolver};

pub const DEFAULT_SEED: u64 = 42;
pub const DEFAULT_OUTPUT_DIR: &str = ".tmp";
pub const DEFAULT_HELPER_DIR: &str = ".helpers";

/// Paths, seed and flags for one import run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunOptions {
    /// Prefix joined onto every relative source file.
    pub source_prefix: PathBuf,
    /// Directory receiving the generated study files.
    pub output_dir: PathBuf,
    /// Directory holding anonymization mapping files.
    pub helper_dir: PathBuf,
    /// Lua function-definition file.
    pub functions_file: Option<PathBuf>,
    /// Seed for generated ids and the plugin's random sequence.
    pub seed: u64,
    /// Remove the helper directory's files before the run.
    pub clean_state: bool,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            source_prefix: PathBuf::new(),
            output_dir: PathBuf::from(DEFAULT_OUTPUT_DIR),
            helper_dir: PathBuf::from(DEFAULT_HELPER_DIR),
            functions_file: None,
            seed: DEFAULT_SEED,
            clean_state: false,
        }
    }
}

impl RunOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_source_prefix(mut self, prefix: impl Into<PathBuf>) -> Self {
        self.source_prefix = prefix.into();
        self
    }

    pub fn with_output_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.output_dir = dir.into();
        self
    }

    pub fn with_helper_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.helper_dir = dir.into();
        self
    }

    pub fn with_functions_file(mut self, path: Option<PathBuf>) -> Self {
        self.functions_file = path;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    pub fn with_clean_state(mut self, clean: bool) -> Self {
        self.clean_state = clean;
        self
    }
}

#[derive(Debug)]
pub struct RunContext {
    options: RunOptions,
    resolver: Resolver,
    state: FunctionState,
    cosmetic_rng: StdRng,
}

impl RunContext {
    /// Prepare the output and helper directories and build the context.
    pub fn new(options: RunOptions) -> Result<Self> {
        fs::create_dir_all(&options.output_dir)?;
        fs::create_dir_all(&options.helper_dir)?;
        if options.clean_state {
            clean_helper_dir(&options.helper_dir)?;
        }
        Ok(Self {
            resolver: Resolver::new(options.functions_file.clone(), options.seed),
            state: FunctionState::new(&options.helper_dir, options.seed),
            cosmetic_rng: StdRng::seed_from_u64(options.seed),
            options,
        })
    }

    pub fn options(&self) -> &RunOptions {
        &self.options
    }

    pub fn source_prefix(&self) -> &Path {
        &self.options.source_prefix
    }

    pub fn output_path(&self, file_name: &str) -> PathBuf {
        self.options.output_dir.join(file_name)
    }

    /// Reseed the generator used for cosmetic choices such as colors.
    pub fn seed_cosmetics(&mut self, seed: u64) {
        self.cosmetic_rng = StdRng::seed_from_u64(seed);
    }

    pub fn cosmetic_rng(&mut self) -> &mut StdRng {
        &mut self.cosmetic_rng
    }

    pub fn resolve(&mut self, name: &str, kind: FunctionKind) -> Result<ResolvedFunction> {
        self.resolver.resolve(name, kind)
    }

    pub fn invoke(
        &mut self,
        function: &ResolvedFunction,
        value: CellValue,
        args: &FunctionArgs,
    ) -> Result<CellValue> {
        match function {
            ResolvedFunction::Builtin { function, .. } => function(&mut self.state, value, args),
            ResolvedFunction::Plugin { name, function } => {
                // Plugin functions can only exist once the plugin is loaded.
                let plugin = self.resolver.plugin()?;
                plugin.call(name, function, &value, args)
            }
        }
    }

    /// Resolve and invoke in one step.
    pub fn call(
        &mut self,
        spec: &FunctionSpec,
        kind: FunctionKind,
        value: CellValue,
    ) -> Result<CellValue> {
        let function = self.resolve(&spec.name, kind)?;
        self.invoke(&function, value, &spec.args)
    }
}

/// Remove the top-level files of the helper directory, keeping subdirectories.
fn clean_helper_dir(dir: &Path) -> Result<()> {
    let mut removed = 0usize;
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        if entry.file_type()?.is_file() {
            fs::remove_file(entry.path())?;
            removed += 1;
        }
    }
    info!(dir = %dir.display(), removed, "cleaned helper directory");
    Ok(())
}
