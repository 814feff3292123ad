//! Table transformation engine for the study importer.
//!
//! - **functions**: built-in and plugin function resolution
//! - **pipeline**: filter, join, group and create stages
//! - **projector**: row projection into portal-formatted text
//! - **conversion**: optional per-column type conversion
//! - **context**: run options and the state shared by all entities

pub mod context;
pub mod conversion;
pub mod functions;
pub mod pipeline;
pub mod projector;

pub use context::{
    DEFAULT_HELPER_DIR, DEFAULT_OUTPUT_DIR, DEFAULT_SEED, RunContext, RunOptions,
};
pub use conversion::convert;
pub use functions::{FunctionKind, ResolvedFunction, Resolver};
pub use pipeline::{StageEnv, TablePipeline, TableStep, load_table};
pub use projector::{OutputLayout, Projection, Projector};
