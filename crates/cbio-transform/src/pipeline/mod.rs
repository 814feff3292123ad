//! Table pipeline with ordered stage execution.
//!
//! A loaded [`Table`] passes through the entity's preprocessing stages in
//! order before it reaches the projector:
//!
//! 1. **filter** - keep rows matching a rule; stages compose as logical AND
//! 2. **join** - merge a second table on key columns
//! 3. **group** - aggregate rows by key columns
//! 4. **create** - derive a new column from existing ones
//!
//! The order above is only the legacy default; a `preprocess` list runs in the
//! order it is written (see [`EntitySection::stages`]).

mod derive;
mod filter;
mod group;
mod join;

use cbio_ingest::{Table, load_source};
use cbio_model::{EntitySection, PreprocessStage, Result};
use tracing::{debug, info_span};

use crate::context::RunContext;

pub use derive::derive_columns;
pub use filter::apply_filter;
pub use group::group_rows;
pub use join::join_tables;

/// Settings shared by every stage of one entity.
#[derive(Debug, Clone, Copy)]
pub struct StageEnv {
    /// Delimiter of the entity's source table, inherited by joined tables.
    pub delimiter: u8,
}

/// A single preprocessing step over an in-memory table.
pub trait TableStep {
    /// Apply the step, replacing or mutating `table` in place.
    fn apply(&self, table: &mut Table, ctx: &mut RunContext, env: StageEnv) -> Result<()>;

    /// Human-readable name for logging.
    fn step_name(&self) -> &'static str;
}

fn as_step(stage: &PreprocessStage) -> &dyn TableStep {
    match stage {
        PreprocessStage::Filter(spec) => spec,
        PreprocessStage::Join(spec) => spec,
        PreprocessStage::Group(spec) => spec,
        PreprocessStage::Create(spec) => spec,
    }
}

/// An ordered list of stages.
#[derive(Debug, Clone, Default)]
pub struct TablePipeline {
    stages: Vec<PreprocessStage>,
}

impl TablePipeline {
    pub fn new(stages: Vec<PreprocessStage>) -> Self {
        Self { stages }
    }

    pub fn for_section(section: &EntitySection) -> Self {
        Self::new(section.stages())
    }

    pub fn step_names(&self) -> Vec<&'static str> {
        self.stages.iter().map(|stage| as_step(stage).step_name()).collect()
    }

    pub fn execute(&self, table: &mut Table, ctx: &mut RunContext, env: StageEnv) -> Result<()> {
        if !self.stages.is_empty() {
            debug!(steps = ?self.step_names(), "preprocessing");
        }
        for (idx, stage) in self.stages.iter().enumerate() {
            let step = as_step(stage);
            let span = info_span!("stage", index = idx, step = step.step_name());
            let _guard = span.enter();
            let before = table.height();
            step.apply(table, ctx, env)?;
            debug!(rows_before = before, rows_after = table.height(), "stage applied");
        }
        Ok(())
    }
}

/// Load an entity's table and run its preprocessing stages.
pub fn load_table(section: &EntitySection, ctx: &mut RunContext, env: StageEnv) -> Result<Table> {
    let mut table = load_source(&section.file, ctx.source_prefix(), env.delimiter)?;
    TablePipeline::for_section(section).execute(&mut table, ctx, env)?;
    Ok(table)
}
