use cbio_ingest::Table;
use cbio_model::{CellValue, DeriveSpec, Result};
use tracing::warn;

use super::{StageEnv, TableStep};
use crate::context::RunContext;
use crate::functions::FunctionKind;

impl TableStep for DeriveSpec {
    fn apply(&self, table: &mut Table, ctx: &mut RunContext, _env: StageEnv) -> Result<()> {
        derive_columns(table, std::slice::from_ref(self), ctx)
    }

    fn step_name(&self) -> &'static str {
        "create"
    }
}

/// Add one column per rule, computed from the rule's source columns.
///
/// Each row's source values reach the function as a list. Incomplete rules and
/// rules whose function cannot be found are skipped with a warning.
pub fn derive_columns(table: &mut Table, rules: &[DeriveSpec], ctx: &mut RunContext) -> Result<()> {
    for rule in rules {
        let (Some(new_column), Some(sources), Some(function)) =
            (&rule.new_column, &rule.source_ids, &rule.function)
        else {
            warn!(
                new_column = ?rule.new_column,
                "function, new_column and source_ids are required for column creation, ignoring rule"
            );
            continue;
        };
        let resolved = match ctx.resolve(&function.name, FunctionKind::Transform) {
            Ok(resolved) => resolved,
            Err(err) if err.is_lookup_failure() => {
                warn!(function = %function.name, error = %err, "invalid function, column not created");
                continue;
            }
            Err(err) => return Err(err),
        };
        let indices = sources
            .iter()
            .map(|name| table.require_column(name))
            .collect::<Result<Vec<_>>>()?;
        let mut values = Vec::with_capacity(table.height());
        for row in table.rows() {
            let inputs = indices.iter().map(|&idx| row[idx].clone()).collect();
            values.push(ctx.invoke(&resolved, CellValue::List(inputs), &function.args)?);
        }
        table.set_column(new_column, values)?;
    }
    Ok(())
}
