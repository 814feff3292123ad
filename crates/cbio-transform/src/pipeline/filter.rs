use std::collections::HashSet;

use cbio_ingest::Table;
use cbio_model::{CellValue, FilterRule, FilterSpec, ImportError, Result};
use regex::Regex;

use super::{StageEnv, TableStep};
use crate::context::RunContext;
use crate::functions::FunctionKind;

impl TableStep for FilterSpec {
    fn apply(&self, table: &mut Table, ctx: &mut RunContext, _env: StageEnv) -> Result<()> {
        apply_filter(table, &self.rule()?, ctx)
    }

    fn step_name(&self) -> &'static str {
        "filter"
    }
}

/// Keep the rows matching `rule`, preserving their order.
pub fn apply_filter(table: &mut Table, rule: &FilterRule, ctx: &mut RunContext) -> Result<()> {
    match rule {
        FilterRule::OneOf { column, values } => {
            let idx = table.require_column(column)?;
            let allowed: HashSet<&str> = values.iter().map(String::as_str).collect();
            table.retain_rows(|row| {
                Ok(row[idx]
                    .key()
                    .is_some_and(|key| allowed.contains(key.as_str())))
            })
        }
        FilterRule::Regex { column, pattern } => {
            let idx = table.require_column(column)?;
            let regex = Regex::new(pattern)
                .map_err(|err| ImportError::parse(format!("Filter regex {pattern}: {err}")))?;
            table.retain_rows(|row| Ok(row[idx].as_text().is_some_and(|text| regex.is_match(text))))
        }
        FilterRule::Operator { column, op, arg } => {
            let idx = table.require_column(column)?;
            table.retain_rows(|row| {
                let cell = &row[idx];
                Ok(!cell.is_missing() && !arg.is_missing() && op.holds(cell.compare(arg)))
            })
        }
        FilterRule::Predicate { columns, function } => {
            let indices = columns
                .iter()
                .map(|column| table.require_column(column))
                .collect::<Result<Vec<_>>>()?;
            let resolved = ctx.resolve(&function.name, FunctionKind::Filter)?;
            table.retain_rows(|row| {
                let value = match indices.as_slice() {
                    [single] => row[*single].clone(),
                    many => CellValue::List(many.iter().map(|&idx| row[idx].clone()).collect()),
                };
                Ok(ctx.invoke(&resolved, value, &function.args)?.is_truthy())
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::RunOptions;
    use cbio_model::{CompareOp, FunctionSpec};
    use proptest::prelude::*;

    fn context(dir: &tempfile::TempDir) -> RunContext {
        RunContext::new(
            RunOptions::new()
                .with_output_dir(dir.path().join("out"))
                .with_helper_dir(dir.path().join("helpers")),
        )
        .expect("context")
    }

    fn table(values: &[&str]) -> Table {
        Table::with_rows(
            vec!["TYPE".into()],
            values
                .iter()
                .map(|value| vec![CellValue::from_field(value)])
                .collect(),
        )
        .expect("table")
    }

    fn column(table: &Table) -> Vec<String> {
        table.rows().iter().map(|row| row[0].render()).collect()
    }

    #[test]
    fn one_of_keeps_listed_values_in_order() {
        let dir = tempfile::tempdir().expect("temp dir");
        let mut ctx = context(&dir);
        let mut table = table(&["A", "B", "C"]);
        let rule = FilterRule::OneOf {
            column: "TYPE".into(),
            values: vec!["B".into(), "A".into()],
        };
        apply_filter(&mut table, &rule, &mut ctx).expect("filter");
        assert_eq!(column(&table), ["A", "B"]);
    }

    #[test]
    fn regex_skips_missing_cells() {
        let dir = tempfile::tempdir().expect("temp dir");
        let mut ctx = context(&dir);
        let mut table = table(&["tumor", "", "normal", "tumor-2"]);
        let rule = FilterRule::Regex {
            column: "TYPE".into(),
            pattern: "^tum".into(),
        };
        apply_filter(&mut table, &rule, &mut ctx).expect("filter");
        assert_eq!(column(&table), ["tumor", "tumor-2"]);
    }

    #[test]
    fn operator_compares_numerically() {
        let dir = tempfile::tempdir().expect("temp dir");
        let mut ctx = context(&dir);
        let mut table = table(&["9", "10", "", "100"]);
        let rule = FilterRule::Operator {
            column: "TYPE".into(),
            op: CompareOp::Ge,
            arg: CellValue::Integer(10),
        };
        apply_filter(&mut table, &rule, &mut ctx).expect("filter");
        assert_eq!(column(&table), ["10", "100"]);
    }

    #[test]
    fn predicate_uses_filter_function() {
        let dir = tempfile::tempdir().expect("temp dir");
        let mut ctx = context(&dir);
        let mut table = table(&["a", "b", "a", "c", "b"]);
        let rule = FilterRule::Predicate {
            columns: vec!["TYPE".into()],
            function: FunctionSpec::new("is_unique").with_arg("context", "types"),
        };
        apply_filter(&mut table, &rule, &mut ctx).expect("filter");
        assert_eq!(column(&table), ["a", "b", "c"]);
    }

    #[test]
    fn unknown_column_is_input_error() {
        let dir = tempfile::tempdir().expect("temp dir");
        let mut ctx = context(&dir);
        let mut table = table(&["a"]);
        let rule = FilterRule::OneOf {
            column: "MISSING".into(),
            values: vec!["a".into()],
        };
        assert!(matches!(
            apply_filter(&mut table, &rule, &mut ctx),
            Err(ImportError::Input(_))
        ));
    }

    proptest! {
        #[test]
        fn one_of_preserves_relative_order(values in proptest::collection::vec("[A-D]", 0..40)) {
            let dir = tempfile::tempdir().expect("temp dir");
            let mut ctx = context(&dir);
            let refs: Vec<&str> = values.iter().map(String::as_str).collect();
            let mut filtered = table(&refs);
            let rule = FilterRule::OneOf {
                column: "TYPE".into(),
                values: vec!["A".into(), "B".into()],
            };
            apply_filter(&mut filtered, &rule, &mut ctx).expect("filter");
            let expected: Vec<String> = values
                .iter()
                .filter(|value| value.as_str() == "A" || value.as_str() == "B")
                .cloned()
                .collect();
            prop_assert_eq!(column(&filtered), expected);
        }
    }
}
