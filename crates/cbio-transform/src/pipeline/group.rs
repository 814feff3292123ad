use std::cmp::Ordering;
use std::collections::{HashMap, HashSet};

use cbio_ingest::Table;
use cbio_model::{CellValue, FunctionArgs, GroupSpec, Result};
use tracing::warn;

use super::{StageEnv, TableStep};
use crate::context::RunContext;
use crate::functions::{FunctionKind, ResolvedFunction};

impl TableStep for GroupSpec {
    fn apply(&self, table: &mut Table, ctx: &mut RunContext, _env: StageEnv) -> Result<()> {
        let grouped = group_rows(table, self, ctx)?;
        *table = grouped;
        Ok(())
    }

    fn step_name(&self) -> &'static str {
        "group"
    }
}

enum Aggregation {
    Function {
        column: usize,
        function: ResolvedFunction,
        args: FunctionArgs,
    },
    Constant(CellValue),
}

fn compare_keys(left: &[CellValue], right: &[CellValue]) -> Ordering {
    left.iter()
        .zip(right)
        .map(|(l, r)| l.compare(r))
        .find(|ordering| ordering.is_ne())
        .unwrap_or(Ordering::Equal)
}

/// Group rows by the `by` columns.
///
/// With aggregate rules, one row per distinct key is produced, sorted by key,
/// holding the key columns followed by one column per rule; keys containing a
/// missing cell are dropped. Without rules the table is projected onto the key
/// columns and duplicates are removed, keeping first occurrences.
pub fn group_rows(table: &Table, spec: &GroupSpec, ctx: &mut RunContext) -> Result<Table> {
    let by = spec.by.to_vec();
    let key_indices = by
        .iter()
        .map(|name| table.require_column(name))
        .collect::<Result<Vec<_>>>()?;

    if spec.aggregate.is_empty() {
        let mut out = Table::new(by);
        let mut seen = HashSet::new();
        for row in table.rows() {
            let key: Vec<CellValue> = key_indices.iter().map(|&idx| row[idx].clone()).collect();
            let fingerprint: Vec<Option<String>> = key.iter().map(CellValue::key).collect();
            if seen.insert(fingerprint) {
                out.push_row(key)?;
            }
        }
        return Ok(out);
    }

    let mut columns = by.clone();
    let mut rules = Vec::with_capacity(spec.aggregate.len());
    for rule in &spec.aggregate {
        let aggregation = if let Some(function) = &rule.function {
            let column = table.require_column(rule.source_column())?;
            let resolved = match ctx.resolve(&function.name, FunctionKind::Aggregate) {
                Ok(resolved) => resolved,
                Err(err) if err.is_lookup_failure() => {
                    warn!(
                        function = %function.name,
                        column = %rule.id,
                        error = %err,
                        "aggregate function not found, using min"
                    );
                    ctx.resolve("min", FunctionKind::Aggregate)?
                }
                Err(err) => return Err(err),
            };
            Aggregation::Function {
                column,
                function: resolved,
                args: function.args.clone(),
            }
        } else if let Some(value) = &rule.value {
            Aggregation::Constant(CellValue::from_json(value))
        } else {
            warn!(column = %rule.id, "aggregate rule has neither function nor value, skipping");
            continue;
        };
        columns.push(rule.id.clone());
        rules.push(aggregation);
    }

    let mut order: Vec<Vec<CellValue>> = Vec::new();
    let mut members: HashMap<Vec<String>, Vec<usize>> = HashMap::new();
    for (row_idx, row) in table.rows().iter().enumerate() {
        let key: Option<Vec<String>> = key_indices.iter().map(|&idx| row[idx].key()).collect();
        let Some(key) = key else {
            continue;
        };
        let entry = members.entry(key).or_default();
        if entry.is_empty() {
            order.push(key_indices.iter().map(|&idx| row[idx].clone()).collect());
        }
        entry.push(row_idx);
    }
    order.sort_by(|left, right| compare_keys(left, right));

    let mut out = Table::new(columns);
    for key_cells in order {
        let fingerprint: Vec<String> = key_cells.iter().map(CellValue::render).collect();
        let rows = members.get(&fingerprint).map(Vec::as_slice).unwrap_or_default();
        let mut out_row = key_cells;
        for rule in &rules {
            let value = match rule {
                Aggregation::Function {
                    column,
                    function,
                    args,
                } => {
                    let values = rows
                        .iter()
                        .map(|&row_idx| table.rows()[row_idx][*column].clone())
                        .collect();
                    ctx.invoke(function, CellValue::List(values), args)?
                }
                Aggregation::Constant(value) => value.clone(),
            };
            out_row.push(value);
        }
        out.push_row(out_row)?;
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::RunOptions;
    use cbio_model::{AggregateSpec, FunctionSpec, OneOrMany};

    fn context(dir: &tempfile::TempDir) -> RunContext {
        RunContext::new(
            RunOptions::new()
                .with_output_dir(dir.path().join("out"))
                .with_helper_dir(dir.path().join("helpers")),
        )
        .expect("context")
    }

    fn table() -> Table {
        Table::with_rows(
            vec!["GROUP".into(), "VALUE".into()],
            vec![
                vec![CellValue::text("g2"), CellValue::text("3")],
                vec![CellValue::text("g1"), CellValue::text("1")],
                vec![CellValue::Missing, CellValue::text("9")],
                vec![CellValue::text("g1"), CellValue::text("2")],
            ],
        )
        .expect("table")
    }

    fn aggregate(id: &str, source: Option<&str>, function: Option<&str>) -> AggregateSpec {
        AggregateSpec {
            id: id.into(),
            source_id: source.map(str::to_string),
            function: function.map(FunctionSpec::new),
            value: None,
        }
    }

    #[test]
    fn len_aggregate_yields_one_row_per_sorted_key() {
        let dir = tempfile::tempdir().expect("temp dir");
        let mut ctx = context(&dir);
        let spec = GroupSpec {
            by: OneOrMany::Many(vec!["GROUP".into()]),
            aggregate: vec![aggregate("COUNT", Some("VALUE"), Some("len"))],
        };
        let out = group_rows(&table(), &spec, &mut ctx).expect("group");
        assert_eq!(out.columns(), ["GROUP", "COUNT"]);
        assert_eq!(
            out.rows(),
            [
                vec![CellValue::text("g1"), CellValue::Integer(2)],
                vec![CellValue::text("g2"), CellValue::Integer(1)],
            ]
        );
    }

    #[test]
    fn unresolved_function_falls_back_to_min() {
        let dir = tempfile::tempdir().expect("temp dir");
        let mut ctx = context(&dir);
        let spec = GroupSpec {
            by: OneOrMany::One("GROUP".into()),
            aggregate: vec![
                aggregate("VALUE", None, Some("no_such_function")),
                AggregateSpec {
                    id: "SOURCE".into(),
                    source_id: None,
                    function: None,
                    value: Some("lab".into()),
                },
            ],
        };
        let out = group_rows(&table(), &spec, &mut ctx).expect("group");
        assert_eq!(out.rows()[0][1], CellValue::text("1"));
        assert_eq!(out.rows()[1][2], CellValue::text("lab"));
    }

    #[test]
    fn without_rules_projects_distinct_keys() {
        let dir = tempfile::tempdir().expect("temp dir");
        let mut ctx = context(&dir);
        let spec = GroupSpec {
            by: OneOrMany::One("GROUP".into()),
            aggregate: Vec::new(),
        };
        let out = group_rows(&table(), &spec, &mut ctx).expect("group");
        assert_eq!(out.columns(), ["GROUP"]);
        let keys: Vec<String> = out.rows().iter().map(|row| row[0].render()).collect();
        assert_eq!(keys, ["g2", "g1", ""]);
    }
}
