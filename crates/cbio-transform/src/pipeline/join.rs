use std::collections::{HashMap, HashSet};

use cbio_ingest::{Table, parse_delimiter, read_table, resolve_source_path};
use cbio_model::{CellValue, ImportError, JoinKind, JoinSpec, Result};

use super::{StageEnv, TableStep};
use crate::context::RunContext;

impl TableStep for JoinSpec {
    fn apply(&self, table: &mut Table, ctx: &mut RunContext, env: StageEnv) -> Result<()> {
        let delimiter = match &self.delimiter {
            Some(raw) => parse_delimiter(raw)?,
            None => env.delimiter,
        };
        let right = read_table(&resolve_source_path(ctx.source_prefix(), &self.file), delimiter)?;
        let joined = join_tables(table, &right, self)?;
        *table = joined;
        Ok(())
    }

    fn step_name(&self) -> &'static str {
        "join"
    }
}

fn key_of(row: &[CellValue], indices: &[usize]) -> Option<Vec<String>> {
    indices.iter().map(|&idx| row[idx].key()).collect()
}

/// Merge `left` and `right` on key columns.
///
/// Left rows keep their order, each followed by its matches in right order;
/// unmatched right rows (right and outer joins) follow in right order. A key
/// with the same name on both sides appears once. Missing keys never match.
pub fn join_tables(left: &Table, right: &Table, spec: &JoinSpec) -> Result<Table> {
    let left_on = spec.left_on.to_vec();
    let right_on = spec.right_on.to_vec();
    if left_on.len() != right_on.len() || left_on.is_empty() {
        return Err(ImportError::join(format!(
            "left_on {left_on:?} and right_on {right_on:?} must name the same number of columns"
        )));
    }
    let missing_left = left.missing_columns(left_on.iter().map(String::as_str));
    let missing_right = right.missing_columns(right_on.iter().map(String::as_str));
    if !missing_left.is_empty() || !missing_right.is_empty() {
        return Err(ImportError::join(format!(
            "Join keys not found (left missing {missing_left:?}, right missing {missing_right:?}). \
             Left columns: {:?}. Right columns: {:?}",
            left.columns(),
            right.columns()
        )));
    }
    let left_keys: Vec<usize> = left_on
        .iter()
        .filter_map(|name| left.column_index(name))
        .collect();
    let right_keys: Vec<usize> = right_on
        .iter()
        .filter_map(|name| right.column_index(name))
        .collect();

    // Right columns folded into the matching left key column.
    let shared: HashMap<usize, usize> = left_on
        .iter()
        .zip(&right_on)
        .filter(|(l, r)| l == r)
        .filter_map(|(l, r)| Some((right.column_index(r)?, left.column_index(l)?)))
        .collect();
    let right_kept: Vec<usize> = (0..right.width())
        .filter(|idx| !shared.contains_key(idx))
        .collect();

    let (lsuffix, rsuffix) = spec.suffixes();
    let right_names: HashSet<&str> = right_kept
        .iter()
        .map(|&idx| right.columns()[idx].as_str())
        .collect();
    let shared_left: HashSet<usize> = shared.values().copied().collect();
    let mut columns: Vec<String> = left
        .columns()
        .iter()
        .enumerate()
        .map(|(idx, name)| {
            if !shared_left.contains(&idx) && right_names.contains(name.as_str()) {
                format!("{name}{lsuffix}")
            } else {
                name.clone()
            }
        })
        .collect();
    for &idx in &right_kept {
        let name = &right.columns()[idx];
        if left.column_index(name).is_some() {
            columns.push(format!("{name}{rsuffix}"));
        } else {
            columns.push(name.clone());
        }
    }

    let mut index: HashMap<Vec<String>, Vec<usize>> = HashMap::new();
    for (row_idx, row) in right.rows().iter().enumerate() {
        if let Some(key) = key_of(row, &right_keys) {
            index.entry(key).or_default().push(row_idx);
        }
    }

    let combine = |left_row: Option<&Vec<CellValue>>, right_row: Option<&Vec<CellValue>>| {
        let mut row: Vec<CellValue> = match left_row {
            Some(cells) => cells.clone(),
            None => vec![CellValue::Missing; left.width()],
        };
        if let (None, Some(cells)) = (left_row, right_row) {
            for (&right_idx, &left_idx) in &shared {
                row[left_idx] = cells[right_idx].clone();
            }
        }
        for &idx in &right_kept {
            row.push(right_row.map(|cells| cells[idx].clone()).unwrap_or_default());
        }
        row
    };

    let mut out = Table::new(columns);
    let mut matched_right = vec![false; right.height()];
    if spec.how == JoinKind::Right {
        let mut left_index: HashMap<Vec<String>, Vec<usize>> = HashMap::new();
        for (row_idx, row) in left.rows().iter().enumerate() {
            if let Some(key) = key_of(row, &left_keys) {
                left_index.entry(key).or_default().push(row_idx);
            }
        }
        for right_row in right.rows() {
            let matches = key_of(right_row, &right_keys)
                .and_then(|key| left_index.get(&key))
                .map(Vec::as_slice)
                .unwrap_or_default();
            if matches.is_empty() {
                out.push_row(combine(None, Some(right_row)))?;
            }
            for &left_idx in matches {
                out.push_row(combine(Some(&left.rows()[left_idx]), Some(right_row)))?;
            }
        }
        return Ok(out);
    }

    for left_row in left.rows() {
        let matches = key_of(left_row, &left_keys)
            .and_then(|key| index.get(&key))
            .map(Vec::as_slice)
            .unwrap_or_default();
        if matches.is_empty() && matches!(spec.how, JoinKind::Left | JoinKind::Outer) {
            out.push_row(combine(Some(left_row), None))?;
        }
        for &right_idx in matches {
            matched_right[right_idx] = true;
            out.push_row(combine(Some(left_row), Some(&right.rows()[right_idx])))?;
        }
    }
    if spec.how == JoinKind::Outer {
        for (right_idx, right_row) in right.rows().iter().enumerate() {
            if !matched_right[right_idx] {
                out.push_row(combine(None, Some(right_row)))?;
            }
        }
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use cbio_model::OneOrMany;

    fn table(columns: &[&str], rows: &[&[&str]]) -> Table {
        Table::with_rows(
            columns.iter().map(|name| name.to_string()).collect(),
            rows.iter()
                .map(|row| row.iter().map(|value| CellValue::from_field(value)).collect())
                .collect(),
        )
        .expect("table")
    }

    fn spec(left_on: &str, right_on: &str, how: JoinKind) -> JoinSpec {
        JoinSpec {
            file: "other.tsv".into(),
            delimiter: None,
            left_on: OneOrMany::One(left_on.into()),
            right_on: OneOrMany::One(right_on.into()),
            how,
            lsuffix: None,
            rsuffix: None,
        }
    }

    fn rendered(table: &Table) -> Vec<Vec<String>> {
        table
            .rows()
            .iter()
            .map(|row| row.iter().map(CellValue::render).collect())
            .collect()
    }

    #[test]
    fn inner_join_shares_same_named_key_and_suffixes_collisions() {
        let left = table(&["ID", "AGE"], &[&["P1", "30"], &["P2", "40"], &["", "50"]]);
        let right = table(&["ID", "AGE", "SITE"], &[&["P2", "41", "BRNO"], &["", "0", "X"]]);
        let out = join_tables(&left, &right, &spec("ID", "ID", JoinKind::Inner)).expect("join");
        assert_eq!(out.columns(), ["ID", "AGE_x", "AGE_y", "SITE"]);
        assert_eq!(rendered(&out), vec![vec!["P2", "40", "41", "BRNO"]]);
    }

    #[test]
    fn left_join_keeps_unmatched_rows() {
        let left = table(&["ID"], &[&["P1"], &["P2"]]);
        let right = table(&["PID", "SITE"], &[&["P2", "BRNO"], &["P2", "PRAHA"]]);
        let out = join_tables(&left, &right, &spec("ID", "PID", JoinKind::Left)).expect("join");
        assert_eq!(out.columns(), ["ID", "PID", "SITE"]);
        assert_eq!(
            rendered(&out),
            vec![
                vec!["P1", "", ""],
                vec!["P2", "P2", "BRNO"],
                vec!["P2", "P2", "PRAHA"]
            ]
        );
    }

    #[test]
    fn right_and_outer_joins_emit_unmatched_right_rows() {
        let left = table(&["ID", "AGE"], &[&["P1", "30"]]);
        let right = table(&["ID", "SITE"], &[&["P9", "X"], &["P1", "Y"]]);
        let right_join =
            join_tables(&left, &right, &spec("ID", "ID", JoinKind::Right)).expect("join");
        assert_eq!(
            rendered(&right_join),
            vec![vec!["P9", "", "X"], vec!["P1", "30", "Y"]]
        );
        let outer = join_tables(&left, &right, &spec("ID", "ID", JoinKind::Outer)).expect("join");
        assert_eq!(
            rendered(&outer),
            vec![vec!["P1", "30", "Y"], vec!["P9", "", "X"]]
        );
    }

    #[test]
    fn missing_key_lists_both_column_sets() {
        let left = table(&["ID"], &[]);
        let right = table(&["PID"], &[]);
        let err = join_tables(&left, &right, &spec("ID", "SUBJECT", JoinKind::Inner)).unwrap_err();
        let message = err.to_string();
        assert!(matches!(err, ImportError::Join(_)));
        assert!(message.contains("PID"));
        assert!(message.contains("SUBJECT"));
    }
}
