use cbio_model::{CellValue, ImportError, Result};
use serde_json::Value;

/// In-memory table: ordered column names plus rows of cells.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Table {
    columns: Vec<String>,
    rows: Vec<Vec<CellValue>>,
}

impl Table {
    pub fn new(columns: Vec<String>) -> Self {
        Self {
            columns,
            rows: Vec::new(),
        }
    }

    pub fn with_rows(columns: Vec<String>, rows: Vec<Vec<CellValue>>) -> Result<Self> {
        let mut table = Self::new(columns);
        for row in rows {
            table.push_row(row)?;
        }
        Ok(table)
    }

    /// Build a table from a literal row matrix whose first row is the header.
    pub fn from_json_rows(rows: &[Vec<Value>]) -> Result<Self> {
        let Some((header, data)) = rows.split_first() else {
            return Ok(Self::default());
        };
        let columns = header
            .iter()
            .map(|value| CellValue::from_json(value).render())
            .collect();
        let mut table = Self::new(columns);
        for (idx, row) in data.iter().enumerate() {
            if row.len() != table.width() {
                return Err(ImportError::input(format!(
                    "Invalid data: row {} has {} values, header has {}!",
                    idx + 1,
                    row.len(),
                    table.width()
                )));
            }
            let cells = row
                .iter()
                .map(|value| match value {
                    Value::String(text) => CellValue::from_field(text),
                    other => CellValue::from_json(other),
                })
                .collect();
            table.rows.push(cells);
        }
        Ok(table)
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn rows(&self) -> &[Vec<CellValue>] {
        &self.rows
    }

    pub fn height(&self) -> usize {
        self.rows.len()
    }

    pub fn width(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|column| column == name)
    }

    /// Index of `name`, or an input error listing the available columns.
    pub fn require_column(&self, name: &str) -> Result<usize> {
        self.column_index(name).ok_or_else(|| {
            ImportError::input(format!(
                "Could not find column {name}. Existing columns: {:?}",
                self.columns
            ))
        })
    }

    /// Names from `wanted` that are not columns of this table.
    pub fn missing_columns<'a>(&self, wanted: impl IntoIterator<Item = &'a str>) -> Vec<String> {
        wanted
            .into_iter()
            .filter(|name| self.column_index(name).is_none())
            .map(str::to_string)
            .collect()
    }

    pub fn push_row(&mut self, row: Vec<CellValue>) -> Result<()> {
        if row.len() != self.width() {
            return Err(ImportError::input(format!(
                "Row has {} values, table has {} columns",
                row.len(),
                self.width()
            )));
        }
        self.rows.push(row);
        Ok(())
    }

    /// Keep the rows for which `keep` returns true, preserving order.
    pub fn retain_rows<F>(&mut self, mut keep: F) -> Result<()>
    where
        F: FnMut(&[CellValue]) -> Result<bool>,
    {
        let mut kept = Vec::with_capacity(self.rows.len());
        for row in self.rows.drain(..) {
            if keep(&row)? {
                kept.push(row);
            }
        }
        self.rows = kept;
        Ok(())
    }

    /// Add a column, or replace an existing column of the same name.
    pub fn set_column(&mut self, name: &str, values: Vec<CellValue>) -> Result<()> {
        if values.len() != self.height() {
            return Err(ImportError::input(format!(
                "Column {name} has {} values, table has {} rows",
                values.len(),
                self.height()
            )));
        }
        match self.column_index(name) {
            Some(idx) => {
                for (row, value) in self.rows.iter_mut().zip(values) {
                    row[idx] = value;
                }
            }
            None => {
                self.columns.push(name.to_string());
                for (row, value) in self.rows.iter_mut().zip(values) {
                    row.push(value);
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample() -> Table {
        Table::with_rows(
            vec!["ID".into(), "AGE".into()],
            vec![
                vec![CellValue::text("P1"), CellValue::text("30")],
                vec![CellValue::text("P2"), CellValue::Missing],
            ],
        )
        .expect("table")
    }

    #[test]
    fn literal_rows_keep_header_and_blank_cells() {
        let rows: Vec<Vec<Value>> = serde_json::from_value(json!([
            ["TYPE", "NAME"],
            ["brca", ""],
            ["luad", 3]
        ]))
        .expect("rows");
        let table = Table::from_json_rows(&rows).expect("table");
        assert_eq!(table.columns(), ["TYPE", "NAME"]);
        assert_eq!(table.rows()[0][1], CellValue::Missing);
        assert_eq!(table.rows()[1][1], CellValue::Integer(3));
    }

    #[test]
    fn ragged_literal_rows_are_rejected() {
        let rows: Vec<Vec<Value>> =
            serde_json::from_value(json!([["A", "B"], ["1"]])).expect("rows");
        assert!(matches!(
            Table::from_json_rows(&rows),
            Err(ImportError::Input(_))
        ));
    }

    #[test]
    fn set_column_replaces_or_appends() {
        let mut table = sample();
        table
            .set_column("AGE", vec![CellValue::Integer(1), CellValue::Integer(2)])
            .expect("replace");
        table
            .set_column("FLAG", vec![CellValue::Boolean(true), CellValue::Missing])
            .expect("append");
        assert_eq!(table.columns(), ["ID", "AGE", "FLAG"]);
        assert_eq!(table.rows()[1][1], CellValue::Integer(2));
    }

    #[test]
    fn retain_rows_preserves_order() {
        let mut table = sample();
        table
            .retain_rows(|row| Ok(row[1].is_missing()))
            .expect("retain");
        assert_eq!(table.height(), 1);
        assert_eq!(table.rows()[0][0], CellValue::text("P2"));
    }

    #[test]
    fn require_column_lists_existing_columns() {
        let err = sample().require_column("SEX").unwrap_err();
        assert!(err.to_string().contains("AGE"));
        assert_eq!(sample().missing_columns(["ID", "SEX"]), vec!["SEX"]);
    }
}
