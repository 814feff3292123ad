//! Row projection: turns a preprocessed table into portal-formatted output.
//!
//! For every row and every column descriptor, in declaration order:
//!
//! 1. take the constant or the row value(s) of the source column(s)
//! 2. coerce to text (element-wise for lists, missing stays missing)
//! 3. check the destination column's allow-list
//! 4. apply the column function
//! 5. replace a missing result with the na-value
//! 6. apply the optional conversion, falling back to the na-value
//! 7. reject empty values in required columns

use std::collections::HashMap;
use std::io::Write;

use cbio_ingest::Table;
use cbio_model::{CellValue, ColumnDescriptor, ColumnSource, ImportError, Result};
use tracing::{debug, warn};

use crate::context::RunContext;
use crate::conversion::convert;
use crate::functions::{FunctionKind, ResolvedFunction};

/// Which header blocks precede the data rows.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OutputLayout {
    pub comment_rows: bool,
    pub header: bool,
}

impl OutputLayout {
    /// Four comment rows plus header (clinical attribute files).
    pub const CLINICAL: Self = Self {
        comment_rows: true,
        header: true,
    };
    /// Header row only.
    pub const HEADER_ONLY: Self = Self {
        comment_rows: false,
        header: true,
    };
    /// Bare data rows.
    pub const DATA_ONLY: Self = Self {
        comment_rows: false,
        header: false,
    };
}

enum Source {
    Constant(CellValue),
    Column(usize),
    Columns(Vec<usize>),
}

struct PreparedColumn<'a> {
    descriptor: &'a ColumnDescriptor,
    output: String,
    source: Source,
    function: Option<ResolvedFunction>,
    required: bool,
    allowed: Option<&'a [String]>,
}

/// A [`Projector`] paired with a table whose columns it has checked.
#[derive(Debug, Clone, Copy)]
pub struct Projection<'a> {
    projector: &'a Projector,
    table: &'a Table,
}

impl Projection<'_> {
    pub fn write<W: Write>(
        &self,
        ctx: &mut RunContext,
        out: &mut W,
        layout: OutputLayout,
    ) -> Result<usize> {
        if layout.comment_rows {
            self.projector.write_comment_rows(out)?;
        }
        if layout.header {
            self.projector.write_header(out)?;
        }
        self.projector.write_rows(self.table, ctx, out)
    }
}

#[derive(Debug, Clone)]
pub struct Projector {
    entity: String,
    columns: Vec<ColumnDescriptor>,
    required: Vec<String>,
    allowed: HashMap<String, Vec<String>>,
    na_value: String,
}

impl Projector {
    pub fn new(columns: Vec<ColumnDescriptor>) -> Self {
        Self {
            entity: "Table".to_string(),
            columns,
            required: Vec::new(),
            allowed: HashMap::new(),
            na_value: String::new(),
        }
    }

    /// Entity name used in error messages.
    pub fn with_entity(mut self, entity: impl Into<String>) -> Self {
        self.entity = entity.into();
        self
    }

    pub fn with_required_columns(mut self, columns: &[&str]) -> Self {
        self.required
            .extend(columns.iter().map(|column| column.to_uppercase()));
        self
    }

    pub fn with_allowed_values(mut self, column: &str, values: &[&str]) -> Self {
        self.allowed.insert(
            column.to_uppercase(),
            values.iter().map(|value| value.to_string()).collect(),
        );
        self
    }

    pub fn with_na_value(mut self, na_value: impl Into<String>) -> Self {
        self.na_value = na_value.into();
        self
    }

    pub fn output_names(&self) -> Vec<String> {
        self.columns.iter().map(ColumnDescriptor::output_name).collect()
    }

    /// Every entity required column must be declared.
    pub fn check_required_columns(&self) -> Result<()> {
        let names = self.output_names();
        for required in &self.required {
            if !names.contains(required) {
                return Err(ImportError::configuration(format!(
                    "{} columns MUST include {required} column ID!",
                    self.entity
                )));
            }
        }
        Ok(())
    }

    /// Every referenced source column must exist in `table`.
    fn check_source_columns(&self, table: &Table) -> Result<()> {
        let missing = table.missing_columns(
            self.columns
                .iter()
                .flat_map(|column| column.source.columns()),
        );
        if missing.is_empty() {
            return Ok(());
        }
        Err(ImportError::input(format!(
            "{} column IDs must match the source header. Is there a typo in the header name, \
             or does a group stage rename the columns? Could not find these columns: {missing:?}. \
             Existing columns: {:?}",
            self.entity,
            table.columns()
        )))
    }

    /// Display names, descriptions, data types and priorities.
    pub fn write_comment_rows<W: Write>(&self, out: &mut W) -> Result<()> {
        let data_types = self
            .columns
            .iter()
            .map(|column| column.data_type().map(|data_type| data_type.as_str()))
            .collect::<Result<Vec<_>>>()?;
        let names: Vec<&str> = self.columns.iter().map(|c| c.name.as_str()).collect();
        let descriptions: Vec<&str> = self.columns.iter().map(|c| c.description.as_str()).collect();
        let priorities: Vec<&str> = self.columns.iter().map(|c| c.priority.as_str()).collect();
        for row in [names, descriptions, data_types, priorities] {
            writeln!(out, "#{}", row.join("\t"))?;
        }
        Ok(())
    }

    pub fn write_header<W: Write>(&self, out: &mut W) -> Result<()> {
        writeln!(out, "{}", self.output_names().join("\t"))?;
        Ok(())
    }

    /// Check the declared and source columns against `table`.
    ///
    /// The returned [`Projection`] writes without repeating the checks.
    pub fn validate<'a>(&'a self, table: &'a Table) -> Result<Projection<'a>> {
        self.check_required_columns()?;
        self.check_source_columns(table)?;
        Ok(Projection {
            projector: self,
            table,
        })
    }

    /// Validate, then write the selected header blocks and every data row.
    pub fn write<W: Write>(
        &self,
        table: &Table,
        ctx: &mut RunContext,
        out: &mut W,
        layout: OutputLayout,
    ) -> Result<usize> {
        self.validate(table)?.write(ctx, out, layout)
    }

    fn prepare(&self, table: &Table, ctx: &mut RunContext) -> Result<Vec<PreparedColumn<'_>>> {
        let mut prepared = Vec::with_capacity(self.columns.len());
        for descriptor in &self.columns {
            let output = descriptor.output_name();
            let source = match &descriptor.source {
                ColumnSource::Constant(value) => Source::Constant(value.clone()),
                ColumnSource::Column(name) => Source::Column(table.require_column(name)?),
                ColumnSource::Columns(names) => Source::Columns(
                    names
                        .iter()
                        .map(|name| table.require_column(name))
                        .collect::<Result<Vec<_>>>()?,
                ),
            };
            let function = descriptor
                .function
                .as_ref()
                .map(|spec| ctx.resolve(&spec.name, FunctionKind::Transform))
                .transpose()?;
            let required = match descriptor.required {
                Some(flag) => flag,
                None => self.required.contains(&output),
            };
            prepared.push(PreparedColumn {
                descriptor,
                allowed: self.allowed.get(&output).map(Vec::as_slice),
                output,
                source,
                function,
                required,
            });
        }
        Ok(prepared)
    }

    /// Write one tab-separated line per table row. Returns the row count.
    fn write_rows<W: Write>(
        &self,
        table: &Table,
        ctx: &mut RunContext,
        out: &mut W,
    ) -> Result<usize> {
        let prepared = self.prepare(table, ctx)?;
        for (row_idx, row) in table.rows().iter().enumerate() {
            let mut line = Vec::with_capacity(prepared.len());
            for column in &prepared {
                line.push(self.project(column, row, row_idx, ctx)?);
            }
            writeln!(out, "{}", line.join("\t"))?;
        }
        debug!(entity = %self.entity, rows = table.height(), "rows written");
        Ok(table.height())
    }

    fn project(
        &self,
        column: &PreparedColumn<'_>,
        row: &[CellValue],
        row_idx: usize,
        ctx: &mut RunContext,
    ) -> Result<String> {
        let raw = match &column.source {
            Source::Constant(value) => value.clone(),
            Source::Column(idx) => row[*idx].clone(),
            Source::Columns(indices) => {
                CellValue::List(indices.iter().map(|&idx| row[idx].clone()).collect())
            }
        };
        let text = raw.to_text();

        if let Some(allowed) = column.allowed {
            let permitted = text
                .key()
                .is_some_and(|value| allowed.iter().any(|allowed| *allowed == value));
            if !permitted {
                return Err(ImportError::validation(format!(
                    "Value {} is not allowed for column {}!",
                    text.render(),
                    column.output
                )));
            }
        }

        let value = match (&column.function, &column.descriptor.function) {
            (Some(function), Some(spec)) => ctx.invoke(function, text, &spec.args)?,
            _ => text,
        };

        let rendered = match column.descriptor.convert {
            Some(conversion) if !value.is_missing() => match convert(&value, conversion) {
                Ok(converted) => converted.render(),
                Err(message) => {
                    warn!(
                        column = %column.output,
                        row = row_idx + 1,
                        na_value = %self.na_value,
                        "{message}, using the na value"
                    );
                    self.na_value.clone()
                }
            },
            _ => value.render_or(&self.na_value),
        };

        if column.required && (value.is_missing() || rendered.is_empty()) {
            return Err(ImportError::validation(format!(
                "{} column {} is required but empty in row {}!",
                self.entity,
                column.output,
                row_idx + 1
            )));
        }
        Ok(rendered)
    }
}
