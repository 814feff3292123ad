//! Column descriptors: how one destination column is filled.

use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;

use serde::Deserialize;
use serde_json::Value;

use crate::error::{ImportError, Result};
use crate::function::FunctionSpec;
use crate::value::CellValue;

/// Raw column block as it appears in a study document.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ColumnSpec {
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub data_type: Option<String>,
    #[serde(default)]
    pub priority: Option<Value>,
    #[serde(default)]
    pub required: Option<bool>,
    #[serde(default)]
    pub value: Option<Value>,
    #[serde(default)]
    pub function: Option<FunctionSpec>,
    #[serde(default)]
    pub convert: Option<String>,
    #[serde(default)]
    pub source_id: Option<String>,
    #[serde(default)]
    pub source_ids: Option<Vec<String>>,
}

impl ColumnSpec {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            ..Self::default()
        }
    }

    pub fn named(mut self, name: &str, description: &str, data_type: &str) -> Self {
        self.name = Some(name.to_string());
        self.description = Some(description.to_string());
        self.data_type = Some(data_type.to_string());
        self
    }
}

/// Where a column's raw value comes from.
#[derive(Debug, Clone, PartialEq)]
pub enum ColumnSource {
    Constant(CellValue),
    Column(String),
    Columns(Vec<String>),
}

impl ColumnSource {
    /// Source columns this descriptor reads from the table.
    pub fn columns(&self) -> Vec<&str> {
        match self {
            Self::Constant(_) => Vec::new(),
            Self::Column(name) => vec![name.as_str()],
            Self::Columns(names) => names.iter().map(String::as_str).collect(),
        }
    }
}

/// Portal data type announced in the third comment row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DataType {
    String,
    Number,
    Boolean,
}

impl DataType {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::String => "STRING",
            Self::Number => "NUMBER",
            Self::Boolean => "BOOLEAN",
        }
    }
}

impl FromStr for DataType {
    type Err = ImportError;

    fn from_str(value: &str) -> Result<Self> {
        match value.trim().to_uppercase().as_str() {
            "STRING" => Ok(Self::String),
            "NUMBER" => Ok(Self::Number),
            "BOOLEAN" => Ok(Self::Boolean),
            other => Err(ImportError::configuration(format!(
                "Invalid column data type: {other}! Use one of STRING, NUMBER, BOOLEAN."
            ))),
        }
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Target type of the optional `convert` step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Conversion {
    Int,
    Float,
    Str,
    Bool,
    Datetime,
}

impl FromStr for Conversion {
    type Err = ImportError;

    fn from_str(value: &str) -> Result<Self> {
        match value {
            "int" => Ok(Self::Int),
            "float" => Ok(Self::Float),
            "str" => Ok(Self::Str),
            "bool" => Ok(Self::Bool),
            "datetime" => Ok(Self::Datetime),
            other => Err(ImportError::configuration(format!(
                "Unsupported type: {other}"
            ))),
        }
    }
}

/// Validated column descriptor.
#[derive(Debug, Clone, PartialEq)]
pub struct ColumnDescriptor {
    pub id: String,
    pub name: String,
    pub description: String,
    /// Raw data type token; validated when the comment rows are written.
    pub data_type: String,
    pub priority: String,
    pub required: Option<bool>,
    pub source: ColumnSource,
    pub function: Option<FunctionSpec>,
    pub convert: Option<Conversion>,
}

impl ColumnDescriptor {
    /// Destination header name.
    pub fn output_name(&self) -> String {
        self.id.to_uppercase()
    }

    pub fn data_type(&self) -> Result<DataType> {
        self.data_type.parse()
    }

    pub fn from_spec(spec: ColumnSpec) -> Result<Self> {
        if spec.id.trim().is_empty() {
            return Err(ImportError::configuration("Column field id is required!"));
        }
        let convert = spec.convert.as_deref().map(str::parse).transpose()?;
        let source = match (spec.value, spec.source_id, spec.source_ids) {
            (Some(value), _, _) => ColumnSource::Constant(CellValue::from_json(&value)),
            (None, Some(column), _) => ColumnSource::Column(column),
            (None, None, Some(columns)) if !columns.is_empty() => ColumnSource::Columns(columns),
            (None, None, _) => ColumnSource::Column(spec.id.clone()),
        };
        let name = spec.name.unwrap_or_else(|| spec.id.clone());
        let description = spec.description.unwrap_or_else(|| name.clone());
        let priority = match spec.priority {
            None | Some(Value::Null) => "1".to_string(),
            Some(Value::String(text)) => text,
            Some(other) => CellValue::from_json(&other).render(),
        };
        Ok(Self {
            id: spec.id,
            name,
            description,
            data_type: spec.data_type.unwrap_or_else(|| "STRING".to_string()),
            priority,
            required: spec.required,
            source,
            function: spec.function,
            convert,
        })
    }
}

/// Parse a column list, rejecting ids that collide once upper-cased.
pub fn parse_columns(specs: Vec<ColumnSpec>) -> Result<Vec<ColumnDescriptor>> {
    let mut seen = HashSet::new();
    let mut columns = Vec::with_capacity(specs.len());
    for spec in specs {
        let descriptor = ColumnDescriptor::from_spec(spec)?;
        if !seen.insert(descriptor.output_name()) {
            return Err(ImportError::configuration(format!(
                "Duplicate column id {} in column definitions!",
                descriptor.id
            )));
        }
        columns.push(descriptor);
    }
    Ok(columns)
}

/// Parse a `columns` array straight from a study document value.
pub fn parse_column_values(value: &Value) -> Result<Vec<ColumnDescriptor>> {
    let specs: Vec<ColumnSpec> = serde_json::from_value(value.clone())
        .map_err(|err| ImportError::configuration(format!("Invalid columns block: {err}")))?;
    parse_columns(specs)
}
