//! Preprocessing stages applied to a loaded table before projection.

use std::str::FromStr;

use serde::Deserialize;
use serde_json::Value;

use crate::error::{ImportError, Result};
use crate::function::FunctionSpec;
use crate::value::CellValue;

/// One entry of a unified `preprocess` list, selected by its `task` key.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "task", rename_all = "snake_case")]
pub enum PreprocessStage {
    Filter(FilterSpec),
    Join(JoinSpec),
    Group(GroupSpec),
    #[serde(alias = "derive")]
    Create(DeriveSpec),
}

impl PreprocessStage {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Filter(_) => "filter",
            Self::Join(_) => "join",
            Self::Group(_) => "group",
            Self::Create(_) => "create",
        }
    }
}

/// Raw filter block. Exactly one rule key is consulted, in the order
/// `one_of`, `regex`, `operator`, `function`.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct FilterSpec {
    #[serde(default)]
    pub source_id: Option<String>,
    #[serde(default)]
    pub source_ids: Option<Vec<String>>,
    #[serde(default)]
    pub one_of: Option<Vec<Value>>,
    #[serde(default)]
    pub regex: Option<String>,
    #[serde(default)]
    pub operator: Option<OperatorSpec>,
    #[serde(default)]
    pub function: Option<FunctionSpec>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct OperatorSpec {
    pub command: String,
    pub arg: Value,
}

/// A filter with its rule selected and validated.
#[derive(Debug, Clone, PartialEq)]
pub enum FilterRule {
    OneOf {
        column: String,
        values: Vec<String>,
    },
    Regex {
        column: String,
        pattern: String,
    },
    Operator {
        column: String,
        op: CompareOp,
        arg: CellValue,
    },
    Predicate {
        columns: Vec<String>,
        function: FunctionSpec,
    },
}

impl FilterSpec {
    fn column(&self, rule: &str) -> Result<String> {
        self.source_id.clone().ok_or_else(|| {
            ImportError::configuration(format!("Filter: {rule} requires a source_id!"))
        })
    }

    pub fn rule(&self) -> Result<FilterRule> {
        if let Some(values) = self.one_of.as_ref().filter(|values| !values.is_empty()) {
            return Ok(FilterRule::OneOf {
                column: self.column("one_of")?,
                values: values
                    .iter()
                    .map(|value| CellValue::from_json(value).render())
                    .collect(),
            });
        }
        if let Some(pattern) = self.regex.as_ref().filter(|pattern| !pattern.is_empty()) {
            return Ok(FilterRule::Regex {
                column: self.column("regex")?,
                pattern: pattern.clone(),
            });
        }
        if let Some(operator) = &self.operator {
            return Ok(FilterRule::Operator {
                column: self.column("operator")?,
                op: operator.command.parse()?,
                arg: CellValue::from_json(&operator.arg),
            });
        }
        if let Some(function) = &self.function {
            let columns = match (&self.source_id, &self.source_ids) {
                (Some(column), _) => vec![column.clone()],
                (None, Some(columns)) if !columns.is_empty() => columns.clone(),
                _ => {
                    return Err(ImportError::configuration(
                        "Filter: source_id or source_ids must be defined as a filter argument!",
                    ));
                }
            };
            return Ok(FilterRule::Predicate {
                columns,
                function: function.clone(),
            });
        }
        Err(ImportError::configuration(
            "Filter: one of one_of, regex, operator or function must be given!",
        ))
    }
}

/// Comparison used by operator filters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompareOp {
    Gt,
    Ge,
    Lt,
    Le,
    Eq,
    Ne,
}

impl FromStr for CompareOp {
    type Err = ImportError;

    fn from_str(value: &str) -> Result<Self> {
        match value {
            ">" => Ok(Self::Gt),
            ">=" => Ok(Self::Ge),
            "<" => Ok(Self::Lt),
            "<=" => Ok(Self::Le),
            "==" => Ok(Self::Eq),
            "!=" => Ok(Self::Ne),
            other => Err(ImportError::configuration(format!(
                "Unknown filter operator {other}!"
            ))),
        }
    }
}

impl CompareOp {
    pub fn holds(self, ordering: std::cmp::Ordering) -> bool {
        use std::cmp::Ordering::{Equal, Greater, Less};
        match self {
            Self::Gt => ordering == Greater,
            Self::Ge => ordering != Less,
            Self::Lt => ordering == Less,
            Self::Le => ordering != Greater,
            Self::Eq => ordering == Equal,
            Self::Ne => ordering != Equal,
        }
    }
}

/// A single column name or a list of them.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum OneOrMany {
    One(String),
    Many(Vec<String>),
}

impl OneOrMany {
    pub fn to_vec(&self) -> Vec<String> {
        match self {
            Self::One(name) => vec![name.clone()],
            Self::Many(names) => names.clone(),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JoinKind {
    #[default]
    Inner,
    Left,
    Right,
    Outer,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct JoinSpec {
    pub file: String,
    #[serde(default)]
    pub delimiter: Option<String>,
    pub left_on: OneOrMany,
    pub right_on: OneOrMany,
    #[serde(default)]
    pub how: JoinKind,
    #[serde(default)]
    pub lsuffix: Option<String>,
    #[serde(default)]
    pub rsuffix: Option<String>,
}

impl JoinSpec {
    pub fn suffixes(&self) -> (&str, &str) {
        (
            self.lsuffix.as_deref().unwrap_or("_x"),
            self.rsuffix.as_deref().unwrap_or("_y"),
        )
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct GroupSpec {
    pub by: OneOrMany,
    #[serde(default)]
    pub aggregate: Vec<AggregateSpec>,
}

/// One output column of a group stage.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct AggregateSpec {
    pub id: String,
    #[serde(default)]
    pub source_id: Option<String>,
    #[serde(default)]
    pub function: Option<FunctionSpec>,
    #[serde(default)]
    pub value: Option<Value>,
}

impl AggregateSpec {
    pub fn source_column(&self) -> &str {
        self.source_id.as_deref().unwrap_or(&self.id)
    }
}

/// Derived column rule. Incomplete rules are skipped with a warning.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct DeriveSpec {
    #[serde(default)]
    pub new_column: Option<String>,
    #[serde(default)]
    pub source_ids: Option<Vec<String>>,
    #[serde(default)]
    pub function: Option<FunctionSpec>,
}
