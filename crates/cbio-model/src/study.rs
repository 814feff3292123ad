//! Entity sections of a study document.

use serde::Deserialize;
use serde_json::Value;

use crate::column::{ColumnDescriptor, ColumnSpec, parse_columns};
use crate::error::{ImportError, Result};
use crate::preprocess::{DeriveSpec, FilterSpec, GroupSpec, JoinSpec, PreprocessStage};

/// Where an entity reads its table from.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum TableSource {
    /// Path relative to the source prefix.
    Path(String),
    /// Literal row matrix; the first row is the header.
    Rows(Vec<Vec<Value>>),
}

/// A table-backed entity: patients, samples, resource items, timelines.
#[derive(Debug, Clone, Deserialize)]
pub struct EntitySection {
    pub file: TableSource,
    #[serde(default)]
    pub columns: Vec<ColumnSpec>,
    #[serde(default)]
    pub delimiter: Option<String>,
    #[serde(default)]
    pub preprocess: Option<Vec<PreprocessStage>>,
    #[serde(default)]
    pub filter: Vec<FilterSpec>,
    #[serde(default)]
    pub join: Vec<JoinSpec>,
    #[serde(default)]
    pub group: Option<GroupSpec>,
    #[serde(default)]
    pub create: Vec<DeriveSpec>,
    #[serde(default)]
    pub join_last: bool,
}

impl EntitySection {
    pub fn new(file: TableSource, columns: Vec<ColumnSpec>) -> Self {
        Self {
            file,
            columns,
            delimiter: None,
            preprocess: None,
            filter: Vec::new(),
            join: Vec::new(),
            group: None,
            create: Vec::new(),
            join_last: false,
        }
    }

    pub fn from_value(value: &Value) -> Result<Self> {
        serde_json::from_value(value.clone())
            .map_err(|err| ImportError::configuration(format!("Invalid entity section: {err}")))
    }

    pub fn descriptors(&self) -> Result<Vec<ColumnDescriptor>> {
        parse_columns(self.columns.clone())
    }

    /// Ordered stage list.
    ///
    /// A `preprocess` list runs as written. Otherwise the legacy keys apply:
    /// filters first, then join, group, create, or group, create, join when
    /// `join_last` is set.
    pub fn stages(&self) -> Vec<PreprocessStage> {
        if let Some(stages) = &self.preprocess {
            return stages.clone();
        }
        let mut stages: Vec<PreprocessStage> = self
            .filter
            .iter()
            .cloned()
            .map(PreprocessStage::Filter)
            .collect();
        let joins = self.join.iter().cloned().map(PreprocessStage::Join);
        let grouped = self
            .group
            .iter()
            .cloned()
            .map(PreprocessStage::Group)
            .chain(self.create.iter().cloned().map(PreprocessStage::Create));
        if self.join_last {
            stages.extend(grouped);
            stages.extend(joins);
        } else {
            stages.extend(joins);
            stages.extend(grouped);
        }
        stages
    }
}

/// `resource` child block of a discovered key.
#[derive(Debug, Clone, Deserialize)]
pub struct ResourceSpec {
    pub id: String,
    pub name: String,
    pub resource_type: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub open_by_default: Option<bool>,
    #[serde(default)]
    pub priority: Option<Value>,
}

impl ResourceSpec {
    pub fn from_value(value: &Value) -> Result<Self> {
        serde_json::from_value(value.clone())
            .map_err(|err| ImportError::configuration(format!("Invalid resource block: {err}")))
    }
}

/// Color requested for a cancer type.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum ColorChoice {
    Index(i64),
    Name(String),
}

/// One entry of the `cancer_types` mapping.
#[derive(Debug, Clone, Deserialize)]
pub struct CancerTypeSpec {
    pub name: String,
    #[serde(default)]
    pub ui_color: Option<ColorChoice>,
    #[serde(default)]
    pub parent: Option<String>,
}

impl CancerTypeSpec {
    pub fn from_value(id: &str, value: &Value) -> Result<Self> {
        serde_json::from_value(value.clone()).map_err(|err| {
            ImportError::configuration(format!("Invalid cancer type {id}: {err}"))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn section(extra: Value) -> EntitySection {
        let mut base = json!({"file": "patients.tsv", "columns": [{"id": "PATIENT_ID"}]});
        if let (Some(base), Some(extra)) = (base.as_object_mut(), extra.as_object()) {
            base.extend(extra.clone());
        }
        EntitySection::from_value(&base).expect("section")
    }

    fn names(section: &EntitySection) -> Vec<&'static str> {
        section.stages().iter().map(PreprocessStage::name).collect()
    }

    #[test]
    fn legacy_order_joins_before_grouping() {
        let section = section(json!({
            "create": [{"new_column": "N"}],
            "group": {"by": "ID"},
            "join": [{"file": "b.tsv", "left_on": "ID", "right_on": "ID"}],
            "filter": [{"source_id": "ID", "regex": "P"}]
        }));
        assert_eq!(names(&section), ["filter", "join", "group", "create"]);
    }

    #[test]
    fn legacy_join_last_moves_join_to_the_end() {
        let section = section(json!({
            "join_last": true,
            "group": {"by": "ID"},
            "join": [{"file": "b.tsv", "left_on": "ID", "right_on": "ID"}],
            "filter": [{"source_id": "ID", "regex": "P"}]
        }));
        assert_eq!(names(&section), ["filter", "group", "join"]);
    }

    #[test]
    fn unified_list_overrides_legacy_keys() {
        let section = section(json!({
            "preprocess": [
                {"task": "group", "by": "ID"},
                {"task": "filter", "source_id": "ID", "regex": "P"}
            ],
            "join": [{"file": "b.tsv", "left_on": "ID", "right_on": "ID"}]
        }));
        assert_eq!(names(&section), ["group", "filter"]);
    }

    #[test]
    fn literal_rows_parse_as_table_source() {
        let section = EntitySection::from_value(&json!({
            "file": [["ID"], ["P1"]],
            "columns": []
        }))
        .expect("section");
        assert!(matches!(section.file, TableSource::Rows(ref rows) if rows.len() == 2));
    }

    #[test]
    fn section_without_file_is_rejected() {
        let err = EntitySection::from_value(&json!({"columns": []})).unwrap_err();
        assert!(matches!(err, ImportError::Configuration(_)));
    }

    #[test]
    fn color_choice_accepts_name_or_index() {
        let spec = CancerTypeSpec::from_value("brca", &json!({"name": "Breast", "ui_color": 3}))
            .expect("cancer type");
        assert_eq!(spec.ui_color, Some(ColorChoice::Index(3)));
    }
}
