//! Study definition document: parsing, settings and block discovery.

use std::fs;
use std::path::Path;

use cbio_ingest::{DEFAULT_DELIMITER, parse_delimiter};
use cbio_model::{ImportError, Result};
use serde_json::{Map, Value};
use tracing::{debug, warn};

/// Top-level keys never scanned for `resource` or `series` blocks.
pub const RESERVED_KEYS: &[&str] = &[
    "study_id",
    "study_name",
    "study_description",
    "cancer_type",
    "cancer_types",
    "patients",
    "samples",
    "resources",
    "time_series",
    "output_folder",
    "delimiter",
    "na_value",
    "group",
];

/// A parsed study definition. Keys keep their document order.
#[derive(Debug, Clone, PartialEq)]
pub struct StudyDocument {
    root: Map<String, Value>,
}

/// A user-defined top-level key carrying a `resource` or `series` block.
#[derive(Debug, Clone, Copy)]
pub struct DiscoveredBlock<'a> {
    pub key: &'a str,
    /// The whole top-level entry: `file`, `columns`, preprocessing keys.
    pub node: &'a Map<String, Value>,
    /// The `resource` or `series` child.
    pub block: &'a Map<String, Value>,
}

impl DiscoveredBlock<'_> {
    pub fn node_value(&self) -> Value {
        Value::Object(self.node.clone())
    }

    /// `<stem>_<key>.txt`. The key must be a plain file-name component.
    pub fn file_name(&self, stem: &str) -> Result<String> {
        let key = self.key;
        let unsafe_key = key.trim().is_empty()
            || key.starts_with('.')
            || key.contains(['/', '\\', '\0'])
            || key.contains("..");
        if unsafe_key {
            return Err(ImportError::configuration(format!(
                "Key {key:?} cannot be used in an output file name"
            )));
        }
        Ok(format!("{stem}_{key}.txt"))
    }
}

/// Settings shared by every entity of a study.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StudySettings {
    pub study_id: String,
    pub delimiter: u8,
    pub na_value: String,
}

impl StudyDocument {
    /// Parse JSON, falling back to YAML.
    pub fn parse(content: &str) -> Result<Self> {
        let value = match serde_json::from_str::<Value>(content) {
            Ok(value) => value,
            Err(json_err) => {
                debug!(error = %json_err, "not JSON, trying YAML");
                serde_yaml::from_str::<Value>(content).map_err(|yaml_err| {
                    ImportError::parse(format!(
                        "Study definition is neither valid JSON ({json_err}) nor YAML ({yaml_err})"
                    ))
                })?
            }
        };
        Self::from_value(value)
    }

    /// Read `input` as a file when such a file exists, otherwise parse it as
    /// literal document content.
    pub fn load(input: &str) -> Result<Self> {
        let path = Path::new(input);
        if path.is_file() {
            let content = fs::read_to_string(path)?;
            return Self::parse(&content);
        }
        Self::parse(input)
    }

    pub fn from_value(value: Value) -> Result<Self> {
        match value {
            Value::Object(root) => Ok(Self { root }),
            other => Err(ImportError::parse(format!(
                "Study definition must be a mapping, got: {other}"
            ))),
        }
    }

    pub fn root(&self) -> &Map<String, Value> {
        &self.root
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.root.get(key).filter(|value| !value.is_null())
    }

    fn string_field(&self, key: &str) -> Result<Option<&str>> {
        match self.get(key) {
            None => Ok(None),
            Some(Value::String(text)) => Ok(Some(text.as_str())),
            Some(other) => Err(ImportError::configuration(format!(
                "Field {key} must be a string, got: {other}"
            ))),
        }
    }

    pub fn study_id(&self) -> Result<&str> {
        self.string_field("study_id")?
            .filter(|id| !id.trim().is_empty())
            .ok_or_else(|| ImportError::configuration("Field study_id is required"))
    }

    pub fn output_folder(&self) -> Result<Option<&str>> {
        self.string_field("output_folder")
    }

    pub fn settings(&self) -> Result<StudySettings> {
        let delimiter = match self.string_field("delimiter")? {
            Some(raw) => parse_delimiter(raw)?,
            None => DEFAULT_DELIMITER,
        };
        Ok(StudySettings {
            study_id: self.study_id()?.to_string(),
            delimiter,
            na_value: self.string_field("na_value")?.unwrap_or_default().to_string(),
        })
    }

    /// Data for `meta_study.txt`: name defaults to the id, description to the name.
    pub fn study_manifest_data(&self) -> Result<Map<String, Value>> {
        let mut data = self.root.clone();
        let id = self.study_id()?.to_string();
        let name = self.string_field("study_name")?.unwrap_or(&id).to_string();
        let description = self
            .string_field("study_description")?
            .unwrap_or(&name)
            .to_string();
        data.insert("study_name".into(), Value::String(name));
        data.insert("study_description".into(), Value::String(description));
        Ok(data)
    }

    /// Non-reserved top-level keys whose `child` entry is a mapping, in
    /// document order. A `child` entry of any other type is skipped with a
    /// warning.
    pub fn discover(&self, child: &str) -> Vec<DiscoveredBlock<'_>> {
        let mut found = Vec::new();
        for (key, value) in &self.root {
            if RESERVED_KEYS.contains(&key.as_str()) {
                continue;
            }
            let Value::Object(node) = value else {
                continue;
            };
            match node.get(child) {
                Some(Value::Object(block)) => found.push(DiscoveredBlock {
                    key: key.as_str(),
                    node,
                    block,
                }),
                None | Some(Value::Null) => {}
                Some(_) => warn!(key = %key, child, "{child} block is not a mapping, skipping"),
            }
        }
        found
    }
}
