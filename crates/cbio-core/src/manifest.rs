//! Metadata manifests rendered from compiled-in templates.
//!
//! A template holds `{placeholder}` tokens. The caller names the fields to
//! fill as `key` or `key:default`; a key absent from the data falls back to
//! the literal default, a key with neither is a configuration error.

use std::fs;
use std::path::Path;

use cbio_model::{CellValue, ImportError, Result, format_placeholders};
use serde_json::{Map, Value};
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ManifestTemplate {
    Study,
    Patient,
    Sample,
    CancerType,
    ResourceDefinition,
    ResourceItem,
    Timeline,
}

impl ManifestTemplate {
    pub fn name(self) -> &'static str {
        match self {
            Self::Study => "study",
            Self::Patient => "patient",
            Self::Sample => "sample",
            Self::CancerType => "cancer_type",
            Self::ResourceDefinition => "resource_definition",
            Self::ResourceItem => "resource_item",
            Self::Timeline => "timeline",
        }
    }

    pub fn source(self) -> &'static str {
        match self {
            Self::Study => include_str!("../templates/study.txt"),
            Self::Patient => include_str!("../templates/patient.txt"),
            Self::Sample => include_str!("../templates/sample.txt"),
            Self::CancerType => include_str!("../templates/cancer_type.txt"),
            Self::ResourceDefinition => include_str!("../templates/resource_definition.txt"),
            Self::ResourceItem => include_str!("../templates/resource_item.txt"),
            Self::Timeline => include_str!("../templates/timeline.txt"),
        }
    }
}

fn manifest_value(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(text) => Some(text.clone()),
        other => Some(CellValue::from_json(other).render()),
    }
}

/// Resolve the `key[:default]` field list against `data`.
fn resolve_fields(
    template: ManifestTemplate,
    data: &Map<String, Value>,
    fields: &[&str],
) -> Result<Vec<(String, String)>> {
    fields
        .iter()
        .map(|field| {
            let (key, default) = match field.split_once(':') {
                Some((key, default)) => (key, Some(default)),
                None => (*field, None),
            };
            let value = data
                .get(key)
                .and_then(manifest_value)
                .or_else(|| default.map(str::to_string))
                .ok_or_else(|| {
                    ImportError::configuration(format!(
                        "Field {key} is required by the {} manifest",
                        template.name()
                    ))
                })?;
            Ok((key.to_string(), value))
        })
        .collect()
}

pub fn render_manifest(
    template: ManifestTemplate,
    data: &Map<String, Value>,
    fields: &[&str],
) -> Result<String> {
    let values = resolve_fields(template, data, fields)?;
    format_placeholders(template.source(), |name| {
        values
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.clone())
    })
    .map_err(|placeholder| {
        ImportError::configuration(format!(
            "Placeholder {placeholder} of the {} manifest has no value",
            template.name()
        ))
    })
}

pub fn write_manifest(
    path: &Path,
    template: ManifestTemplate,
    data: &Map<String, Value>,
    fields: &[&str],
) -> Result<()> {
    let content = render_manifest(template, data, fields)?;
    fs::write(path, content)?;
    debug!(path = %path.display(), template = template.name(), "manifest written");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn data(value: Value) -> Map<String, Value> {
        value.as_object().cloned().unwrap_or_default()
    }

    #[test]
    fn defaults_fill_absent_keys() {
        let rendered = render_manifest(
            ManifestTemplate::Study,
            &data(json!({"study_id": "s1", "study_name": "S", "study_description": "D"})),
            &["cancer_type:mixed", "study_id", "study_name", "study_description", "group:PUBLIC"],
        )
        .expect("render");
        insta::assert_snapshot!(rendered, @r"
        type_of_cancer: mixed
        cancer_study_identifier: s1
        name: S
        description: D
        groups: PUBLIC
        add_global_case_list: true
        ");
    }

    #[test]
    fn present_key_wins_over_default() {
        let rendered = render_manifest(
            ManifestTemplate::ResourceItem,
            &data(json!({"study_id": "s1", "type": "SAMPLE", "filename": "f.txt"})),
            &["study_id", "type:STUDY", "filename"],
        )
        .expect("render");
        assert!(rendered.contains("resource_type: SAMPLE"));
    }

    #[test]
    fn missing_key_without_default_is_configuration_error() {
        let err = render_manifest(ManifestTemplate::Patient, &Map::new(), &["study_id"]).unwrap_err();
        assert!(matches!(err, ImportError::Configuration(_)));
        assert!(err.to_string().contains("study_id"));
    }

    #[test]
    fn unfilled_placeholder_is_configuration_error() {
        let err = render_manifest(
            ManifestTemplate::Timeline,
            &data(json!({"study_id": "s1"})),
            &["study_id"],
        )
        .unwrap_err();
        assert!(err.to_string().contains("{filename}"));
    }

    #[test]
    fn every_template_is_compiled_in() {
        for template in [
            ManifestTemplate::Study,
            ManifestTemplate::Patient,
            ManifestTemplate::Sample,
            ManifestTemplate::CancerType,
            ManifestTemplate::ResourceDefinition,
            ManifestTemplate::ResourceItem,
            ManifestTemplate::Timeline,
        ] {
            assert!(!template.source().trim().is_empty(), "{}", template.name());
        }
    }
}
