use cbio_ingest::Table;
use cbio_model::{
    CellValue, ColumnSpec, EntitySection, ImportError, ResourceSpec, Result, parse_columns,
};
use cbio_transform::{OutputLayout, Projector, RunContext};
use serde_json::Value;
use tracing::info;

use super::EntityProcessor;
use super::common::{WrittenFile, data_file, manifest_file, section_file, study_id_data};
use crate::document::{DiscoveredBlock, StudyDocument, StudySettings};
use crate::manifest::ManifestTemplate;

pub const RESOURCE_TYPES: &[&str] = &["SAMPLE", "PATIENT", "STUDY"];
pub const DEFAULT_RESOURCE_DESCRIPTION: &str = "No description provided.";

/// Resource definitions plus one resource item file per discovered key.
#[derive(Debug, Clone, Copy, Default)]
pub struct ResourceProcessor;

/// Columns every item file of a resource type must carry.
pub fn item_required_columns(resource_type: &str) -> Result<&'static [&'static str]> {
    match resource_type {
        "SAMPLE" => Ok(&["PATIENT_ID", "SAMPLE_ID", "RESOURCE_ID", "URL"]),
        "PATIENT" => Ok(&["PATIENT_ID", "RESOURCE_ID", "URL"]),
        "STUDY" => Ok(&["RESOURCE_ID", "URL"]),
        other => Err(ImportError::validation(format!(
            "Value {other} is not allowed for column RESOURCE_TYPE!"
        ))),
    }
}

fn definition_projector(settings: &StudySettings) -> Result<Projector> {
    let columns = parse_columns(vec![
        ColumnSpec::new("RESOURCE_ID").named("ID", "Resource ID", "STRING"),
        ColumnSpec::new("DISPLAY_NAME").named("Name", "Resource Name", "STRING"),
        ColumnSpec::new("RESOURCE_TYPE").named("Type", "Resource type", "STRING"),
        ColumnSpec::new("DESCRIPTION").named("Description", "Resource description", "STRING"),
        ColumnSpec::new("OPEN_BY_DEFAULT").named(
            "Default Resource",
            "Open Resource By Default",
            "BOOLEAN",
        ),
        ColumnSpec::new("PRIORITY").named("Priority", "Priority in resources.", "NUMBER"),
    ])?;
    Ok(Projector::new(columns)
        .with_entity("Resource definition")
        .with_required_columns(&["RESOURCE_ID", "DISPLAY_NAME", "RESOURCE_TYPE"])
        .with_allowed_values("RESOURCE_TYPE", RESOURCE_TYPES)
        .with_na_value(settings.na_value.clone()))
}

fn definition_rows(specs: &[ResourceSpec]) -> Result<Table> {
    let columns = [
        "RESOURCE_ID",
        "DISPLAY_NAME",
        "RESOURCE_TYPE",
        "DESCRIPTION",
        "OPEN_BY_DEFAULT",
        "PRIORITY",
    ];
    let mut table = Table::new(columns.iter().map(|c| c.to_string()).collect());
    for spec in specs {
        table.push_row(vec![
            CellValue::text(spec.id.to_uppercase()),
            CellValue::text(spec.name.as_str()),
            CellValue::text(spec.resource_type.as_str()),
            CellValue::text(
                spec.description
                    .as_deref()
                    .unwrap_or(DEFAULT_RESOURCE_DESCRIPTION),
            ),
            CellValue::Boolean(spec.open_by_default.unwrap_or(false)),
            spec.priority
                .as_ref()
                .map_or(CellValue::Integer(1), CellValue::from_json),
        ])?;
    }
    Ok(table)
}

impl EntityProcessor for ResourceProcessor {
    type Input<'a> = Vec<DiscoveredBlock<'a>>;

    fn section(&self) -> &'static str {
        "resources"
    }

    fn select<'a>(&self, study: &'a StudyDocument) -> Option<Vec<DiscoveredBlock<'a>>> {
        Some(study.discover("resource")).filter(|blocks| !blocks.is_empty())
    }

    fn process(
        &self,
        input: Vec<DiscoveredBlock<'_>>,
        settings: &StudySettings,
        ctx: &mut RunContext,
    ) -> Result<Vec<WrittenFile>> {
        let specs = input
            .iter()
            .map(|block| {
                block.file_name("data_resource_item")?;
                ResourceSpec::from_value(&Value::Object(block.block.clone()))
            })
            .collect::<Result<Vec<_>>>()?;

        let mut written = Vec::with_capacity(2 + input.len() * 2);
        written.push(manifest_file(
            ctx,
            "meta_resource_definition.txt",
            ManifestTemplate::ResourceDefinition,
            &study_id_data(settings),
            &["study_id"],
        )?);
        written.push(data_file(
            ctx,
            "data_resource_definition.txt",
            &definition_projector(settings)?,
            &definition_rows(&specs)?,
            OutputLayout::HEADER_ONLY,
        )?);

        for (block, spec) in input.iter().zip(&specs) {
            let required = item_required_columns(&spec.resource_type)?;
            let section = EntitySection::from_value(&block.node_value())?;
            let data_name = block.file_name("data_resource_item")?;
            let meta_name = block.file_name("meta_resource_item")?;
            let mut data = study_id_data(settings);
            data.insert("filename".into(), Value::String(data_name.clone()));
            data.insert("type".into(), Value::String(spec.resource_type.clone()));
            written.push(manifest_file(
                ctx,
                &meta_name,
                ManifestTemplate::ResourceItem,
                &data,
                &["study_id", "filename", "type"],
            )?);
            written.push(section_file(
                ctx,
                settings,
                &section,
                "Resource item",
                required,
                &data_name,
                OutputLayout::HEADER_ONLY,
            )?);
            info!(key = block.key, resource_type = %spec.resource_type, "resource generated");
        }
        Ok(written)
    }
}
