use cbio_model::{EntitySection, Result};
use cbio_transform::{OutputLayout, RunContext};
use serde_json::Value;
use tracing::info;

use super::EntityProcessor;
use super::common::{WrittenFile, manifest_file, section_file, study_id_data};
use crate::document::{DiscoveredBlock, StudyDocument, StudySettings};
use crate::manifest::ManifestTemplate;

pub const TIMELINE_REQUIRED_COLUMNS: &[&str] =
    &["PATIENT_ID", "START_DATE", "STOP_DATE", "EVENT_TYPE"];

/// Timeline files for every top-level key carrying a `series` block.
#[derive(Debug, Clone, Copy, Default)]
pub struct TimeSeriesProcessor;

impl EntityProcessor for TimeSeriesProcessor {
    type Input<'a> = Vec<DiscoveredBlock<'a>>;

    fn section(&self) -> &'static str {
        "time_series"
    }

    fn select<'a>(&self, study: &'a StudyDocument) -> Option<Vec<DiscoveredBlock<'a>>> {
        Some(study.discover("series")).filter(|blocks| !blocks.is_empty())
    }

    fn process(
        &self,
        input: Vec<DiscoveredBlock<'_>>,
        settings: &StudySettings,
        ctx: &mut RunContext,
    ) -> Result<Vec<WrittenFile>> {
        let mut written = Vec::with_capacity(input.len() * 2);
        for block in input {
            let section = EntitySection::from_value(&block.node_value())?;
            let data_name = block.file_name("data_timeline")?;
            let meta_name = block.file_name("meta_timeline")?;
            let mut data = study_id_data(settings);
            data.insert("filename".into(), Value::String(data_name.clone()));
            written.push(manifest_file(
                ctx,
                &meta_name,
                ManifestTemplate::Timeline,
                &data,
                &["study_id", "filename"],
            )?);
            written.push(section_file(
                ctx,
                settings,
                &section,
                "Timeline",
                TIMELINE_REQUIRED_COLUMNS,
                &data_name,
                OutputLayout::HEADER_ONLY,
            )?);
            info!(key = block.key, "timeline generated");
        }
        Ok(written)
    }
}
