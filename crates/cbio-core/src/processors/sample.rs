use cbio_model::{EntitySection, Result};
use cbio_transform::{OutputLayout, RunContext};
use serde_json::Value;

use super::EntityProcessor;
use super::common::{WrittenFile, manifest_file, section_file, study_id_data};
use crate::document::{StudyDocument, StudySettings};
use crate::manifest::ManifestTemplate;

pub const SAMPLE_REQUIRED_COLUMNS: &[&str] = &["PATIENT_ID", "SAMPLE_ID"];

/// Clinical sample attributes.
#[derive(Debug, Clone, Copy, Default)]
pub struct SampleProcessor;

impl EntityProcessor for SampleProcessor {
    type Input<'a> = &'a Value;

    fn section(&self) -> &'static str {
        "samples"
    }

    /// An empty `samples` mapping counts as absent.
    fn select<'a>(&self, study: &'a StudyDocument) -> Option<&'a Value> {
        study
            .get(self.section())
            .filter(|value| !matches!(value, Value::Object(map) if map.is_empty()))
    }

    fn process(
        &self,
        input: &Value,
        settings: &StudySettings,
        ctx: &mut RunContext,
    ) -> Result<Vec<WrittenFile>> {
        let section = EntitySection::from_value(input)?;
        let manifest = manifest_file(
            ctx,
            "meta_clinical_samples.txt",
            ManifestTemplate::Sample,
            &study_id_data(settings),
            &["study_id"],
        )?;
        let data = section_file(
            ctx,
            settings,
            &section,
            "Sample",
            SAMPLE_REQUIRED_COLUMNS,
            "data_clinical_samples.txt",
            OutputLayout::CLINICAL,
        )?;
        Ok(vec![manifest, data])
    }
}
