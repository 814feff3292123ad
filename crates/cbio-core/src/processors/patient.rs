use cbio_model::{EntitySection, Result};
use cbio_transform::{OutputLayout, RunContext};
use serde_json::Value;

use super::EntityProcessor;
use super::common::{WrittenFile, manifest_file, section_file, study_id_data};
use crate::document::{StudyDocument, StudySettings};
use crate::manifest::ManifestTemplate;

pub const PATIENT_REQUIRED_COLUMNS: &[&str] = &["PATIENT_ID"];

/// Clinical patient attributes.
#[derive(Debug, Clone, Copy, Default)]
pub struct PatientProcessor;

impl EntityProcessor for PatientProcessor {
    type Input<'a> = &'a Value;

    fn section(&self) -> &'static str {
        "patients"
    }

    fn select<'a>(&self, study: &'a StudyDocument) -> Option<&'a Value> {
        study.get(self.section())
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
            "meta_clinical_patient.txt",
            ManifestTemplate::Patient,
            &study_id_data(settings),
            &["study_id"],
        )?;
        let data = section_file(
            ctx,
            settings,
            &section,
            "Patient",
            PATIENT_REQUIRED_COLUMNS,
            "data_clinical_patient.txt",
            OutputLayout::CLINICAL,
        )?;
        Ok(vec![manifest, data])
    }
}
