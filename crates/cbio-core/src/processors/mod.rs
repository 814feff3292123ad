//! Entity processors.
//!
//! Each processor maps one part of the study document to a manifest plus one
//! or more data files:
//!
//! | Processor | Input | Files |
//! |-----------|-------|-------|
//! | cancer types | `cancer_types` | `meta_cancer_type.txt`, `data_cancer_type.txt` |
//! | patients | `patients` | `meta_clinical_patient.txt`, `data_clinical_patient.txt` |
//! | samples | `samples` | `meta_clinical_samples.txt`, `data_clinical_samples.txt` |
//! | resources | discovered `resource` blocks | definition pair plus one item pair per key |
//! | time series | discovered `series` blocks | one timeline pair per key |

mod cancer_type;
mod common;
mod patient;
mod resource;
mod sample;
mod time_series;

pub use cancer_type::CancerTypeProcessor;
pub(crate) use common::manifest_file;
pub use common::{FileKind, WrittenFile};
pub use patient::PatientProcessor;
pub use resource::ResourceProcessor;
pub use sample::SampleProcessor;
pub use time_series::TimeSeriesProcessor;

use cbio_model::Result;
use cbio_transform::RunContext;

use crate::document::{StudyDocument, StudySettings};

/// One output category of a study.
pub trait EntityProcessor {
    /// What the processor reads from the study document.
    type Input<'a>;

    /// Document key the entity is reported under (e.g. `patients`).
    fn section(&self) -> &'static str;

    /// Pick this entity's input, or `None` when the study does not define it.
    fn select<'a>(&self, study: &'a StudyDocument) -> Option<Self::Input<'a>>;

    /// Write the entity's manifest and data files.
    fn process(
        &self,
        input: Self::Input<'_>,
        settings: &StudySettings,
        ctx: &mut RunContext,
    ) -> Result<Vec<WrittenFile>>;
}
