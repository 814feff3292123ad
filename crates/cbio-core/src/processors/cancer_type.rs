use cbio_ingest::Table;
use cbio_model::{CancerTypeSpec, CellValue, ColumnSpec, ImportError, Result, parse_columns};
use cbio_transform::{OutputLayout, Projector, RunContext};
use serde_json::{Map, Value};

use super::EntityProcessor;
use super::common::{WrittenFile, data_file, manifest_file};
use crate::color::pick_color;
use crate::document::{StudyDocument, StudySettings};
use crate::manifest::ManifestTemplate;

/// Root of the cancer type tree; not definable by a study.
pub const ROOT_CANCER_TYPE: &str = "tissue";

const COLUMNS: [&str; 4] = ["TYPE", "NAME", "COLOR", "PARENT"];

/// Cancer type definitions from the `cancer_types` mapping (id to spec).
#[derive(Debug, Clone, Copy, Default)]
pub struct CancerTypeProcessor;

fn cancer_type_rows(input: &Value, ctx: &mut RunContext) -> Result<Table> {
    let Value::Object(types) = input else {
        return Err(ImportError::configuration(
            "cancer_types must map cancer type ids to definitions",
        ));
    };
    let mut table = Table::new(COLUMNS.iter().map(|c| c.to_string()).collect());
    for (id, value) in types {
        if id == ROOT_CANCER_TYPE {
            return Err(ImportError::configuration(format!(
                "Invalid cancer type {id}: reserved word"
            )));
        }
        let spec = CancerTypeSpec::from_value(id, value)?;
        let color = pick_color(spec.ui_color.as_ref(), ctx.cosmetic_rng())?;
        table.push_row(vec![
            CellValue::text(id.as_str()),
            CellValue::text(spec.name),
            CellValue::text(color),
            CellValue::text(spec.parent.unwrap_or_else(|| ROOT_CANCER_TYPE.to_string())),
        ])?;
    }
    Ok(table)
}

impl EntityProcessor for CancerTypeProcessor {
    type Input<'a> = &'a Value;

    fn section(&self) -> &'static str {
        "cancer_types"
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
        let manifest = manifest_file(
            ctx,
            "meta_cancer_type.txt",
            ManifestTemplate::CancerType,
            &Map::new(),
            &[],
        )?;
        let table = cancer_type_rows(input, ctx)?;
        let columns = parse_columns(COLUMNS.iter().map(|id| ColumnSpec::new(*id)).collect())?;
        let projector = Projector::new(columns)
            .with_entity("Cancer type")
            .with_na_value(settings.na_value.clone());
        let data = data_file(
            ctx,
            "data_cancer_type.txt",
            &projector,
            &table,
            OutputLayout::DATA_ONLY,
        )?;
        Ok(vec![manifest, data])
    }
}
