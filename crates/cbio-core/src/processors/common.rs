use std::fmt;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::PathBuf;

use cbio_ingest::{Table, parse_delimiter};
use cbio_model::{EntitySection, Result};
use cbio_transform::{OutputLayout, Projector, RunContext, StageEnv, load_table};
use serde_json::{Map, Value};
use tracing::info;

use crate::document::StudySettings;
use crate::manifest::{ManifestTemplate, write_manifest};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileKind {
    Manifest,
    Data,
}

impl fmt::Display for FileKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Manifest => write!(f, "meta"),
            Self::Data => write!(f, "data"),
        }
    }
}

/// A file produced by a processor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WrittenFile {
    pub path: PathBuf,
    pub kind: FileKind,
    /// Data rows written; `None` for manifests.
    pub rows: Option<usize>,
}

impl WrittenFile {
    pub fn file_name(&self) -> String {
        self.path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default()
    }
}

pub(crate) fn manifest_file(
    ctx: &RunContext,
    file_name: &str,
    template: ManifestTemplate,
    data: &Map<String, Value>,
    fields: &[&str],
) -> Result<WrittenFile> {
    let path = ctx.output_path(file_name);
    write_manifest(&path, template, data, fields)?;
    Ok(WrittenFile {
        path,
        kind: FileKind::Manifest,
        rows: None,
    })
}

/// Manifest data holding only the study id.
pub(crate) fn study_id_data(settings: &StudySettings) -> Map<String, Value> {
    let mut data = Map::new();
    data.insert("study_id".into(), Value::String(settings.study_id.clone()));
    data
}

pub(crate) fn data_file(
    ctx: &mut RunContext,
    file_name: &str,
    projector: &Projector,
    table: &Table,
    layout: OutputLayout,
) -> Result<WrittenFile> {
    let projection = projector.validate(table)?;
    let path = ctx.output_path(file_name);
    let mut out = BufWriter::new(File::create(&path)?);
    let rows = projection.write(ctx, &mut out, layout)?;
    out.flush()?;
    info!(file = file_name, rows, "data file written");
    Ok(WrittenFile {
        path,
        kind: FileKind::Data,
        rows: Some(rows),
    })
}

/// Load and preprocess a section's table and project it into `file_name`.
pub(crate) fn section_file(
    ctx: &mut RunContext,
    settings: &StudySettings,
    section: &EntitySection,
    entity: &str,
    required: &[&str],
    file_name: &str,
    layout: OutputLayout,
) -> Result<WrittenFile> {
    let delimiter = match &section.delimiter {
        Some(raw) => parse_delimiter(raw)?,
        None => settings.delimiter,
    };
    let projector = Projector::new(section.descriptors()?)
        .with_entity(entity)
        .with_required_columns(required)
        .with_na_value(settings.na_value.clone());
    projector.check_required_columns()?;
    let table = load_table(section, ctx, StageEnv { delimiter })?;
    data_file(ctx, file_name, &projector, &table, layout)
}
