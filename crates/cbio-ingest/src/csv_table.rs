use std::path::{Path, PathBuf};

use cbio_model::{CellValue, ImportError, Result, TableSource};
use csv::ReaderBuilder;
use tracing::debug;

use crate::table::Table;

pub const DEFAULT_DELIMITER: u8 = b'\t';

fn normalize_header(raw: &str) -> String {
    raw.trim().trim_matches('\u{feff}').to_string()
}

/// Parse a configured delimiter. Accepts a single byte or the escape `\t`.
pub fn parse_delimiter(raw: &str) -> Result<u8> {
    match raw {
        "\\t" | "\t" => Ok(b'\t'),
        other if other.len() == 1 => Ok(other.as_bytes()[0]),
        other => Err(ImportError::configuration(format!(
            "Delimiter must be a single character, got {other:?}"
        ))),
    }
}

/// Join a source file name onto the configured prefix.
pub fn resolve_source_path(prefix: &Path, file: &str) -> PathBuf {
    prefix.join(file)
}

/// Read a delimited file with a header row.
///
/// Empty fields load as missing. Short records are padded with missing cells;
/// a record longer than the header is an input error.
pub fn read_table(path: &Path, delimiter: u8) -> Result<Table> {
    if !path.is_file() {
        return Err(ImportError::input(format!(
            "Input file {} does not exist!",
            path.display()
        )));
    }
    let mut reader = ReaderBuilder::new()
        .delimiter(delimiter)
        .has_headers(true)
        .flexible(true)
        .from_path(path)
        .map_err(|err| ImportError::input(format!("read {}: {err}", path.display())))?;
    let headers: Vec<String> = reader
        .headers()
        .map_err(|err| ImportError::input(format!("read header {}: {err}", path.display())))?
        .iter()
        .map(normalize_header)
        .collect();
    let width = headers.len();
    let mut table = Table::new(headers);
    for (line, record) in reader.records().enumerate() {
        let record = record
            .map_err(|err| ImportError::input(format!("read record {}: {err}", path.display())))?;
        if record.len() > width {
            return Err(ImportError::input(format!(
                "{}: record {} has {} fields, header has {width}",
                path.display(),
                line + 1,
                record.len()
            )));
        }
        let mut row: Vec<CellValue> = record.iter().map(CellValue::from_field).collect();
        row.resize(width, CellValue::Missing);
        table.push_row(row)?;
    }
    debug!(
        path = %path.display(),
        rows = table.height(),
        columns = table.width(),
        "loaded table"
    );
    Ok(table)
}

/// Load an entity's table from a path under `prefix` or from literal rows.
pub fn load_source(source: &TableSource, prefix: &Path, delimiter: u8) -> Result<Table> {
    match source {
        TableSource::Path(file) => read_table(&resolve_source_path(prefix, file), delimiter),
        TableSource::Rows(rows) => Table::from_json_rows(rows),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn delimiter_must_be_single_byte() {
        assert_eq!(parse_delimiter("\\t").expect("tab"), b'\t');
        assert_eq!(parse_delimiter(",").expect("comma"), b',');
        assert!(parse_delimiter(";;").is_err());
    }

    #[test]
    fn header_strips_byte_order_mark() {
        assert_eq!(normalize_header("\u{feff}ID "), "ID");
    }
}
