//! Persistent `generated-ID -> original value` mappings kept in the helper directory.

use std::collections::HashMap;
use std::fs::OpenOptions;
use std::path::{Path, PathBuf};

use cbio_model::{ImportError, Result};
use csv::{ReaderBuilder, WriterBuilder};
use tracing::debug;

/// One mapping file, loaded once and appended to on every new entry.
#[derive(Debug)]
pub struct AnonymizationMapping {
    path: PathBuf,
    generated_by_original: HashMap<String, String>,
    counter: u64,
}

impl AnonymizationMapping {
    /// Load `path`, or start empty when the file does not exist yet.
    pub fn load(path: &Path) -> Result<Self> {
        let mut mapping = Self {
            path: path.to_path_buf(),
            generated_by_original: HashMap::new(),
            counter: 0,
        };
        if !path.is_file() {
            return Ok(mapping);
        }
        let mut reader = ReaderBuilder::new()
            .delimiter(b'\t')
            .has_headers(false)
            .flexible(true)
            .from_path(path)
            .map_err(|err| ImportError::input(format!("read {}: {err}", path.display())))?;
        for record in reader.records() {
            let record = record
                .map_err(|err| ImportError::input(format!("read {}: {err}", path.display())))?;
            let (Some(generated), Some(original)) = (record.get(0), record.get(1)) else {
                continue;
            };
            mapping.counter = mapping.counter.max(trailing_number(generated));
            mapping
                .generated_by_original
                .entry(original.to_string())
                .or_insert_with(|| generated.to_string());
        }
        debug!(
            path = %path.display(),
            entries = mapping.len(),
            "loaded anonymization mapping"
        );
        Ok(mapping)
    }

    pub fn lookup(&self, original: &str) -> Option<&str> {
        self.generated_by_original.get(original).map(String::as_str)
    }

    fn len(&self) -> usize {
        self.generated_by_original.len()
    }

    /// Next value of the increment sequence for this file.
    pub fn next_counter(&mut self) -> u64 {
        self.counter += 1;
        self.counter
    }

    /// Remember a new mapping and append it to the file immediately.
    pub fn record(&mut self, generated: &str, original: &str) -> Result<()> {
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        let mut writer = WriterBuilder::new()
            .delimiter(b'\t')
            .has_headers(false)
            .from_writer(file);
        writer
            .write_record([generated, original])
            .map_err(|err| ImportError::input(format!("write {}: {err}", self.path.display())))?;
        writer.flush()?;
        self.counter = self.counter.max(trailing_number(generated));
        self.generated_by_original
            .insert(original.to_string(), generated.to_string());
        Ok(())
    }
}

fn trailing_number(generated: &str) -> u64 {
    let digits = generated
        .bytes()
        .rev()
        .take_while(u8::is_ascii_digit)
        .count();
    generated[generated.len() - digits..].parse().unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reload_resumes_counter_after_highest_id() {
        let dir = tempfile::tempdir().expect("temp dir");
        let path = dir.path().join("patient_mappings.csv");
        std::fs::write(&path, "P00007\talpha\nP00003\tbeta\n").expect("seed mapping");

        let mut mapping = AnonymizationMapping::load(&path).expect("load");
        assert_eq!(mapping.lookup("beta"), Some("P00003"));
        assert_eq!(mapping.next_counter(), 8);

        mapping.record("P00008", "gamma").expect("record");
        let reloaded = AnonymizationMapping::load(&path).expect("reload");
        assert_eq!(reloaded.lookup("gamma"), Some("P00008"));
        assert_eq!(reloaded.len(), 3);
    }

    #[test]
    fn trailing_number_ignores_prefix() {
        assert_eq!(trailing_number("S00012"), 12);
        assert_eq!(trailing_number("2f1c-uuid"), 0);
    }
}
