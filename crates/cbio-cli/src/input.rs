//! Study definition input and output directory resolution.

use std::io::Read;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use cbio_core::StudyDocument;
use cbio_transform::DEFAULT_OUTPUT_DIR;
use tracing::debug;

/// Load the study definition.
///
/// Piped standard input wins when it holds any content; otherwise `input` is
/// read as a file path, or parsed as literal content when no such file exists.
pub fn read_document<R: Read>(
    input: Option<&str>,
    mut stdin: R,
    stdin_is_terminal: bool,
) -> Result<StudyDocument> {
    if !stdin_is_terminal {
        let mut piped = String::new();
        stdin
            .read_to_string(&mut piped)
            .context("read study definition from stdin")?;
        let piped = piped.trim();
        if !piped.is_empty() {
            debug!(bytes = piped.len(), "study definition read from stdin");
            return StudyDocument::parse(piped).context("parse study definition from stdin");
        }
    }
    match input {
        Some(input) if !input.trim().is_empty() => StudyDocument::load(input)
            .with_context(|| format!("load study definition {}", preview(input))),
        _ => bail!("No input provided. Either provide a filename, file content, or use stdin."),
    }
}

fn preview(input: &str) -> String {
    let first_line = input.lines().next().unwrap_or_default();
    if first_line.len() < input.len() || first_line.len() > 60 {
        let cut: String = first_line.chars().take(60).collect();
        format!("'{cut}...'")
    } else {
        format!("'{first_line}'")
    }
}

/// `<prefix>/<output_folder>`, with `.tmp` when the study names no folder.
pub fn output_dir(prefix: Option<&Path>, output_folder: Option<&str>) -> PathBuf {
    let folder = output_folder
        .filter(|folder| !folder.trim().is_empty())
        .unwrap_or(DEFAULT_OUTPUT_DIR);
    match prefix {
        Some(prefix) => prefix.join(folder),
        None => PathBuf::from(folder),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn output_dir_defaults_to_tmp() {
        assert_eq!(output_dir(None, None), PathBuf::from(".tmp"));
        assert_eq!(
            output_dir(Some(Path::new("/data")), Some("study_a")),
            PathBuf::from("/data/study_a")
        );
        assert_eq!(output_dir(Some(Path::new("out")), Some(" ")), PathBuf::from("out/.tmp"));
    }

    #[test]
    fn preview_truncates_long_input() {
        assert_eq!(preview("study.yaml"), "'study.yaml'");
        assert!(preview("study_id: s1\npatients: {}").ends_with("...'"));
    }
}
