use std::io::{self, IsTerminal};
use std::time::Instant;

use anyhow::{Context, Result};
use cbio_cli::input::{output_dir, read_document};
use cbio_core::{StudyReport, import_study};
use cbio_transform::RunOptions;
use tracing::{info, info_span};

use crate::cli::Cli;

pub fn run_import(cli: &Cli) -> Result<StudyReport> {
    let stdin = io::stdin();
    let is_terminal = stdin.is_terminal();
    let study = read_document(cli.input.as_deref(), stdin.lock(), is_terminal)?;
    let study_id = study.study_id()?.to_string();
    let span = info_span!("import", study_id = %study_id);
    let _guard = span.enter();

    let target = output_dir(cli.output_path_prefix.as_deref(), study.output_folder()?);
    let options = RunOptions::new()
        .with_source_prefix(cli.csv_path_prefix.clone().unwrap_or_default())
        .with_output_dir(target.clone())
        .with_helper_dir(cli.helper_dir.clone())
        .with_functions_file(cli.functions.clone())
        .with_seed(cli.seed)
        .with_clean_state(cli.clean_state);

    let started = Instant::now();
    let report = import_study(&study, options)
        .with_context(|| format!("import study {study_id} into {}", target.display()))?;
    info!(
        files = report.file_count(),
        elapsed_ms = started.elapsed().as_millis() as u64,
        "import finished"
    );
    Ok(report)
}
