//! CLI argument definitions for the study importer.

use std::path::PathBuf;

use cbio_transform::{DEFAULT_HELPER_DIR, DEFAULT_SEED};
use clap::{Parser, ValueEnum};
use clap_verbosity_flag::{Verbosity, WarnLevel};
use colorchoice_clap::Color;

#[derive(Parser)]
#[command(
    name = "cbio-importer",
    version,
    about = "Generate cBioPortal study files from a declarative study definition",
    long_about = "Generate cBioPortal study files from a declarative study definition.\n\n\
                  The definition (JSON or YAML) is read from INPUT, a file path or literal\n\
                  content, or from standard input when it is piped."
)]
pub struct Cli {
    /// Study definition file path or content.
    #[arg(value_name = "INPUT", env = "CBIO_STUDY_DEFINITION")]
    pub input: Option<String>,

    /// Lua function-definition file.
    #[arg(short = 'f', long = "functions", value_name = "PATH", env = "CBIO_FUNCTIONS")]
    pub functions: Option<PathBuf>,

    /// Prefix joined onto every source file path.
    #[arg(
        long = "csv-path-prefix",
        alias = "csv_path_prefix",
        value_name = "DIR",
        env = "CBIO_CSV_PATH_PREFIX"
    )]
    pub csv_path_prefix: Option<PathBuf>,

    /// Prefix joined onto the study's output folder.
    #[arg(
        long = "output-path-prefix",
        alias = "output_path_prefix",
        value_name = "DIR",
        env = "CBIO_OUTPUT_PATH_PREFIX"
    )]
    pub output_path_prefix: Option<PathBuf>,

    /// Directory holding anonymization mapping files.
    #[arg(long = "helper-dir", value_name = "DIR", env = "CBIO_HELPER_DIR", default_value = DEFAULT_HELPER_DIR)]
    pub helper_dir: PathBuf,

    /// Seed for generated identifiers and plugin randomness.
    #[arg(long = "seed", env = "CBIO_SEED", default_value_t = DEFAULT_SEED)]
    pub seed: u64,

    /// Delete the helper directory's mapping files before the run.
    #[arg(long = "clean-state")]
    pub clean_state: bool,

    /// Adjust log verbosity (-v for debug, -vv for trace, -q for errors only).
    #[command(flatten)]
    pub verbosity: Verbosity<WarnLevel>,

    /// Control ANSI color output (auto, always, never).
    #[command(flatten)]
    pub color: Color,

    /// Explicit log level (overrides -v/-q flags).
    #[arg(long = "log-level", value_enum)]
    pub log_level: Option<LogLevelArg>,

    /// Log output format (pretty for humans, json for machine parsing).
    #[arg(long = "log-format", value_enum, default_value = "pretty")]
    pub log_format: LogFormatArg,

    /// Write logs to a file instead of stderr.
    #[arg(long = "log-file", value_name = "PATH")]
    pub log_file: Option<PathBuf>,

    /// Prefix log lines with a timestamp.
    #[arg(long = "log-timestamps")]
    pub log_timestamps: bool,

    /// Include the module path of each log event.
    #[arg(long = "log-target")]
    pub log_target: bool,
}

#[derive(Clone, Copy, ValueEnum)]
pub enum LogLevelArg {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

#[derive(Clone, Copy, ValueEnum)]
pub enum LogFormatArg {
    Pretty,
    Compact,
    Json,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn command_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn log_decoration_flags_default_off() {
        let cli = Cli::try_parse_from(["cbio-importer", "study.yaml"]).expect("parse");
        assert!(!cli.log_timestamps);
        assert!(!cli.log_target);

        let cli = Cli::try_parse_from([
            "cbio-importer",
            "--log-timestamps",
            "--log-target",
            "study.yaml",
        ])
        .expect("parse");
        assert!(cli.log_timestamps);
        assert!(cli.log_target);
        assert_eq!(cli.input.as_deref(), Some("study.yaml"));
    }
}
