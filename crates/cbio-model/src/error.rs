//! Error taxonomy shared by every importer crate.
//!
//! - [`ImportError::Configuration`] - missing/invalid field, unsupported conversion,
//!   unreadable or failing function file
//! - [`ImportError::FunctionFileMissing`] - no function file configured, or the
//!   configured path does not exist
//! - [`ImportError::Input`] - missing source file, missing expected column
//! - [`ImportError::Join`] - join key absent from either side
//! - [`ImportError::Validation`] - disallowed value, empty required column
//! - [`ImportError::Resolution`] - function name not found in any registry
//! - [`ImportError::Parse`] - unreadable study document or pattern
//!
//! Every error aborts the current run. Non-fatal conditions are logged by the
//! caller and never surface as an `ImportError`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ImportError {
    #[error("configuration error: {0}")]
    Configuration(String),

    #[error("configuration error: {0}")]
    FunctionFileMissing(String),

    #[error("input error: {0}")]
    Input(String),

    #[error("join error: {0}")]
    Join(String),

    #[error("validation error: {0}")]
    Validation(String),

    #[error("resolution error: {0}")]
    Resolution(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("parse error: {0}")]
    Parse(String),
}

impl ImportError {
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration(message.into())
    }

    pub fn input(message: impl Into<String>) -> Self {
        Self::Input(message.into())
    }

    pub fn join(message: impl Into<String>) -> Self {
        Self::Join(message.into())
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    pub fn resolution(message: impl Into<String>) -> Self {
        Self::Resolution(message.into())
    }

    pub fn parse(message: impl Into<String>) -> Self {
        Self::Parse(message.into())
    }

    pub fn function_file_missing(message: impl Into<String>) -> Self {
        Self::FunctionFileMissing(message.into())
    }

    /// True when a function name could not be found: unknown in every
    /// registry, or no function file to search. A function file that exists
    /// but fails to load is not a lookup failure.
    pub fn is_lookup_failure(&self) -> bool {
        matches!(self, Self::Resolution(_) | Self::FunctionFileMissing(_))
    }
}

pub type Result<T> = std::result::Result<T, ImportError>;
