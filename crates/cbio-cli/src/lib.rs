//! Library components of the study importer CLI.

#![allow(missing_docs)]

pub mod input;
pub mod logging;
