//! Study import orchestration.
//!
//! - **document**: study definition parsing and block discovery
//! - **manifest**: `meta_*.txt` rendering from compiled-in templates
//! - **processors**: one processor per output entity
//! - **study**: the orchestrator tying them together
//! - **color**: cancer type colors

pub mod color;
pub mod document;
pub mod manifest;
pub mod processors;
pub mod study;

pub use color::{CSS_COLORS, pick_color};
pub use document::{DiscoveredBlock, RESERVED_KEYS, StudyDocument, StudySettings};
pub use manifest::{ManifestTemplate, render_manifest, write_manifest};
pub use processors::{EntityProcessor, FileKind, WrittenFile};
pub use study::{
    EntityReport, StudyReport, cosmetic_seed, import_study, process_study,
};
