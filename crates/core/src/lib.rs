//! Core record types, configuration, and error taxonomy shared by every stage
//! of the presentation restructuring pipeline.

pub mod config;
pub mod error;
pub mod text;
pub mod types;

pub use config::{AiService, OutputFormat, PipelineConfig};
pub use error::{Error, Result};
pub use text::{clean_text, is_bullet_text, BULLET_GLYPHS};
pub use types::{
    Availability, ImageDescriptor, Provenance, RestructuredRecord, SlideRecord, TableGrid,
};
