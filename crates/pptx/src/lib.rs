//! PPTX (Office Open XML) slide extractor.
//!
//! Reads .pptx files, which are ZIP archives containing XML documents, into
//! [`deck_core::SlideRecord`] values.

#[cfg(any(test, feature = "fixtures"))]
pub mod fixture;
pub mod parser;
mod rels;
mod shapes;

pub use parser::{PptxParser, SlideMedia};
