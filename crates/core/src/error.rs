//! Error types for presentation restructuring.
//!
//! Only [`Error::NotFound`], [`Error::IoError`] and [`Error::RenderError`]
//! abort a document. The content-quality variants are absorbed by the stage
//! that produced them and recorded in the output instead.

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias using our Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while converting a presentation.
#[derive(Error, Debug)]
pub enum Error {
    /// The input presentation does not exist.
    #[error("Input file not found: {}", .0.display())]
    NotFound(PathBuf),

    /// Failed to open or read a file.
    #[error("Failed to read file: {0}")]
    IoError(#[from] std::io::Error),

    /// ZIP archive error (PPTX input).
    #[error("ZIP error: {0}")]
    ZipError(String),

    /// XML parsing error (PPTX input).
    #[error("XML parsing error: {0}")]
    XmlError(String),

    /// The PPTX package is structurally unusable.
    #[error("PPTX parsing error: {0}")]
    PptxParseError(String),

    /// Structured extraction failed and a placeholder was produced instead.
    #[error("Extraction degraded to placeholder content: {0}")]
    ParseDegraded(String),

    /// Text recognition was not run for an image or for the whole document.
    #[error("Text recognition skipped: {0}")]
    RecognitionSkipped(String),

    /// The model backend answered with a non-success status.
    #[error("Backend returned status {status}: {body}")]
    BackendError { status: u16, body: String },

    /// The model backend could not be reached or timed out.
    #[error("Backend request failed: {0}")]
    TransportError(String),

    /// The model reply did not contain a usable JSON object.
    #[error("Could not parse model reply: {0}")]
    ResponseParseError(String),

    /// The output document could not be written.
    #[error("Failed to write {}: {source}", path.display())]
    RenderError {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The resolved configuration is unusable.
    #[error("Invalid configuration: {0}")]
    ConfigError(String),
}
