//! Image-text enrichment.
//!
//! Pulls embedded pictures out of a presentation, prepares them for
//! recognition, runs a [`RecognitionBackend`] and folds the recognized text
//! back into the slide records.

pub mod backend;
pub mod enricher;
pub mod preprocess;

pub use backend::{parse_tsv, BoundingBox, RecognitionBackend, RecognizedToken, TesseractCli};
pub use enricher::{ImageTextEnricher, RecognitionResult};
pub use preprocess::{enhance_contrast, preprocess};
