//! Merges recognized image text into slide records.

use crate::backend::{BoundingBox, RecognitionBackend, RecognizedToken, TesseractCli};
use crate::preprocess::preprocess;
use deck_core::{Availability, Error, PipelineConfig, Result, SlideRecord};
use deck_pptx::{PptxParser, SlideMedia};
use std::collections::HashMap;
use std::fmt::Write as _;
use std::path::{Path, PathBuf};

/// Extensions of the raster formats handed to recognition.
const RASTER_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "gif", "bmp", "tif", "tiff", "webp"];

/// Header of the section appended to a slide's body text.
pub const SECTION_HEADER: &str = "[Image recognition results]:";

/// Text recognized in one picture.
#[derive(Debug, Clone, PartialEq)]
pub struct RecognitionResult {
    pub slide_index: usize,
    pub shape_id: u32,
    /// Prepared image that was recognized.
    pub image_path: PathBuf,
    /// Tokens joined by single spaces.
    pub text: String,
    /// Mean token confidence, 0 to 100.
    pub confidence: f32,
    /// Box of the first token.
    pub bbox: BoundingBox,
}

impl RecognitionResult {
    /// Summarize backend tokens; `None` when nothing was recognized.
    pub fn from_tokens(slide_index: usize, shape_id: u32, image_path: &Path, tokens: &[RecognizedToken]) -> Option<Self> {
        let words: Vec<&RecognizedToken> = tokens.iter().filter(|t| !t.text.trim().is_empty()).collect();
        let first = words.first()?;

        let confidence = words.iter().map(|t| t.confidence).sum::<f32>() / words.len() as f32;
        Some(Self {
            slide_index,
            shape_id,
            image_path: image_path.to_path_buf(),
            text: words.iter().map(|t| t.text.trim()).collect::<Vec<_>>().join(" "),
            confidence,
            bbox: first.bbox,
        })
    }
}

/// Adds text found in embedded pictures to slide records.
pub struct ImageTextEnricher {
    backend: Availability<Box<dyn RecognitionBackend>>,
    parser: PptxParser,
}

impl ImageTextEnricher {
    /// Set up the tesseract backend if recognition is enabled and the engine runs.
    pub fn new(config: &PipelineConfig) -> Self {
        if !config.enable_ocr {
            return Self::unavailable("image text recognition is disabled");
        }

        let cli = TesseractCli::from_config(config);
        match cli.probe() {
            Ok(version) => {
                log::info!("Using {}", version);
                Self::with_backend(Box::new(cli))
            }
            Err(e) => {
                log::warn!("{}", e);
                Self::unavailable(&e.to_string())
            }
        }
    }

    /// Use a specific backend.
    pub fn with_backend(backend: Box<dyn RecognitionBackend>) -> Self {
        Self {
            backend: Availability::Available(backend),
            parser: PptxParser::new(),
        }
    }

    /// An enricher that leaves slides untouched.
    pub fn unavailable(reason: &str) -> Self {
        Self {
            backend: Availability::Unavailable(reason.to_string()),
            parser: PptxParser::new(),
        }
    }

    pub fn is_available(&self) -> bool {
        self.backend.is_available()
    }

    /// Return copies of `slides` with recognized picture text merged in.
    ///
    /// Failures never abort: a failing picture is skipped, and if the media
    /// cannot be read at all the slides come back unchanged.
    pub fn enrich(&self, path: &Path, slides: &[SlideRecord]) -> Vec<SlideRecord> {
        let backend = match &self.backend {
            Availability::Available(backend) => backend,
            Availability::Unavailable(reason) => {
                log::info!("{}", Error::RecognitionSkipped(reason.clone()));
                return slides.to_vec();
            }
        };

        match self.recognize_all(backend.as_ref(), path) {
            Ok(results) => {
                log::info!("Recognized text in {} pictures of {}", results.len(), path.display());
                merge_results(slides, &results)
            }
            Err(e) => {
                log::warn!("Image text recognition failed for {}: {}", path.display(), e);
                slides.to_vec()
            }
        }
    }

    fn recognize_all(&self, backend: &dyn RecognitionBackend, path: &Path) -> Result<Vec<RecognitionResult>> {
        let media = self.parser.extract_media(path)?;
        let scratch = tempfile::tempdir()?;
        let mut per_slide: HashMap<usize, usize> = HashMap::new();
        let mut results = Vec::new();

        for item in &media {
            let ext = item.extension();
            if !RASTER_EXTENSIONS.contains(&ext.as_str()) {
                log::debug!("Skipping non-raster picture {}", item.part);
                continue;
            }

            let n = per_slide.entry(item.slide_index).or_insert(0);
            *n += 1;
            let file = scratch
                .path()
                .join(format!("slide_{}_img_{}.png", item.slide_index, n));

            match recognize_one(backend, item, &file) {
                Ok(Some(result)) => results.push(result),
                Ok(None) => log::debug!("No text in {} on slide {}", item.name, item.slide_index),
                Err(e) => log::warn!("Skipping {} on slide {}: {}", item.name, item.slide_index, e),
            }
        }

        Ok(results)
    }
}

fn recognize_one(backend: &dyn RecognitionBackend, item: &SlideMedia, file: &Path) -> Result<Option<RecognitionResult>> {
    let image = image::load_from_memory(&item.bytes)
        .map_err(|e| Error::RecognitionSkipped(format!("cannot decode {}: {}", item.part, e)))?;

    preprocess(image)
        .save(file)
        .map_err(|e| Error::RecognitionSkipped(format!("cannot write {}: {}", file.display(), e)))?;

    log::debug!("Running {} on {}", backend.name(), file.display());
    let tokens = backend.recognize(file)?;
    Ok(RecognitionResult::from_tokens(item.slide_index, item.shape_id, file, &tokens))
}

/// Append recognition sections to the slides that have results.
pub fn merge_results(slides: &[SlideRecord], results: &[RecognitionResult]) -> Vec<SlideRecord> {
    slides
        .iter()
        .map(|slide| {
            let mine: Vec<&RecognitionResult> = results.iter().filter(|r| r.slide_index == slide.index).collect();
            if mine.is_empty() {
                return slide.clone();
            }

            let mut record = slide.clone();
            let mut section = String::from(SECTION_HEADER);
            for (n, result) in mine.iter().enumerate() {
                let _ = write!(
                    section,
                    "\nImage {}: {}\nConfidence: {:.2}",
                    n + 1,
                    result.text,
                    result.confidence
                );
                if let Some(image) = record.images.iter_mut().find(|img| img.shape_id == result.shape_id) {
                    image.ocr_text = Some(result.text.clone());
                    image.ocr_confidence = Some(result.confidence);
                }
            }

            record.body_text = if record.body_text.is_empty() {
                section
            } else {
                format!("{}\n\n{}", record.body_text, section)
            };
            record
        })
        .collect()
}
