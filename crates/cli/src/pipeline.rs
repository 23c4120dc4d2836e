//! Per-document wiring of the extraction, enrichment, restructuring and
//! rendering stages.

use anyhow::{Context, Result};
use deck_ai::Restructurer;
use deck_core::{OutputFormat, PipelineConfig};
use deck_ocr::ImageTextEnricher;
use deck_pptx::PptxParser;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

/// Stages slower than this are logged as warnings.
const SLOW_STAGE: Duration = Duration::from_secs(1);

/// Logs a stage's wall time when finished.
struct StageTimer {
    stage: &'static str,
    started: Instant,
}

impl StageTimer {
    fn start(stage: &'static str) -> Self {
        Self {
            stage,
            started: Instant::now(),
        }
    }

    fn finish(self) {
        let elapsed = self.started.elapsed();
        if elapsed > SLOW_STAGE {
            log::warn!("{} took {:.2}s", self.stage, elapsed.as_secs_f64());
        } else {
            log::debug!("{} took {:.3}s", self.stage, elapsed.as_secs_f64());
        }
    }
}

/// Converts presentations into restructured documents.
pub struct Pipeline {
    format: OutputFormat,
    parser: PptxParser,
    enricher: ImageTextEnricher,
    restructurer: Restructurer,
}

impl Pipeline {
    /// Build every stage from the configuration.
    pub fn new(config: &PipelineConfig) -> Result<Self> {
        let restructurer = Restructurer::new(config).context("Failed to set up the model backend")?;
        Ok(Self::with_stages(
            config.output_format,
            ImageTextEnricher::new(config),
            restructurer,
        ))
    }

    pub fn with_stages(format: OutputFormat, enricher: ImageTextEnricher, restructurer: Restructurer) -> Self {
        Self {
            format,
            parser: PptxParser::new(),
            enricher,
            restructurer,
        }
    }

    /// Convert one presentation and return the written file.
    pub fn convert(&self, input: &Path, output_dir: Option<&Path>) -> Result<PathBuf> {
        let timer = StageTimer::start("Extraction");
        let slides = self
            .parser
            .extract(input)
            .with_context(|| format!("Failed to read {}", input.display()))?;
        timer.finish();
        log::info!("Found {} slides in {}", slides.len(), input.display());

        let slides = if self.enricher.is_available() {
            let timer = StageTimer::start("Image text recognition");
            let enriched = self.enricher.enrich(input, &slides);
            timer.finish();
            enriched
        } else {
            slides
        };

        let timer = StageTimer::start("Restructuring");
        let records = self.restructurer.restructure(&slides);
        timer.finish();

        let output_path = output_path(input, output_dir, self.format)?;
        let timer = StageTimer::start("Rendering");
        deck_render::render(&records, &output_path, self.format)?;
        timer.finish();

        Ok(output_path)
    }
}

/// `<stem>.<ext>` under `output_dir`, or next to the input.
fn output_path(input: &Path, output_dir: Option<&Path>, format: OutputFormat) -> Result<PathBuf> {
    let stem = input.file_stem().and_then(|s| s.to_str()).unwrap_or("output");
    let output_filename = format!("{}.{}", stem, format.extension());

    let output_path = match output_dir {
        Some(dir) => {
            std::fs::create_dir_all(dir)
                .with_context(|| format!("Failed to create output directory: {}", dir.display()))?;
            dir.join(output_filename)
        }
        None => match input.parent() {
            Some(parent) => parent.join(output_filename),
            None => PathBuf::from(output_filename),
        },
    };

    Ok(output_path)
}
