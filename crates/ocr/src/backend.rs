//! Recognition backends.

use deck_core::{Error, PipelineConfig, Result};
use std::path::{Path, PathBuf};
use std::process::Command;

/// Pixel rectangle of a recognized token.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct BoundingBox {
    pub left: i32,
    pub top: i32,
    pub width: i32,
    pub height: i32,
}

/// One word reported by a backend.
#[derive(Debug, Clone, PartialEq)]
pub struct RecognizedToken {
    pub text: String,
    /// 0 to 100; negative when the engine reports none.
    pub confidence: f32,
    pub bbox: BoundingBox,
}

/// Something that turns an image file into words.
pub trait RecognitionBackend: Send + Sync {
    /// Short name for log messages.
    fn name(&self) -> &str;

    /// Recognize the words in the image at `image`.
    fn recognize(&self, image: &Path) -> Result<Vec<RecognizedToken>>;
}

/// The `tesseract` command-line engine.
#[derive(Debug, Clone)]
pub struct TesseractCli {
    command: PathBuf,
}

impl TesseractCli {
    pub fn new(command: impl Into<PathBuf>) -> Self {
        Self { command: command.into() }
    }

    /// Use `tesseract_path` when configured, otherwise `tesseract` from `PATH`.
    pub fn from_config(config: &PipelineConfig) -> Self {
        Self::new(
            config
                .tesseract_path
                .clone()
                .unwrap_or_else(|| PathBuf::from("tesseract")),
        )
    }

    /// Run `tesseract --version` and return its first line.
    pub fn probe(&self) -> Result<String> {
        let output = Command::new(&self.command)
            .arg("--version")
            .output()
            .map_err(|e| Error::RecognitionSkipped(format!("cannot run {}: {}", self.command.display(), e)))?;

        if !output.status.success() {
            return Err(Error::RecognitionSkipped(format!(
                "{} --version exited with {}",
                self.command.display(),
                output.status
            )));
        }

        // Older releases print the banner on stderr.
        let banner = if output.stdout.is_empty() { output.stderr } else { output.stdout };
        Ok(String::from_utf8_lossy(&banner)
            .lines()
            .next()
            .unwrap_or_default()
            .trim()
            .to_string())
    }
}

impl RecognitionBackend for TesseractCli {
    fn name(&self) -> &str {
        "tesseract"
    }

    fn recognize(&self, image: &Path) -> Result<Vec<RecognizedToken>> {
        let output = Command::new(&self.command)
            .arg(image)
            .arg("stdout")
            .arg("tsv")
            .output()
            .map_err(|e| Error::RecognitionSkipped(format!("cannot run {}: {}", self.command.display(), e)))?;

        if !output.status.success() {
            return Err(Error::RecognitionSkipped(format!(
                "{} failed on {} ({}): {}",
                self.command.display(),
                image.display(),
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            )));
        }

        Ok(parse_tsv(&String::from_utf8_lossy(&output.stdout)))
    }
}

/// Parse tesseract's TSV output into word tokens.
///
/// Columns: level, page_num, block_num, par_num, line_num, word_num, left,
/// top, width, height, conf, text. Rows without text (page, block and line
/// rows) are dropped.
pub fn parse_tsv(tsv: &str) -> Vec<RecognizedToken> {
    tsv.lines()
        .filter(|line| !line.starts_with("level"))
        .filter_map(|line| {
            let columns: Vec<&str> = line.splitn(12, '\t').collect();
            if columns.len() < 12 {
                return None;
            }
            let text = columns[11].trim();
            if text.is_empty() {
                return None;
            }
            let int = |i: usize| columns[i].trim().parse::<i32>().unwrap_or(0);
            Some(RecognizedToken {
                text: text.to_string(),
                confidence: columns[10].trim().parse().unwrap_or(-1.0),
                bbox: BoundingBox {
                    left: int(6),
                    top: int(7),
                    width: int(8),
                    height: int(9),
                },
            })
        })
        .collect()
}
