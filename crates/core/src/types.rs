//! Record types handed between pipeline stages.

use serde::{Deserialize, Serialize};

/// Title used when structured extraction fails entirely.
pub const PLACEHOLDER_TITLE: &str = "Presentation content";

/// One slide's extracted content.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SlideRecord {
    /// 1-based position in the presentation.
    pub index: usize,

    /// Identifier the presentation assigns to the slide.
    pub slide_id: u32,

    /// Best-effort slide heading.
    pub title: String,

    /// Non-bulleted paragraph text, newline-joined and trimmed.
    pub body_text: String,

    /// Bulleted paragraphs in reading order.
    pub bullets: Vec<String>,

    /// Tables in shape order.
    pub tables: Vec<TableGrid>,

    /// Pictures in shape order.
    pub images: Vec<ImageDescriptor>,

    /// Speaker notes, empty if none.
    pub notes: String,
}

impl SlideRecord {
    /// Create an empty slide record.
    pub fn new(index: usize, slide_id: u32) -> Self {
        Self {
            index,
            slide_id,
            title: String::new(),
            body_text: String::new(),
            bullets: Vec::new(),
            tables: Vec::new(),
            images: Vec::new(),
            notes: String::new(),
        }
    }

    /// The single record produced when a presentation cannot be parsed.
    pub fn placeholder(file_name: &str, reason: &str) -> Self {
        let mut record = Self::new(1, 0);
        record.title = PLACEHOLDER_TITLE.to_string();
        record.body_text = format!(
            "Presentation file: {}\n\nStructured extraction was unavailable ({}); only this placeholder could be produced.",
            file_name, reason
        );
        record
    }

    /// The title synthesized for slides without any text.
    pub fn synthesized_title(slide_id: u32) -> String {
        format!("Slide {}", slide_id)
    }
}

/// A rectangular table.
///
/// Built only through [`TableGrid::from_rows`], which pads ragged rows so that
/// `rows == data.len()` and `cols == data[0].len()` always hold.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableGrid {
    pub rows: usize,
    pub cols: usize,
    pub data: Vec<Vec<String>>,
}

impl TableGrid {
    /// Build a grid from cell rows.
    pub fn from_rows(mut data: Vec<Vec<String>>) -> Self {
        let cols = data.iter().map(Vec::len).max().unwrap_or(0);
        for row in &mut data {
            row.resize(cols, String::new());
        }
        Self {
            rows: data.len(),
            cols,
            data,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.rows == 0 || self.cols == 0
    }
}

/// A picture placed on a slide.
///
/// Dimensions and position are pixels at 96 DPI.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImageDescriptor {
    /// Shape id within the slide.
    pub shape_id: u32,

    /// Display name of the shape.
    pub name: String,

    pub width: i64,
    pub height: i64,
    pub left: i64,
    pub top: i64,

    /// Archive part holding the image bytes, if the picture is embedded.
    pub part: Option<String>,

    /// Text recognized in the image.
    pub ocr_text: Option<String>,

    /// Mean recognition confidence, 0 to 100.
    pub ocr_confidence: Option<f32>,
}

impl ImageDescriptor {
    pub fn new(shape_id: u32, name: impl Into<String>) -> Self {
        Self {
            shape_id,
            name: name.into(),
            width: 0,
            height: 0,
            left: 0,
            top: 0,
            part: None,
            ocr_text: None,
            ocr_confidence: None,
        }
    }
}

/// Origin and failure history of a [`RestructuredRecord`].
///
/// `original_text` and `original_bullets` always hold the slide's text as it
/// was before restructuring.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Provenance {
    /// Backend identifier ("local" or "remote").
    pub backend: String,

    /// Model identifier sent to the backend.
    pub model: String,

    pub original_text: String,
    pub original_bullets: Vec<String>,

    /// Description of the failure, for degraded records.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,

    /// Unparsed model reply, when one was received but could not be decoded.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub raw_response: Option<String>,
}

impl Provenance {
    /// Provenance for a slide about to be sent to `backend`/`model`.
    pub fn for_slide(slide: &SlideRecord, backend: &str, model: &str) -> Self {
        Self {
            backend: backend.to_string(),
            model: model.to_string(),
            original_text: slide.body_text.clone(),
            original_bullets: slide.bullets.clone(),
            error: None,
            raw_response: None,
        }
    }
}

/// A slide rewritten into content, summary, key points and tags.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RestructuredRecord {
    pub index: usize,
    pub title: String,

    /// Restructured prose, or the original body text on fallback.
    pub content: String,

    /// Short synopsis; an explanatory marker on fallback.
    pub summary: String,

    pub key_points: Vec<String>,
    pub tags: Vec<String>,

    /// Tables carried over from the slide.
    pub tables: Vec<TableGrid>,

    /// Speaker notes carried over from the slide.
    pub notes: String,

    pub provenance: Provenance,
}

impl RestructuredRecord {
    /// A record built entirely from the original slide.
    ///
    /// Content and key points are the slide's own text; the caller supplies
    /// the summary and records the failure in `provenance`.
    pub fn from_slide(slide: &SlideRecord, summary: impl Into<String>, provenance: Provenance) -> Self {
        Self {
            index: slide.index,
            title: slide.title.clone(),
            content: slide.body_text.clone(),
            summary: summary.into(),
            key_points: slide.bullets.clone(),
            tags: Vec::new(),
            tables: slide.tables.clone(),
            notes: slide.notes.clone(),
            provenance,
        }
    }
}

/// Whether an optional capability could be set up.
///
/// Resolved once when a component is constructed; an unavailable capability
/// degrades the component to its no-op behaviour.
#[derive(Debug)]
pub enum Availability<T> {
    Available(T),
    Unavailable(String),
}

impl<T> Availability<T> {
    pub fn is_available(&self) -> bool {
        matches!(self, Availability::Available(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_table_dimensions() {
        let table = TableGrid::from_rows(vec![
            vec!["a".into(), "b".into(), "c".into()],
            vec!["d".into(), "e".into(), "f".into()],
        ]);
        assert_eq!(table.rows, 2);
        assert_eq!(table.cols, 3);
        assert!(!table.is_empty());
    }

    #[test]
    fn test_empty_table_has_zero_cols() {
        let table = TableGrid::from_rows(Vec::new());
        assert_eq!(table.rows, 0);
        assert_eq!(table.cols, 0);
        assert!(table.is_empty());
    }

    #[test]
    fn test_ragged_rows_are_padded() {
        let table = TableGrid::from_rows(vec![
            vec!["a".into()],
            vec!["b".into(), "c".into()],
        ]);
        assert_eq!(table.cols, 2);
        assert_eq!(table.data[0], vec!["a".to_string(), String::new()]);
        assert_eq!(table.cols, table.data[0].len());
    }

    #[test]
    fn test_placeholder_record() {
        let record = SlideRecord::placeholder("deck.pptx", "not a zip archive");
        assert_eq!(record.index, 1);
        assert_eq!(record.title, PLACEHOLDER_TITLE);
        assert!(record.body_text.contains("deck.pptx"));
        assert!(record.body_text.contains("not a zip archive"));
        assert!(record.bullets.is_empty());
    }

    #[test]
    fn test_fallback_record_preserves_original_text() {
        let mut slide = SlideRecord::new(3, 258);
        slide.title = "Intro".into();
        slide.body_text = "Welcome".into();
        slide.bullets = vec!["Point A".into()];
        slide.notes = "Say hello".into();

        let provenance = Provenance::for_slide(&slide, "local", "llama2");
        let record = RestructuredRecord::from_slide(&slide, "restructuring failed: x", provenance);

        assert_eq!(record.index, 3);
        assert_eq!(record.content, "Welcome");
        assert_eq!(record.key_points, vec!["Point A"]);
        assert!(record.tags.is_empty());
        assert_eq!(record.notes, "Say hello");
        assert_eq!(record.provenance.original_text, "Welcome");
        assert_eq!(record.provenance.original_bullets, vec!["Point A"]);
    }

    #[test]
    fn test_provenance_serialization_skips_absent_failure_fields() {
        let slide = SlideRecord::new(1, 256);
        let provenance = Provenance::for_slide(&slide, "remote", "gpt-3.5-turbo");
        let json = serde_json::to_string(&provenance).unwrap();
        assert!(json.contains("\"backend\":\"remote\""));
        assert!(!json.contains("raw_response"));
        assert!(!json.contains("error"));
    }
}
