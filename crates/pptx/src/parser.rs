//! PPTX file parser implementation.

use crate::rels::{
    extract_slide_number, parse_relationships, parse_slide_list, rels_path_for, resolve_part, Relationship,
};
use crate::shapes::{parse_shapes, ShapeInfo, ShapeKind, EMU_PER_PIXEL};
use deck_core::{clean_text, is_bullet_text, Error, ImageDescriptor, Result, SlideRecord, TableGrid};
use std::fs::File;
use std::io::{BufReader, Read, Seek};
use std::path::Path;
use zip::ZipArchive;

const PRESENTATION_PART: &str = "ppt/presentation.xml";

/// Parser for PPTX (Office Open XML) files.
pub struct PptxParser;

/// Bytes of one embedded picture.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SlideMedia {
    /// 1-based index of the slide showing the picture.
    pub slide_index: usize,
    pub shape_id: u32,
    pub name: String,
    /// Archive part name, e.g. `ppt/media/image1.png`.
    pub part: String,
    pub bytes: Vec<u8>,
}

impl SlideMedia {
    /// Lowercased extension of the part name.
    pub fn extension(&self) -> String {
        self.part
            .rsplit_once('.')
            .map(|(_, ext)| ext.to_ascii_lowercase())
            .unwrap_or_default()
    }
}

/// A slide part with the identifier the presentation assigns it.
#[derive(Debug, Clone, PartialEq, Eq)]
struct SlidePart {
    id: u32,
    path: String,
}

impl PptxParser {
    /// Create a new PPTX parser.
    pub fn new() -> Self {
        Self
    }

    /// Extract slide records from a presentation on disk.
    ///
    /// A missing file is an error. Any other failure degrades to a single
    /// placeholder record naming the file and the failure.
    pub fn extract(&self, path: &Path) -> Result<Vec<SlideRecord>> {
        if !path.exists() {
            return Err(Error::NotFound(path.to_path_buf()));
        }

        let file = File::open(path)?;
        match self.parse(BufReader::new(file)) {
            Ok(slides) => {
                log::info!("Extracted {} slides from {}", slides.len(), path.display());
                Ok(slides)
            }
            Err(e) => {
                let reason = e.to_string();
                log::warn!("{}: {}", path.display(), Error::ParseDegraded(reason.clone()));
                let file_name = path
                    .file_name()
                    .map(|n| n.to_string_lossy().into_owned())
                    .unwrap_or_else(|| path.display().to_string());
                Ok(vec![SlideRecord::placeholder(&file_name, &reason)])
            }
        }
    }

    /// Parse a PPTX package from a reader, without any fallback.
    pub fn parse<R: Read + Seek>(&self, reader: R) -> Result<Vec<SlideRecord>> {
        let mut archive =
            ZipArchive::new(reader).map_err(|e| Error::ZipError(format!("Failed to open ZIP: {}", e)))?;

        let parts = self.get_slide_order(&mut archive)?;
        let mut slides = Vec::with_capacity(parts.len());

        for (idx, part) in parts.iter().enumerate() {
            slides.push(self.parse_slide(&mut archive, part, idx + 1)?);
        }

        Ok(slides)
    }

    /// Read the bytes of every embedded picture, in extraction order.
    ///
    /// Pictures whose part is missing from the archive are skipped.
    pub fn extract_media(&self, path: &Path) -> Result<Vec<SlideMedia>> {
        if !path.exists() {
            return Err(Error::NotFound(path.to_path_buf()));
        }

        let file = File::open(path)?;
        let mut archive = ZipArchive::new(BufReader::new(file))
            .map_err(|e| Error::ZipError(format!("Failed to open ZIP: {}", e)))?;

        let parts = self.get_slide_order(&mut archive)?;
        let mut media = Vec::new();

        for (idx, part) in parts.iter().enumerate() {
            let slide = self.parse_slide(&mut archive, part, idx + 1)?;
            for image in &slide.images {
                let Some(image_part) = &image.part else {
                    continue;
                };
                match self.read_bytes_from_archive(&mut archive, image_part) {
                    Ok(bytes) => media.push(SlideMedia {
                        slide_index: slide.index,
                        shape_id: image.shape_id,
                        name: image.name.clone(),
                        part: image_part.clone(),
                        bytes,
                    }),
                    Err(e) => log::warn!("Skipping picture '{}' on slide {}: {}", image.name, slide.index, e),
                }
            }
        }

        Ok(media)
    }

    /// Get the ordered slide parts.
    ///
    /// Uses the `sldIdLst` of presentation.xml; falls back to ordering the
    /// slide relationships by number when the list is absent.
    fn get_slide_order<R: Read + Seek>(&self, archive: &mut ZipArchive<R>) -> Result<Vec<SlidePart>> {
        let rels_content = self.read_file_from_archive(archive, &rels_path_for(PRESENTATION_PART))?;
        let slide_rels: Vec<Relationship> = parse_relationships(&rels_content)?
            .into_iter()
            .filter(|rel| rel.is("slide"))
            .collect();

        let entries = match self.read_file_from_archive(archive, PRESENTATION_PART) {
            Ok(content) => parse_slide_list(&content)?,
            Err(e) => {
                log::debug!("No usable presentation.xml ({}), ordering slides by number", e);
                Vec::new()
            }
        };

        if !entries.is_empty() {
            let mut parts = Vec::with_capacity(entries.len());
            for entry in entries {
                let rel = slide_rels
                    .iter()
                    .find(|rel| rel.id == entry.rel_id)
                    .ok_or_else(|| {
                        Error::PptxParseError(format!("Slide {} refers to unknown relationship {}", entry.id, entry.rel_id))
                    })?;
                parts.push(SlidePart {
                    id: entry.id,
                    path: resolve_part(PRESENTATION_PART, &rel.target),
                });
            }
            return Ok(parts);
        }

        let mut slides: Vec<(String, Option<usize>)> = slide_rels
            .iter()
            .map(|rel| {
                let order_num = extract_slide_number(&rel.target).or_else(|| extract_slide_number(&rel.id));
                (resolve_part(PRESENTATION_PART, &rel.target), order_num)
            })
            .collect();

        slides.sort_by(|a, b| match (a.1, b.1) {
            (Some(na), Some(nb)) => na.cmp(&nb),
            (Some(_), None) => std::cmp::Ordering::Less,
            (None, Some(_)) => std::cmp::Ordering::Greater,
            (None, None) => a.0.cmp(&b.0),
        });

        Ok(slides
            .into_iter()
            .map(|(path, num)| SlidePart {
                id: num.and_then(|n| u32::try_from(n).ok()).unwrap_or(0),
                path,
            })
            .collect())
    }

    /// Parse a single slide from the archive.
    fn parse_slide<R: Read + Seek>(
        &self,
        archive: &mut ZipArchive<R>,
        part: &SlidePart,
        index: usize,
    ) -> Result<SlideRecord> {
        let content = self.read_file_from_archive(archive, &part.path)?;
        let shapes = parse_shapes(&content)?;

        // A slide without relationships is valid; it just has no pictures or notes.
        let rels = match self.read_file_from_archive(archive, &rels_path_for(&part.path)) {
            Ok(xml) => parse_relationships(&xml)?,
            Err(_) => Vec::new(),
        };

        let mut slide = build_record(index, part.id, &shapes, &part.path, &rels);

        if let Some(notes_rel) = rels.iter().find(|rel| rel.is("notesSlide") && !rel.external) {
            let notes_part = resolve_part(&part.path, &notes_rel.target);
            match self.read_file_from_archive(archive, &notes_part) {
                Ok(xml) => slide.notes = notes_text(&parse_shapes(&xml)?),
                Err(e) => log::warn!("Slide {}: notes unavailable: {}", index, e),
            }
        }

        log::debug!(
            "Slide {} ({}): {} bullets, {} tables, {} images",
            index,
            part.path,
            slide.bullets.len(),
            slide.tables.len(),
            slide.images.len()
        );

        Ok(slide)
    }

    /// Read a file from the ZIP archive.
    fn read_file_from_archive<R: Read + Seek>(&self, archive: &mut ZipArchive<R>, path: &str) -> Result<String> {
        let mut file = archive
            .by_name(path)
            .map_err(|e| Error::ZipError(format!("File not found in archive '{}': {}", path, e)))?;

        let mut content = String::new();
        file.read_to_string(&mut content)
            .map_err(|e| Error::ZipError(format!("Failed to read '{}': {}", path, e)))?;

        Ok(content)
    }

    /// Read a binary part from the ZIP archive.
    fn read_bytes_from_archive<R: Read + Seek>(&self, archive: &mut ZipArchive<R>, path: &str) -> Result<Vec<u8>> {
        let mut file = archive
            .by_name(path)
            .map_err(|e| Error::ZipError(format!("File not found in archive '{}': {}", path, e)))?;

        let mut bytes = Vec::new();
        file.read_to_end(&mut bytes)
            .map_err(|e| Error::ZipError(format!("Failed to read '{}': {}", path, e)))?;

        Ok(bytes)
    }
}

impl Default for PptxParser {
    fn default() -> Self {
        Self::new()
    }
}

/// Assemble a slide record from its shapes.
fn build_record(index: usize, slide_id: u32, shapes: &[ShapeInfo], slide_part: &str, rels: &[Relationship]) -> SlideRecord {
    let mut slide = SlideRecord::new(index, slide_id);

    let title_pos = shapes.iter().position(|s| s.is_title());
    let placeholder_title = title_pos
        .map(|pos| clean_text(&shapes[pos].text()))
        .filter(|t| !t.is_empty());

    slide.title = placeholder_title
        .or_else(|| {
            shapes
                .iter()
                .filter(|s| s.has_text_frame)
                .map(|s| clean_text(&s.text()))
                .find(|t| !t.is_empty())
        })
        .unwrap_or_else(|| SlideRecord::synthesized_title(slide_id));

    let mut body_lines = Vec::new();

    for (pos, shape) in shapes.iter().enumerate() {
        match shape.kind {
            ShapeKind::Text if Some(pos) != title_pos => {
                for paragraph in &shape.paragraphs {
                    let text = clean_text(&paragraph.text);
                    if text.is_empty() {
                        continue;
                    }
                    if paragraph.level > 0 || is_bullet_text(&text) {
                        slide.bullets.push(text);
                    } else {
                        body_lines.push(text);
                    }
                }
            }
            ShapeKind::Frame => {
                if let Some(rows) = &shape.table {
                    let data = rows
                        .iter()
                        .map(|row| row.iter().map(|cell| clean_text(cell)).collect())
                        .collect();
                    slide.tables.push(TableGrid::from_rows(data));
                }
            }
            ShapeKind::Picture => {
                if let Some(image) = image_descriptor(shape, slide_part, rels) {
                    slide.images.push(image);
                }
            }
            _ => {}
        }
    }

    slide.body_text = body_lines.join("\n").trim().to_string();
    slide
}

/// Describe a picture shape; linked (non-embedded) pictures are skipped.
fn image_descriptor(shape: &ShapeInfo, slide_part: &str, rels: &[Relationship]) -> Option<ImageDescriptor> {
    let embed = shape.embed.as_deref()?;
    let rel = rels.iter().find(|rel| rel.id == embed)?;
    if rel.external {
        log::debug!("Skipping linked picture '{}'", shape.name);
        return None;
    }

    let mut image = ImageDescriptor::new(shape.id, shape.name.clone());
    image.width = shape.cx / EMU_PER_PIXEL;
    image.height = shape.cy / EMU_PER_PIXEL;
    image.left = shape.x / EMU_PER_PIXEL;
    image.top = shape.y / EMU_PER_PIXEL;
    image.part = Some(resolve_part(slide_part, &rel.target));
    Some(image)
}

/// Speaker notes live in the notes slide's body placeholder.
fn notes_text(shapes: &[ShapeInfo]) -> String {
    shapes
        .iter()
        .filter(|s| s.placeholder.as_deref() == Some("body"))
        .map(|s| clean_text(&s.text()))
        .filter(|t| !t.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixture::{FixtureSlide, PptxFixture};
    use std::io::Cursor;

    fn parse(fixture: PptxFixture) -> Vec<SlideRecord> {
        PptxParser::new()
            .parse(Cursor::new(fixture.to_bytes().unwrap()))
            .unwrap()
    }

    #[test]
    fn test_title_body_and_bullets() {
        let slides = parse(
            PptxFixture::new().slide(
                FixtureSlide::new()
                    .title("Intro")
                    .paragraph("Welcome")
                    .bullet("Point A")
                    .paragraph("• Point B"),
            ),
        );

        assert_eq!(slides.len(), 1);
        let slide = &slides[0];
        assert_eq!(slide.index, 1);
        assert_eq!(slide.slide_id, 256);
        assert_eq!(slide.title, "Intro");
        assert_eq!(slide.body_text, "Welcome");
        assert_eq!(slide.bullets, vec!["Point A", "• Point B"]);
    }

    #[test]
    fn test_title_falls_back_to_first_text_then_slide_id() {
        let slides = parse(
            PptxFixture::new()
                .slide(FixtureSlide::new().text_box("Loose heading"))
                .slide(FixtureSlide::new()),
        );

        assert_eq!(slides[0].title, "Loose heading");
        assert_eq!(slides[0].body_text, "Loose heading");
        assert_eq!(slides[1].title, "Slide 257");
        assert!(slides[1].body_text.is_empty());
    }

    #[test]
    fn test_title_fallback_needs_a_text_frame() {
        use crate::shapes::Paragraph;

        let frameless = ShapeInfo {
            kind: ShapeKind::Frame,
            paragraphs: vec![Paragraph { level: 0, text: "Chart label".into() }],
            ..ShapeInfo::default()
        };
        let text_box = ShapeInfo {
            has_text_frame: true,
            paragraphs: vec![Paragraph { level: 0, text: "Real heading".into() }],
            ..ShapeInfo::default()
        };

        let slide = build_record(1, 256, &[frameless, text_box], "ppt/slides/slide1.xml", &[]);
        assert_eq!(slide.title, "Real heading");
    }

    #[test]
    fn test_empty_title_placeholder_is_not_used() {
        let slides = parse(PptxFixture::new().slide(FixtureSlide::new().title("  ").paragraph("Body first")));
        assert_eq!(slides[0].title, "Body first");
    }

    #[test]
    fn test_table_dimensions_and_cells() {
        let slides = parse(PptxFixture::new().slide(
            FixtureSlide::new()
                .title("Numbers")
                .table(&[&["a", "b", "c"], &["d", "e", "f"]]),
        ));

        let table = &slides[0].tables[0];
        assert_eq!(table.rows, 2);
        assert_eq!(table.cols, 3);
        assert_eq!(table.data[1][2], "f");
    }

    #[test]
    fn test_images_and_notes() {
        let slides = parse(
            PptxFixture::new().slide(
                FixtureSlide::new()
                    .title("Chart")
                    .image("Picture 1", b"not really a png".to_vec(), "png")
                    .notes("Mention the trend"),
            ),
        );

        let slide = &slides[0];
        assert_eq!(slide.notes, "Mention the trend");
        assert_eq!(slide.images.len(), 1);
        let image = &slide.images[0];
        assert_eq!(image.name, "Picture 1");
        assert_eq!(image.part.as_deref(), Some("ppt/media/image1.png"));
        assert_eq!(image.width, 300);
        assert_eq!(image.height, 200);
        assert_eq!(image.left, 100);
        assert_eq!(image.top, 100);
    }

    #[test]
    fn test_slides_in_order() {
        let slides = parse(
            PptxFixture::new()
                .slide(FixtureSlide::new().title("One"))
                .slide(FixtureSlide::new().title("Two"))
                .slide(FixtureSlide::new().title("Three")),
        );

        let titles: Vec<_> = slides.iter().map(|s| s.title.as_str()).collect();
        assert_eq!(titles, vec!["One", "Two", "Three"]);
        let indices: Vec<_> = slides.iter().map(|s| s.index).collect();
        assert_eq!(indices, vec![1, 2, 3]);
    }

    #[test]
    fn test_empty_presentation() {
        assert!(parse(PptxFixture::new()).is_empty());
    }

    #[test]
    fn test_extract_missing_file_is_not_found() {
        let err = PptxParser::new()
            .extract(Path::new("/definitely/not/here.pptx"))
            .unwrap_err();
        assert!(matches!(err, Error::NotFound(_)));
    }

    #[test]
    fn test_extract_non_zip_degrades_to_placeholder() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.pptx");
        std::fs::write(&path, b"this is not a zip archive").unwrap();

        let slides = PptxParser::new().extract(&path).unwrap();
        assert_eq!(slides.len(), 1);
        assert_eq!(slides[0].title, deck_core::types::PLACEHOLDER_TITLE);
        assert!(slides[0].body_text.contains("broken.pptx"));
    }

    #[test]
    fn test_extract_media() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("deck.pptx");
        PptxFixture::new()
            .slide(FixtureSlide::new().title("No pictures"))
            .slide(
                FixtureSlide::new()
                    .image("Logo", vec![1, 2, 3], "png")
                    .image("Scan", vec![4, 5], "jpeg"),
            )
            .write_to(&path)
            .unwrap();

        let media = PptxParser::new().extract_media(&path).unwrap();
        assert_eq!(media.len(), 2);
        assert_eq!(media[0].slide_index, 2);
        assert_eq!(media[0].name, "Logo");
        assert_eq!(media[0].bytes, vec![1, 2, 3]);
        assert_eq!(media[1].extension(), "jpeg");
        assert_ne!(media[0].shape_id, media[1].shape_id);
    }
}
