//! Builders for small in-memory presentations.
//!
//! Only the parts the extractor reads are written: content types, the
//! presentation part with its slide list, slides, notes slides, media and
//! their relationships.

use quick_xml::escape::escape;
use std::fmt::Write as _;
use std::io::{Cursor, Write};
use std::path::Path;
use zip::write::FileOptions;
use zip::ZipWriter;

const NS: &str = r#"xmlns:a="http://schemas.openxmlformats.org/drawingml/2006/main" xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships" xmlns:p="http://schemas.openxmlformats.org/presentationml/2006/main""#;
const REL_NS: &str = "http://schemas.openxmlformats.org/officeDocument/2006/relationships";
const FIRST_SLIDE_ID: u32 = 256;

#[derive(Debug, Clone)]
enum Shape {
    Title(String),
    TextBox(String),
    Body(Vec<(u32, String)>),
    Table(Vec<Vec<String>>),
    Picture { name: String, bytes: Vec<u8>, ext: String },
}

/// One slide of a [`PptxFixture`].
#[derive(Debug, Clone, Default)]
pub struct FixtureSlide {
    shapes: Vec<Shape>,
    notes: Option<String>,
}

impl FixtureSlide {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a title placeholder.
    pub fn title(mut self, text: &str) -> Self {
        self.shapes.push(Shape::Title(text.to_string()));
        self
    }

    /// Add a plain text box (no placeholder).
    pub fn text_box(mut self, text: &str) -> Self {
        self.shapes.push(Shape::TextBox(text.to_string()));
        self
    }

    /// Add a level-0 paragraph to the body placeholder.
    pub fn paragraph(self, text: &str) -> Self {
        self.body_paragraph(0, text)
    }

    /// Add a level-1 paragraph to the body placeholder.
    pub fn bullet(self, text: &str) -> Self {
        self.body_paragraph(1, text)
    }

    fn body_paragraph(mut self, level: u32, text: &str) -> Self {
        if let Some(Shape::Body(paragraphs)) = self.shapes.iter_mut().find(|s| matches!(s, Shape::Body(_))) {
            paragraphs.push((level, text.to_string()));
        } else {
            self.shapes.push(Shape::Body(vec![(level, text.to_string())]));
        }
        self
    }

    /// Add a table.
    pub fn table(mut self, rows: &[&[&str]]) -> Self {
        let rows = rows
            .iter()
            .map(|row| row.iter().map(|cell| cell.to_string()).collect())
            .collect();
        self.shapes.push(Shape::Table(rows));
        self
    }

    /// Add an embedded picture stored as `ppt/media/imageN.<ext>`.
    pub fn image(mut self, name: &str, bytes: Vec<u8>, ext: &str) -> Self {
        self.shapes.push(Shape::Picture {
            name: name.to_string(),
            bytes,
            ext: ext.to_string(),
        });
        self
    }

    /// Set the speaker notes.
    pub fn notes(mut self, text: &str) -> Self {
        self.notes = Some(text.to_string());
        self
    }
}

/// A presentation assembled in memory.
#[derive(Debug, Clone, Default)]
pub struct PptxFixture {
    slides: Vec<FixtureSlide>,
}

impl PptxFixture {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn slide(mut self, slide: FixtureSlide) -> Self {
        self.slides.push(slide);
        self
    }

    /// Write the package to `path`.
    pub fn write_to(&self, path: &Path) -> std::io::Result<()> {
        std::fs::write(path, self.to_bytes()?)
    }

    /// Build the package bytes.
    pub fn to_bytes(&self) -> std::io::Result<Vec<u8>> {
        let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
        let mut media_count = 0;

        let mut overrides = String::new();
        let mut slide_list = String::new();
        let mut presentation_rels = String::new();

        for (i, slide) in self.slides.iter().enumerate() {
            let n = i + 1;
            let _ = write!(
                overrides,
                r#"<Override PartName="/ppt/slides/slide{n}.xml" ContentType="application/vnd.openxmlformats-officedocument.presentationml.slide+xml"/>"#
            );
            let _ = write!(
                slide_list,
                r#"<p:sldId id="{}" r:id="rId{n}"/>"#,
                FIRST_SLIDE_ID + i as u32
            );
            let _ = write!(
                presentation_rels,
                r#"<Relationship Id="rId{n}" Type="{REL_NS}/slide" Target="slides/slide{n}.xml"/>"#
            );

            let mut slide_rels = String::new();
            let mut tree = String::new();
            let mut next_id = 2;
            let mut next_rel = 1;

            for shape in &slide.shapes {
                let id = next_id;
                next_id += 1;
                match shape {
                    Shape::Title(text) => {
                        tree.push_str(&text_shape(id, "Title", Some("type=\"title\""), &[(0, text.clone())]));
                    }
                    Shape::TextBox(text) => {
                        tree.push_str(&text_shape(id, "TextBox", None, &[(0, text.clone())]));
                    }
                    Shape::Body(paragraphs) => {
                        tree.push_str(&text_shape(id, "Content", Some("idx=\"1\""), paragraphs));
                    }
                    Shape::Table(rows) => {
                        tree.push_str(&table_frame(id, rows));
                    }
                    Shape::Picture { name, bytes, ext } => {
                        media_count += 1;
                        let media_name = format!("image{}.{}", media_count, ext);
                        let rel_id = format!("rId{}", next_rel);
                        next_rel += 1;
                        let _ = write!(
                            slide_rels,
                            r#"<Relationship Id="{rel_id}" Type="{REL_NS}/image" Target="../media/{media_name}"/>"#
                        );
                        tree.push_str(&picture(id, name, &rel_id));
                        add_part(&mut zip, &format!("ppt/media/{}", media_name), bytes)?;
                    }
                }
            }

            if let Some(notes) = &slide.notes {
                let rel_id = format!("rId{}", next_rel);
                let _ = write!(
                    slide_rels,
                    r#"<Relationship Id="{rel_id}" Type="{REL_NS}/notesSlide" Target="../notesSlides/notesSlide{n}.xml"/>"#
                );
                add_part(&mut zip, &format!("ppt/notesSlides/notesSlide{}.xml", n), notes_part(notes).as_bytes())?;
            }

            add_part(&mut zip, &format!("ppt/slides/slide{}.xml", n), slide_part(&tree).as_bytes())?;
            add_part(&mut zip, &format!("ppt/slides/_rels/slide{}.xml.rels", n), rels_part(&slide_rels).as_bytes())?;
        }

        let content_types = format!(
            r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types"><Default Extension="rels" ContentType="application/vnd.openxmlformats-package.relationships+xml"/><Default Extension="xml" ContentType="application/xml"/><Default Extension="png" ContentType="image/png"/><Default Extension="jpeg" ContentType="image/jpeg"/><Override PartName="/ppt/presentation.xml" ContentType="application/vnd.openxmlformats-officedocument.presentationml.presentation.main+xml"/>{overrides}</Types>"#
        );
        let presentation = format!(
            r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<p:presentation {NS}><p:sldIdLst>{slide_list}</p:sldIdLst><p:sldSz cx="12192000" cy="6858000"/></p:presentation>"#
        );
        let package_rels = format!(
            r#"<Relationship Id="rId1" Type="{REL_NS}/officeDocument" Target="ppt/presentation.xml"/>"#
        );

        add_part(&mut zip, "[Content_Types].xml", content_types.as_bytes())?;
        add_part(&mut zip, "_rels/.rels", rels_part(&package_rels).as_bytes())?;
        add_part(&mut zip, "ppt/presentation.xml", presentation.as_bytes())?;
        add_part(&mut zip, "ppt/_rels/presentation.xml.rels", rels_part(&presentation_rels).as_bytes())?;

        let cursor = zip.finish().map_err(std::io::Error::other)?;
        Ok(cursor.into_inner())
    }
}

fn add_part(zip: &mut ZipWriter<Cursor<Vec<u8>>>, name: &str, bytes: &[u8]) -> std::io::Result<()> {
    zip.start_file(name, FileOptions::default())
        .map_err(std::io::Error::other)?;
    zip.write_all(bytes)
}

fn rels_part(relationships: &str) -> String {
    format!(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">{relationships}</Relationships>"#
    )
}

fn slide_part(tree: &str) -> String {
    format!(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<p:sld {NS}><p:cSld><p:spTree><p:nvGrpSpPr><p:cNvPr id="1" name=""/><p:cNvGrpSpPr/><p:nvPr/></p:nvGrpSpPr><p:grpSpPr/>{tree}</p:spTree></p:cSld></p:sld>"#
    )
}

fn notes_part(text: &str) -> String {
    let body = text_shape(3, "Notes", Some("type=\"body\" idx=\"1\""), &[(0, text.to_string())]);
    format!(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<p:notes {NS}><p:cSld><p:spTree><p:nvGrpSpPr><p:cNvPr id="1" name=""/><p:cNvGrpSpPr/><p:nvPr/></p:nvGrpSpPr><p:grpSpPr/><p:sp><p:nvSpPr><p:cNvPr id="2" name="Slide Image"/><p:cNvSpPr/><p:nvPr><p:ph type="sldImg"/></p:nvPr></p:nvSpPr><p:spPr/></p:sp>{body}</p:spTree></p:cSld></p:notes>"#
    )
}

fn paragraphs_xml(paragraphs: &[(u32, String)]) -> String {
    let mut xml = String::new();
    for (level, text) in paragraphs {
        xml.push_str("<a:p>");
        if *level > 0 {
            let _ = write!(xml, r#"<a:pPr lvl="{}"/>"#, level);
        }
        let _ = write!(xml, "<a:r><a:t>{}</a:t></a:r></a:p>", escape(text.as_str()));
    }
    xml
}

fn text_shape(id: u32, name: &str, placeholder: Option<&str>, paragraphs: &[(u32, String)]) -> String {
    let nv_pr = match placeholder {
        Some(attrs) => format!("<p:nvPr><p:ph {}/></p:nvPr>", attrs),
        None => "<p:nvPr/>".to_string(),
    };
    format!(
        r#"<p:sp><p:nvSpPr><p:cNvPr id="{id}" name="{name} {id}"/><p:cNvSpPr/>{nv_pr}</p:nvSpPr><p:spPr/><p:txBody><a:bodyPr/><a:lstStyle/>{}</p:txBody></p:sp>"#,
        paragraphs_xml(paragraphs)
    )
}

fn table_frame(id: u32, rows: &[Vec<String>]) -> String {
    let mut tbl = String::from("<a:tbl><a:tblPr/>");
    for row in rows {
        tbl.push_str(r#"<a:tr h="370840">"#);
        for cell in row {
            let _ = write!(
                tbl,
                "<a:tc><a:txBody><a:bodyPr/><a:lstStyle/>{}</a:txBody><a:tcPr/></a:tc>",
                paragraphs_xml(&[(0, cell.clone())])
            );
        }
        tbl.push_str("</a:tr>");
    }
    tbl.push_str("</a:tbl>");

    format!(
        r#"<p:graphicFrame><p:nvGraphicFramePr><p:cNvPr id="{id}" name="Table {id}"/><p:cNvGraphicFramePr/><p:nvPr/></p:nvGraphicFramePr><p:xfrm><a:off x="0" y="0"/><a:ext cx="6096000" cy="741680"/></p:xfrm><a:graphic><a:graphicData uri="http://schemas.openxmlformats.org/drawingml/2006/table">{tbl}</a:graphicData></a:graphic></p:graphicFrame>"#
    )
}

fn picture(id: u32, name: &str, rel_id: &str) -> String {
    format!(
        r#"<p:pic><p:nvPicPr><p:cNvPr id="{id}" name="{}"/><p:cNvPicPr/><p:nvPr/></p:nvPicPr><p:blipFill><a:blip r:embed="{rel_id}"/><a:stretch><a:fillRect/></a:stretch></p:blipFill><p:spPr><a:xfrm><a:off x="952500" y="952500"/><a:ext cx="2857500" cy="1905000"/></a:xfrm><a:prstGeom prst="rect"><a:avLst/></a:prstGeom></p:spPr></p:pic>"#,
        escape(name)
    )
}
