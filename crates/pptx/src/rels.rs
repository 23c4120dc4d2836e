//! Package relationships and slide ordering.

use crate::shapes::{attr, local_name, prefixed_attr};
use deck_core::{Error, Result};
use quick_xml::events::Event;
use quick_xml::Reader;

/// One `Relationship` entry of a `.rels` part.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Relationship {
    pub id: String,
    pub rel_type: String,
    pub target: String,
    pub external: bool,
}

impl Relationship {
    /// Whether the relationship type ends with `/<kind>` (e.g. `slide`, `image`).
    pub fn is(&self, kind: &str) -> bool {
        self.rel_type
            .rsplit('/')
            .next()
            .map(|last| last == kind)
            .unwrap_or(false)
    }
}

/// A `p:sldId` entry of presentation.xml.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct SlideEntry {
    pub id: u32,
    pub rel_id: String,
}

/// Parse a `.rels` part.
pub(crate) fn parse_relationships(xml_content: &str) -> Result<Vec<Relationship>> {
    let mut reader = Reader::from_str(xml_content);
    reader.trim_text(true);
    let mut relationships = Vec::new();

    loop {
        match reader.read_event() {
            Ok(Event::Empty(ref e)) | Ok(Event::Start(ref e))
                if local_name(e.name().as_ref()) == b"Relationship" =>
            {
                let mut rel = Relationship {
                    id: String::new(),
                    rel_type: String::new(),
                    target: String::new(),
                    external: false,
                };

                for attr in e.attributes().flatten() {
                    let value = String::from_utf8_lossy(&attr.value).to_string();
                    match attr.key.as_ref() {
                        b"Id" => rel.id = value,
                        b"Type" => rel.rel_type = value,
                        b"Target" => rel.target = value,
                        b"TargetMode" => rel.external = value == "External",
                        _ => {}
                    }
                }

                relationships.push(rel);
            }
            Ok(Event::Eof) => break,
            Err(e) => {
                return Err(Error::XmlError(format!("Error parsing relationships: {}", e)));
            }
            _ => {}
        }
    }

    Ok(relationships)
}

/// Read the ordered slide list (`p:sldIdLst`) from presentation.xml.
pub(crate) fn parse_slide_list(xml_content: &str) -> Result<Vec<SlideEntry>> {
    let mut reader = Reader::from_str(xml_content);
    reader.trim_text(true);
    let mut entries = Vec::new();

    loop {
        match reader.read_event() {
            Ok(Event::Empty(ref e)) | Ok(Event::Start(ref e))
                if local_name(e.name().as_ref()) == b"sldId" =>
            {
                let id = attr(e, b"id").and_then(|v| v.parse().ok());
                let rel_id = prefixed_attr(e, b"id");
                match (id, rel_id) {
                    (Some(id), Some(rel_id)) => entries.push(SlideEntry { id, rel_id }),
                    _ => log::warn!("Skipping sldId entry without id or r:id"),
                }
            }
            Ok(Event::Eof) => break,
            Err(e) => {
                return Err(Error::XmlError(format!("Error parsing presentation.xml: {}", e)));
            }
            _ => {}
        }
    }

    Ok(entries)
}

/// The `.rels` part holding relationships of `part`.
///
/// `ppt/slides/slide1.xml` maps to `ppt/slides/_rels/slide1.xml.rels`.
pub(crate) fn rels_path_for(part: &str) -> String {
    match part.rsplit_once('/') {
        Some((dir, file)) => format!("{}/_rels/{}.rels", dir, file),
        None => format!("_rels/{}.rels", part),
    }
}

/// Resolve a relationship target against the part that declares it.
pub(crate) fn resolve_part(base_part: &str, target: &str) -> String {
    if let Some(absolute) = target.strip_prefix('/') {
        return absolute.to_string();
    }

    let mut segments: Vec<&str> = match base_part.rsplit_once('/') {
        Some((dir, _)) => dir.split('/').collect(),
        None => Vec::new(),
    };

    for segment in target.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                segments.pop();
            }
            other => segments.push(other),
        }
    }

    segments.join("/")
}

/// Extract a slide number from a string like "rId2" or "slide3.xml".
pub(crate) fn extract_slide_number(s: &str) -> Option<usize> {
    let s = s.trim_end_matches(".xml").trim_end_matches(".rels");

    let digits: String = s.chars().rev().take_while(|c| c.is_ascii_digit()).collect();
    if digits.is_empty() {
        return None;
    }
    let digits: String = digits.chars().rev().collect();
    digits.parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_relationships() {
        let xml = r#"<?xml version="1.0" encoding="UTF-8"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">
  <Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/slideLayout" Target="../slideLayouts/slideLayout1.xml"/>
  <Relationship Id="rId2" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/image" Target="../media/image1.png"/>
  <Relationship Id="rId3" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/image" Target="https://example.com/a.png" TargetMode="External"/>
</Relationships>"#;
        let rels = parse_relationships(xml).unwrap();
        assert_eq!(rels.len(), 3);
        assert!(rels[0].is("slideLayout"));
        assert!(!rels[0].is("slide"));
        assert!(rels[1].is("image"));
        assert_eq!(rels[1].target, "../media/image1.png");
        assert!(rels[2].external);
    }

    #[test]
    fn test_parse_slide_list_keeps_document_order() {
        let xml = r#"<p:presentation xmlns:p="p" xmlns:r="r"><p:sldIdLst>
            <p:sldId id="260" r:id="rId7"/>
            <p:sldId id="256" r:id="rId2"/>
        </p:sldIdLst></p:presentation>"#;
        let entries = parse_slide_list(xml).unwrap();
        assert_eq!(
            entries,
            vec![
                SlideEntry { id: 260, rel_id: "rId7".into() },
                SlideEntry { id: 256, rel_id: "rId2".into() },
            ]
        );
    }

    #[test]
    fn test_rels_path_for() {
        assert_eq!(rels_path_for("ppt/slides/slide1.xml"), "ppt/slides/_rels/slide1.xml.rels");
        assert_eq!(rels_path_for("ppt/presentation.xml"), "ppt/_rels/presentation.xml.rels");
    }

    #[test]
    fn test_resolve_part() {
        assert_eq!(resolve_part("ppt/presentation.xml", "slides/slide1.xml"), "ppt/slides/slide1.xml");
        assert_eq!(resolve_part("ppt/slides/slide1.xml", "../media/image1.png"), "ppt/media/image1.png");
        assert_eq!(resolve_part("ppt/slides/slide1.xml", "/ppt/media/image2.jpeg"), "ppt/media/image2.jpeg");
    }

    #[test]
    fn test_extract_slide_number() {
        assert_eq!(extract_slide_number("rId1"), Some(1));
        assert_eq!(extract_slide_number("rId12"), Some(12));
        assert_eq!(extract_slide_number("slide1.xml"), Some(1));
        assert_eq!(extract_slide_number("slide123.xml"), Some(123));
        assert_eq!(extract_slide_number("nodigits"), None);
    }
}
