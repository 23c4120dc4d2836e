//! Prompt construction.

use deck_core::SlideRecord;
use std::fmt::Write as _;

/// System message sent to chat-style backends.
pub const SYSTEM_PROMPT: &str =
    "You are a presentation analyst who turns slide content into structured, well-organized knowledge.";

const FORMAT_REQUEST: &str = r#"
Return the result in the following JSON format:
{
  "content": "the complete content, reorganized to be clearer while keeping its meaning",
  "summary": "a summary of at most 100 words",
  "key_points": ["key point 1", "key point 2", ...],
  "tags": ["tag 1", "tag 2", ...]
}

Requirements:
1. The content must be accurate and complete
2. The summary must be short and clear
3. The key points must highlight the core information
4. The tags must reflect the topic and domain
5. Keep all of the original information
"#;

/// Build the restructuring prompt for one slide.
///
/// The output depends only on the slide, so equal slides give equal prompts.
pub fn build_prompt(slide: &SlideRecord) -> String {
    let mut prompt = format!(
        "Analyze the following presentation slide and produce structured knowledge points.\n\n\
         Slide title: {}\n\n\
         Slide text:\n{}\n\n\
         Bullet points:\n",
        slide.title, slide.body_text
    );

    for (i, point) in slide.bullets.iter().enumerate() {
        let _ = writeln!(prompt, "{}. {}", i + 1, point);
    }

    if !slide.tables.is_empty() {
        prompt.push_str("\nTables:\n");
        for table in &slide.tables {
            let _ = writeln!(prompt, "Table ({}x{}):", table.rows, table.cols);
            for row in &table.data {
                prompt.push_str(&row.join(" | "));
                prompt.push('\n');
            }
        }
    }

    if !slide.notes.is_empty() {
        let _ = write!(prompt, "\nSpeaker notes:\n{}", slide.notes);
    }

    prompt.push_str(FORMAT_REQUEST);
    prompt
}

#[cfg(test)]
mod tests {
    use super::*;
    use deck_core::TableGrid;

    fn slide() -> SlideRecord {
        let mut slide = SlideRecord::new(1, 256);
        slide.title = "Intro".into();
        slide.body_text = "Welcome".into();
        slide.bullets = vec!["Point A".into(), "Point B".into()];
        slide
    }

    #[test]
    fn test_prompt_sections() {
        let prompt = build_prompt(&slide());
        assert!(prompt.contains("Slide title: Intro"));
        assert!(prompt.contains("Slide text:\nWelcome"));
        assert!(prompt.contains("1. Point A\n2. Point B\n"));
        for key in ["\"content\"", "\"summary\"", "\"key_points\"", "\"tags\""] {
            assert!(prompt.contains(key), "missing {}", key);
        }
        assert!(!prompt.contains("Tables:"));
        assert!(!prompt.contains("Speaker notes:"));
    }

    #[test]
    fn test_prompt_tables_and_notes() {
        let mut slide = slide();
        slide.tables.push(TableGrid::from_rows(vec![
            vec!["a".into(), "b".into(), "c".into()],
            vec!["d".into(), "e".into(), "f".into()],
        ]));
        slide.notes = "Mention the trend".into();

        let prompt = build_prompt(&slide);
        assert!(prompt.contains("Table (2x3):\na | b | c\nd | e | f\n"));
        assert!(prompt.contains("Speaker notes:\nMention the trend"));
    }

    #[test]
    fn test_prompt_is_deterministic() {
        assert_eq!(build_prompt(&slide()), build_prompt(&slide()));
    }
}
