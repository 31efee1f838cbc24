//! Serializes translated paragraphs into a `.docx` buffer.

use std::io::Cursor;

use docx_rs::{Docx, Paragraph, Run};
use tracing::debug;

use super::DocumentError;

/// What to do with empty strings in the assembled sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EmptyParagraphPolicy {
    /// Keep them as empty paragraphs (structural fidelity).
    Preserve,
    /// Drop them.
    Skip,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssembleOptions {
    pub empty_paragraphs: EmptyParagraphPolicy,
    /// Optional heading paragraph placed before the content.
    pub title: Option<String>,
}

impl AssembleOptions {
    pub fn new(empty_paragraphs: EmptyParagraphPolicy) -> Self {
        Self {
            empty_paragraphs,
            title: None,
        }
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }
}

/// Build a `.docx` containing one paragraph per input string, in order.
pub fn assemble<S: AsRef<str>>(
    paragraphs: &[S],
    options: &AssembleOptions,
) -> Result<Vec<u8>, DocumentError> {
    let mut docx = Docx::new();

    if let Some(title) = options.title.as_deref().filter(|t| !t.trim().is_empty()) {
        docx = docx.add_paragraph(
            Paragraph::new()
                .style("Title")
                .add_run(Run::new().add_text(title)),
        );
    }

    let mut written = 0usize;
    for text in paragraphs {
        let text = text.as_ref();
        if text.trim().is_empty() {
            if options.empty_paragraphs == EmptyParagraphPolicy::Preserve {
                docx = docx.add_paragraph(Paragraph::new());
                written += 1;
            }
            continue;
        }
        docx = docx.add_paragraph(Paragraph::new().add_run(Run::new().add_text(text)));
        written += 1;
    }

    let mut cursor = Cursor::new(Vec::new());
    docx.build()
        .pack(&mut cursor)
        .map_err(|e| DocumentError::DocxWrite(e.to_string()))?;

    let bytes = cursor.into_inner();
    debug!(paragraphs = written, bytes = bytes.len(), "docx_assembled");
    Ok(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn body_paragraph_count(bytes: &[u8]) -> usize {
        let docx = docx_rs::read_docx(bytes).unwrap();
        docx.document
            .children
            .iter()
            .filter(|c| matches!(c, docx_rs::DocumentChild::Paragraph(_)))
            .count()
    }

    #[test]
    fn preserve_keeps_empty_paragraphs() {
        let input = ["Uno", "", "Dos"];
        let bytes = assemble(&input, &AssembleOptions::new(EmptyParagraphPolicy::Preserve)).unwrap();
        assert_eq!(body_paragraph_count(&bytes), 3);
    }

    #[test]
    fn skip_drops_empty_paragraphs() {
        let input = ["Uno", "  ", "Dos"];
        let bytes = assemble(&input, &AssembleOptions::new(EmptyParagraphPolicy::Skip)).unwrap();
        assert_eq!(body_paragraph_count(&bytes), 2);
    }

    #[test]
    fn output_is_a_zip_container() {
        let bytes = assemble(&["x"], &AssembleOptions::new(EmptyParagraphPolicy::Skip)).unwrap();
        assert!(bytes.starts_with(b"PK"));
    }

    #[test]
    fn title_comes_first() {
        let options =
            AssembleOptions::new(EmptyParagraphPolicy::Skip).with_title("Translated Output");
        let bytes = assemble(&["Hola"], &options).unwrap();
        let doc = crate::document::extract::extract_docx(&bytes).unwrap();
        assert_eq!(doc.paragraphs, vec!["Translated Output", "Hola"]);
    }
}
