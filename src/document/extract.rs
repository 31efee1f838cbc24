//! Paragraph extraction.
//! Produces the ordered, non-empty paragraph list a batch is built from.

use tracing::{info, warn};

use super::{DocumentError, DocumentFormat};

#[derive(Debug, Clone, PartialEq)]
pub struct ExtractedDocument {
    pub format: DocumentFormat,
    pub paragraphs: Vec<String>,
    /// Tables found in the body. Their contents are not translated.
    pub tables_skipped: usize,
    /// Other body blocks with text (content controls, tables of contents)
    /// that are not extracted.
    pub blocks_skipped: usize,
}

/// Extract paragraphs from an uploaded file held in memory.
pub fn extract(file_name: &str, bytes: &[u8]) -> Result<ExtractedDocument, DocumentError> {
    let format = DocumentFormat::detect(file_name, bytes)?;
    let doc = match format {
        DocumentFormat::Docx => extract_docx(bytes)?,
        DocumentFormat::PlainText => extract_plain_text(bytes)?,
    };
    info!(
        file = file_name,
        format = ?doc.format,
        paragraphs = doc.paragraphs.len(),
        tables_skipped = doc.tables_skipped,
        blocks_skipped = doc.blocks_skipped,
        "document_extracted"
    );
    Ok(doc)
}

pub fn extract_docx(bytes: &[u8]) -> Result<ExtractedDocument, DocumentError> {
    let docx = docx_rs::read_docx(bytes).map_err(|e| DocumentError::DocxRead(e.to_string()))?;
    Ok(collect_body(&docx.document))
}

fn collect_body(document: &docx_rs::Document) -> ExtractedDocument {
    let mut paragraphs = Vec::new();
    let mut tables_skipped = 0;
    let mut blocks_skipped = 0;

    for child in &document.children {
        match child {
            docx_rs::DocumentChild::Paragraph(para) => {
                let line = paragraph_text(para);
                if !line.trim().is_empty() {
                    paragraphs.push(line);
                }
            }
            docx_rs::DocumentChild::Table(_) => {
                tables_skipped += 1;
            }
            // Range markers carry no text.
            docx_rs::DocumentChild::BookmarkStart(_)
            | docx_rs::DocumentChild::BookmarkEnd(_)
            | docx_rs::DocumentChild::CommentStart(_)
            | docx_rs::DocumentChild::CommentEnd(_) => {}
            _ => {
                blocks_skipped += 1;
            }
        }
    }

    if tables_skipped > 0 {
        warn!(tables = tables_skipped, "docx tables are not translated");
    }
    if blocks_skipped > 0 {
        warn!(
            blocks = blocks_skipped,
            "docx content controls are not translated"
        );
    }

    ExtractedDocument {
        format: DocumentFormat::Docx,
        paragraphs,
        tables_skipped,
        blocks_skipped,
    }
}

/// One unit per non-blank line. A UTF-8 BOM is ignored.
pub fn extract_plain_text(bytes: &[u8]) -> Result<ExtractedDocument, DocumentError> {
    let bytes = bytes.strip_prefix(b"\xEF\xBB\xBF").unwrap_or(bytes);
    let text = std::str::from_utf8(bytes)?;
    let paragraphs = text
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .map(str::to_string)
        .collect();

    Ok(ExtractedDocument {
        format: DocumentFormat::PlainText,
        paragraphs,
        tables_skipped: 0,
        blocks_skipped: 0,
    })
}

fn paragraph_text(para: &docx_rs::Paragraph) -> String {
    let mut line = String::new();
    for child in &para.children {
        match child {
            docx_rs::ParagraphChild::Run(run) => run_text(run, &mut line),
            docx_rs::ParagraphChild::Hyperlink(hyperlink) => {
                for inner in &hyperlink.children {
                    if let docx_rs::ParagraphChild::Run(r) = inner {
                        run_text(r, &mut line);
                    }
                }
            }
            docx_rs::ParagraphChild::Insert(ins) => {
                for ic in &ins.children {
                    if let docx_rs::InsertChild::Run(r) = ic {
                        run_text(r, &mut line);
                    }
                }
            }
            // Deleted runs are tracked-change removals, not document text.
            _ => {}
        }
    }
    line
}

fn run_text(run: &docx_rs::Run, out: &mut String) {
    for rc in &run.children {
        match rc {
            docx_rs::RunChild::Text(t) => out.push_str(&t.text),
            docx_rs::RunChild::Tab(_) => out.push('\t'),
            docx_rs::RunChild::Break(_) => out.push(' '),
            _ => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use docx_rs::{Docx, Paragraph, Run, Table, TableCell, TableRow};
    use std::io::Cursor;

    fn pack(docx: Docx) -> Vec<u8> {
        let mut cursor = Cursor::new(Vec::new());
        docx.build().pack(&mut cursor).unwrap();
        cursor.into_inner()
    }

    #[test]
    fn plain_text_drops_blank_lines_and_bom() {
        let doc = extract_plain_text(b"\xEF\xBB\xBFfirst line\r\n\r\n  second  \n\n").unwrap();
        assert_eq!(doc.paragraphs, vec!["first line", "second"]);
        assert_eq!(doc.format, DocumentFormat::PlainText);
    }

    #[test]
    fn plain_text_rejects_invalid_utf8() {
        assert!(matches!(
            extract_plain_text(&[0x66, 0xff, 0x66]),
            Err(DocumentError::Encoding(_))
        ));
    }

    #[test]
    fn docx_paragraphs_in_order_and_tables_flagged() {
        let bytes = pack(
            Docx::new()
                .add_paragraph(Paragraph::new().add_run(Run::new().add_text("Intro")))
                .add_paragraph(Paragraph::new())
                .add_table(Table::new(vec![TableRow::new(vec![TableCell::new()
                    .add_paragraph(Paragraph::new().add_run(Run::new().add_text("cell")))])]))
                .add_paragraph(
                    Paragraph::new()
                        .add_run(Run::new().add_text("Two"))
                        .add_run(Run::new().add_text("-runs")),
                ),
        );

        let doc = extract("report.docx", &bytes).unwrap();
        assert_eq!(doc.paragraphs, vec!["Intro", "Two-runs"]);
        assert_eq!(doc.tables_skipped, 1);
    }

    #[test]
    fn content_controls_are_counted_not_dropped_silently() {
        let document = docx_rs::Document::new()
            .add_paragraph(Paragraph::new().add_run(Run::new().add_text("Body")))
            .add_structured_data_tag(
                docx_rs::StructuredDataTag::new().add_run(Run::new().add_text("Control")),
            );

        let doc = collect_body(&document);
        assert_eq!(doc.paragraphs, vec!["Body"]);
        assert_eq!(doc.blocks_skipped, 1);
        assert_eq!(doc.tables_skipped, 0);
    }

    #[test]
    fn garbage_docx_is_a_read_error() {
        assert!(matches!(
            extract("broken.docx", b"not a zip"),
            Err(DocumentError::DocxRead(_))
        ));
    }
}
