//! Document codecs: extraction of translatable paragraphs from `.docx` or
//! plain text input, and assembly of translated paragraphs into `.docx`.

pub mod assemble;
pub mod extract;

use thiserror::Error;

pub use assemble::{assemble, AssembleOptions, EmptyParagraphPolicy};
pub use extract::{extract, ExtractedDocument};

/// MIME type of every assembled output document.
pub const DOCX_MIME: &str =
    "application/vnd.openxmlformats-officedocument.wordprocessingml.document";

pub const DEFAULT_OUTPUT_NAME: &str = "translated_output.docx";

const ZIP_MAGIC: &[u8] = b"PK\x03\x04";

#[derive(Debug, Error)]
pub enum DocumentError {
    #[error("unsupported document format: {0}")]
    UnsupportedFormat(String),
    #[error("failed to read docx: {0}")]
    DocxRead(String),
    #[error("failed to write docx: {0}")]
    DocxWrite(String),
    #[error("text input is not valid UTF-8: {0}")]
    Encoding(#[from] std::str::Utf8Error),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentFormat {
    Docx,
    PlainText,
}

impl DocumentFormat {
    /// Decide the input format from the file extension, falling back to
    /// content sniffing (ZIP magic for docx, valid UTF-8 for text).
    pub fn detect(file_name: &str, bytes: &[u8]) -> Result<Self, DocumentError> {
        let ext = std::path::Path::new(file_name)
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase());

        match ext.as_deref() {
            Some("docx") => return Ok(DocumentFormat::Docx),
            Some("txt") | Some("text") | Some("md") => return Ok(DocumentFormat::PlainText),
            Some("doc") | Some("pdf") | Some("odt") | Some("rtf") => {
                return Err(DocumentError::UnsupportedFormat(file_name.to_string()))
            }
            _ => {}
        }

        if bytes.starts_with(ZIP_MAGIC) {
            Ok(DocumentFormat::Docx)
        } else if std::str::from_utf8(bytes).is_ok() {
            Ok(DocumentFormat::PlainText)
        } else {
            Err(DocumentError::UnsupportedFormat(file_name.to_string()))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detects_by_extension() {
        assert_eq!(DocumentFormat::detect("a.DOCX", b"").unwrap(), DocumentFormat::Docx);
        assert_eq!(DocumentFormat::detect("notes.txt", b"").unwrap(), DocumentFormat::PlainText);
    }

    #[test]
    fn sniffs_content_without_extension() {
        assert_eq!(
            DocumentFormat::detect("upload", b"PK\x03\x04rest").unwrap(),
            DocumentFormat::Docx
        );
        assert_eq!(DocumentFormat::detect("upload", b"hello").unwrap(), DocumentFormat::PlainText);
    }

    #[test]
    fn rejects_legacy_and_binary_input() {
        assert!(matches!(
            DocumentFormat::detect("old.doc", b""),
            Err(DocumentError::UnsupportedFormat(_))
        ));
        assert!(matches!(
            DocumentFormat::detect("blob", &[0xff, 0xfe, 0x00, 0xc3]),
            Err(DocumentError::UnsupportedFormat(_))
        ));
    }
}
