//! PDF header detection.

use crate::error::{ParseError, Result};
use crate::parser::lexer::find_bytes;
use std::fs::File;
use std::io::Read;
use std::path::Path;

/// PDF format information.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PdfFormat {
    /// PDF version from the header (e.g., "1.7", "2.0")
    pub version: String,
    /// Offset of `%PDF-`; non-zero when the file has leading junk
    pub header_offset: usize,
    /// Whether the file declares itself linearized (fast web view)
    pub linearized: bool,
}

impl std::fmt::Display for PdfFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "PDF {}", self.version)
    }
}

/// PDF magic bytes: %PDF-
const PDF_MAGIC: &[u8] = b"%PDF-";
const VERSION_LEN: usize = 3; // e.g., "1.7"

/// The header may be preceded by up to this many bytes of garbage.
const HEADER_SEARCH_WINDOW: usize = 1024;

/// Detect PDF format from a file path.
///
/// # Example
/// ```no_run
/// use pdf2docx::detect::detect_format_from_path;
///
/// let format = detect_format_from_path("document.pdf").unwrap();
/// println!("PDF version: {}", format.version);
/// ```
pub fn detect_format_from_path<P: AsRef<Path>>(path: P) -> Result<PdfFormat> {
    let mut head = Vec::with_capacity(HEADER_SEARCH_WINDOW * 2);
    File::open(path)?
        .take((HEADER_SEARCH_WINDOW * 2) as u64)
        .read_to_end(&mut head)?;
    detect_format_from_bytes(&head)
}

/// Detect PDF format from the first bytes of a file.
///
/// Returns [`ParseError::MalformedHeader`] if no `%PDF-x.y` header appears
/// within the first kilobyte.
pub fn detect_format_from_bytes(data: &[u8]) -> Result<PdfFormat> {
    let window = &data[..data.len().min(HEADER_SEARCH_WINDOW + PDF_MAGIC.len() + VERSION_LEN)];
    let header_offset = find_bytes(window, PDF_MAGIC, 0).ok_or(ParseError::MalformedHeader)?;

    let version_start = header_offset + PDF_MAGIC.len();
    let version_bytes = window
        .get(version_start..version_start + VERSION_LEN)
        .ok_or(ParseError::MalformedHeader)?;
    let version = String::from_utf8_lossy(version_bytes).to_string();

    if !is_valid_version(&version) {
        return Err(ParseError::MalformedHeader.into());
    }

    let window = &data[header_offset..data.len().min(header_offset + HEADER_SEARCH_WINDOW)];
    let linearized = find_bytes(window, b"/Linearized", 0).is_some();

    Ok(PdfFormat {
        version,
        header_offset,
        linearized,
    })
}

/// Check if a version string is valid.
fn is_valid_version(version: &str) -> bool {
    let bytes = version.as_bytes();
    bytes.len() == 3 && bytes[0].is_ascii_digit() && bytes[1] == b'.' && bytes[2].is_ascii_digit()
}

/// Check if a file is a valid PDF.
pub fn is_pdf<P: AsRef<Path>>(path: P) -> bool {
    detect_format_from_path(path).is_ok()
}

/// Check if bytes start like a PDF.
pub fn is_pdf_bytes(data: &[u8]) -> bool {
    detect_format_from_bytes(data).is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;

    #[test]
    fn test_detect_valid_pdf() {
        let data = b"%PDF-1.7\n%\xe2\xe3\xcf\xd3";
        let format = detect_format_from_bytes(data).unwrap();
        assert_eq!(format.version, "1.7");
        assert_eq!(format.header_offset, 0);
        assert!(!format.linearized);
    }

    #[test]
    fn test_detect_pdf_2_0() {
        let format = detect_format_from_bytes(b"%PDF-2.0\n").unwrap();
        assert_eq!(format.version, "2.0");
    }

    #[test]
    fn test_leading_junk_is_tolerated() {
        let mut data = vec![b'x'; 100];
        data.extend_from_slice(b"%PDF-1.4\n");
        let format = detect_format_from_bytes(&data).unwrap();
        assert_eq!(format.header_offset, 100);
    }

    #[test]
    fn test_header_beyond_window_is_rejected() {
        let mut data = vec![b'x'; 2000];
        data.extend_from_slice(b"%PDF-1.4\n");
        assert!(matches!(
            detect_format_from_bytes(&data),
            Err(Error::Parse(ParseError::MalformedHeader))
        ));
    }

    #[test]
    fn test_detect_invalid_format() {
        let result = detect_format_from_bytes(b"<!DOCTYPE html>");
        assert!(matches!(result, Err(Error::Parse(ParseError::MalformedHeader))));
    }

    #[test]
    fn test_detect_too_short() {
        assert!(!is_pdf_bytes(b"%PDF"));
        assert!(!is_pdf_bytes(b""));
    }

    #[test]
    fn test_linearized() {
        let format = detect_format_from_bytes(b"%PDF-1.6\n1 0 obj\n<< /Linearized 1 >>").unwrap();
        assert!(format.linearized);
    }

    #[test]
    fn test_version_validation() {
        assert!(is_valid_version("1.0"));
        assert!(is_valid_version("2.0"));
        assert!(!is_valid_version("10.0"));
        assert!(!is_valid_version("abc"));
    }
}
