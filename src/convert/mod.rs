//! PDF to DOCX conversion.
//!
//! The object store is loaded once, then every page is interpreted and laid
//! out as an independent unit of work on a bounded worker pool. Pages are
//! assembled in page order whatever order the workers finish in.
//!
//! # Example
//!
//! ```no_run
//! use pdf2docx::convert::{convert_pdf_to_docx, ConversionOptions};
//!
//! fn main() -> pdf2docx::Result<()> {
//!     let pdf = std::fs::read("document.pdf")?;
//!     let docx = convert_pdf_to_docx(&pdf, &ConversionOptions::default())?;
//!     std::fs::write("document.docx", docx)?;
//!     Ok(())
//! }
//! ```

mod options;
mod pdf;

pub use options::{CancelToken, ConversionOptions, DEFAULT_MAX_INPUT_BYTES};
pub use pdf::PdfConverter;

use std::io::Read;
use std::path::Path;

use serde::Serialize;

use crate::diagnostics::Diagnostic;
use crate::error::{Error, Result};
use crate::model::Document;

/// Result of a successful conversion.
#[derive(Debug, Clone, Serialize)]
pub struct ConversionOutput {
    /// The DOCX package
    #[serde(skip)]
    pub bytes: Vec<u8>,

    /// Problems recovered from along the way
    pub diagnostics: Vec<Diagnostic>,

    /// Pages in the source document
    pub page_count: usize,

    /// Paragraphs written
    pub paragraph_count: usize,
}

/// Convert PDF bytes to DOCX bytes.
pub fn convert_pdf_to_docx(input: &[u8], options: &ConversionOptions) -> Result<Vec<u8>> {
    Ok(convert_pdf_to_docx_with_diagnostics(input, options)?.bytes)
}

/// Convert PDF bytes to DOCX bytes, returning diagnostics alongside.
pub fn convert_pdf_to_docx_with_diagnostics(input: &[u8], options: &ConversionOptions) -> Result<ConversionOutput> {
    PdfConverter::new(options.clone()).convert(input)
}

/// Run the pipeline up to the intermediate document.
pub fn convert_to_document(input: &[u8], options: &ConversionOptions) -> Result<(Document, Vec<Diagnostic>)> {
    PdfConverter::new(options.clone()).to_document(input)
}

/// Convert a PDF file to a DOCX file.
pub fn convert_file(
    input: impl AsRef<Path>,
    output: impl AsRef<Path>,
    options: &ConversionOptions,
) -> Result<ConversionOutput> {
    let data = std::fs::read(input.as_ref())?;
    let result = convert_pdf_to_docx_with_diagnostics(&data, options)?;
    std::fs::write(output.as_ref(), &result.bytes)?;
    Ok(result)
}

/// Convert a PDF read from `reader`.
///
/// Reading stops one byte past the size cap so oversized input is rejected
/// without buffering all of it.
pub fn convert_reader<R: Read>(reader: R, options: &ConversionOptions) -> Result<ConversionOutput> {
    let limit = options.max_input_bytes;
    let mut data = Vec::new();
    reader.take(limit as u64 + 1).read_to_end(&mut data)?;
    if data.len() > limit {
        return Err(Error::InputTooLarge {
            size: data.len(),
            limit,
        });
    }
    convert_pdf_to_docx_with_diagnostics(&data, options)
}

/// Convert on the blocking thread pool of the current tokio runtime.
#[cfg(feature = "async")]
pub async fn convert_pdf_to_docx_async(input: Vec<u8>, options: ConversionOptions) -> Result<ConversionOutput> {
    tokio::task::spawn_blocking(move || PdfConverter::new(options).convert(&input))
        .await
        .map_err(|e| Error::Task(e.to_string()))?
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_input_too_large() {
        let options = ConversionOptions::new().with_max_input_bytes(8);
        let err = convert_pdf_to_docx(b"%PDF-1.4 too long", &options).unwrap_err();
        assert!(matches!(err, Error::InputTooLarge { size: 17, limit: 8 }));
        assert_eq!(err.kind(), "InputTooLarge");
    }

    #[test]
    fn test_reader_too_large() {
        let options = ConversionOptions::new().with_max_input_bytes(4);
        let err = convert_reader(&b"%PDF-1.4"[..], &options).unwrap_err();
        assert!(matches!(err, Error::InputTooLarge { size: 5, limit: 4 }));
    }

    #[test]
    fn test_not_a_pdf() {
        let err = convert_pdf_to_docx(b"hello world", &ConversionOptions::default()).unwrap_err();
        assert_eq!(err.kind(), "MalformedHeader");
    }

    #[test]
    fn test_cancelled_before_start() {
        let token = CancelToken::new();
        token.cancel();
        let options = ConversionOptions::new().with_cancel_token(token);
        let err = convert_pdf_to_docx(b"%PDF-1.4\n", &options).unwrap_err();
        assert!(matches!(err, Error::Cancelled));
    }

    #[cfg(feature = "async")]
    #[tokio::test]
    async fn test_async_reports_parse_errors() {
        let err = convert_pdf_to_docx_async(b"not a pdf".to_vec(), ConversionOptions::default())
            .await
            .unwrap_err();
        assert_eq!(err.kind(), "MalformedHeader");
    }
}
