//! # pdf2docx
//!
//! Convert PDF documents into editable DOCX files.
//!
//! The pipeline reads the PDF object graph, interprets each page's content
//! stream into positioned text runs, rebuilds lines and paragraphs from
//! their geometry, and writes the result as an OOXML word-processing
//! package.
//!
//! ## Quick Start
//!
//! ```no_run
//! use pdf2docx::{convert_pdf_to_docx, ConversionOptions};
//!
//! fn main() -> pdf2docx::Result<()> {
//!     let pdf = std::fs::read("document.pdf")?;
//!     let docx = convert_pdf_to_docx(&pdf, &ConversionOptions::default())?;
//!     std::fs::write("document.docx", docx)?;
//!     Ok(())
//! }
//! ```
//!
//! ## Features
//!
//! - **Tolerant parsing**: damaged cross-reference tables are rebuilt by scanning
//! - **Fonts**: standard encodings, `/Differences`, ToUnicode CMaps, composite fonts
//! - **Layout**: baseline clustering, paragraph and alignment inference, two-column pages
//! - **Parallel processing**: pages run on a bounded Rayon pool
//! - **Deterministic output**: identical input gives byte-identical DOCX

pub mod convert;
pub mod detect;
pub mod diagnostics;
pub mod error;
pub mod interpret;
pub mod layout;
pub mod model;
pub mod parser;
pub mod render;

// Re-export commonly used types
pub use convert::{
    convert_file, convert_pdf_to_docx, convert_pdf_to_docx_with_diagnostics, convert_reader,
    convert_to_document, CancelToken, ConversionOptions, ConversionOutput, PdfConverter,
};
pub use detect::{detect_format_from_bytes, detect_format_from_path, is_pdf, PdfFormat};
pub use diagnostics::{Diagnostic, DiagnosticKind};
pub use error::{ConversionError, Error, ErrorPayload, ParseError, Result, SerializeError};
pub use interpret::TextRun;
pub use layout::LayoutConfig;
pub use model::{Alignment, Document, Metadata, PageSize, Paragraph, Run};
pub use render::{Compression, JsonFormat, RenderOptions, DOCX_MIME_TYPE};

#[cfg(feature = "async")]
pub use convert::convert_pdf_to_docx_async;

use std::path::Path;

/// Extract the intermediate document of a PDF file as JSON.
///
/// # Example
///
/// ```no_run
/// use pdf2docx::{to_json, JsonFormat};
///
/// let json = to_json("document.pdf", JsonFormat::Pretty).unwrap();
/// std::fs::write("document.json", json).unwrap();
/// ```
pub fn to_json<P: AsRef<Path>>(path: P, format: JsonFormat) -> Result<String> {
    let data = std::fs::read(path)?;
    let (doc, _) = convert_to_document(&data, &ConversionOptions::default())?;
    render::to_json(&doc, format)
}

/// Extract plain text, one paragraph per line.
///
/// # Example
///
/// ```no_run
/// use pdf2docx::extract_text;
///
/// let text = extract_text("document.pdf").unwrap();
/// println!("{}", text);
/// ```
pub fn extract_text<P: AsRef<Path>>(path: P) -> Result<String> {
    let data = std::fs::read(path)?;
    let (doc, _) = convert_to_document(&data, &ConversionOptions::default())?;
    Ok(doc.plain_text())
}

/// Builder for PDF to DOCX conversion.
///
/// # Example
///
/// ```no_run
/// use pdf2docx::Pdf2Docx;
///
/// let output = Pdf2Docx::new()
///     .sequential()
///     .strict()
///     .with_default_font("Arial")
///     .convert_file("document.pdf", "document.docx")?;
/// println!("{} paragraphs", output.paragraph_count);
/// # Ok::<(), pdf2docx::Error>(())
/// ```
#[derive(Debug, Clone, Default)]
pub struct Pdf2Docx {
    options: ConversionOptions,
}

impl Pdf2Docx {
    /// Create a new builder with default options.
    pub fn new() -> Self {
        Self::default()
    }

    /// Fail on the first page that cannot be interpreted.
    pub fn strict(mut self) -> Self {
        self.options.skip_unparsable_pages = false;
        self
    }

    /// Disable parallel processing.
    pub fn sequential(mut self) -> Self {
        self.options.parallel = false;
        self
    }

    /// Bound the number of page workers.
    pub fn with_workers(mut self, workers: usize) -> Self {
        self.options = self.options.with_max_workers(workers);
        self
    }

    /// Set the input size cap.
    pub fn with_max_input_bytes(mut self, bytes: usize) -> Self {
        self.options.max_input_bytes = bytes;
        self
    }

    /// Set layout thresholds.
    pub fn with_layout(mut self, layout: LayoutConfig) -> Self {
        self.options.layout = layout;
        self
    }

    /// Set the default font of the output document.
    pub fn with_default_font(mut self, font: impl Into<String>) -> Self {
        self.options.render = self.options.render.with_default_font(font);
        self
    }

    /// Attach a cancellation token.
    pub fn with_cancel_token(mut self, token: CancelToken) -> Self {
        self.options.cancel = Some(token);
        self
    }

    /// The options built so far.
    pub fn options(&self) -> &ConversionOptions {
        &self.options
    }

    /// Convert PDF bytes.
    pub fn convert(&self, data: &[u8]) -> Result<ConversionOutput> {
        convert_pdf_to_docx_with_diagnostics(data, &self.options)
    }

    /// Convert a PDF file into a DOCX file.
    pub fn convert_file<P: AsRef<Path>, Q: AsRef<Path>>(&self, input: P, output: Q) -> Result<ConversionOutput> {
        convert_file(input, output, &self.options)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_options() {
        let builder = Pdf2Docx::new()
            .strict()
            .sequential()
            .with_workers(3)
            .with_max_input_bytes(1024)
            .with_default_font("Arial");
        let options = builder.options();
        assert!(!options.skip_unparsable_pages);
        assert!(!options.parallel);
        assert_eq!(options.max_workers, Some(3));
        assert_eq!(options.max_input_bytes, 1024);
        assert_eq!(options.render.default_font, "Arial");
    }

    #[test]
    fn test_builder_rejects_non_pdf() {
        let err = Pdf2Docx::new().convert(b"not a pdf").unwrap_err();
        assert!(matches!(err, Error::Parse(ParseError::MalformedHeader)));
    }
}
