//! Error types for pdf2docx.

use std::io;

use serde::Serialize;
use thiserror::Error;

use crate::parser::ObjRef;

/// Result type alias for conversion operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Alias matching the name used by transport layers.
pub type ConversionError = Error;

/// Failures while reading the PDF object graph.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ParseError {
    /// The input does not start with a `%PDF-x.y` header.
    #[error("Malformed header: not a PDF file")]
    MalformedHeader,

    /// The cross-reference structure is unusable and could not be rebuilt.
    #[error("Invalid cross-reference table: {0}")]
    InvalidXref(String),

    /// The cross-reference table was rebuilt by scanning the file.
    ///
    /// Only ever reported as a diagnostic; loading succeeds.
    #[error("Cross-reference table rebuilt: {0}")]
    RecoveredXref(String),

    /// Reference resolution exceeded the depth bound.
    #[error("Circular reference detected at object {0}")]
    CircularReference(ObjRef),

    /// A stream declares a filter this crate cannot decode.
    #[error("Unsupported filter: {0}")]
    UnsupportedFilter(String),

    /// The document is encrypted and the empty user password does not open it.
    #[error("Document is encrypted")]
    EncryptedDocument,

    /// An indirect object is referenced but cannot be found.
    #[error("Missing object {0}")]
    MissingObject(ObjRef),

    /// The lexer found something other than what the grammar requires.
    #[error("Unexpected token at offset {offset}: expected {expected}")]
    UnexpectedToken {
        /// Byte offset into the buffer being parsed
        offset: usize,
        /// Human-readable description of the expected token
        expected: &'static str,
    },

    /// Input ended in the middle of an object.
    #[error("Unexpected end of input")]
    UnexpectedEof,

    /// A filter failed to decode its input.
    #[error("Corrupt {filter} stream: {reason}")]
    CorruptStream {
        /// Filter name
        filter: String,
        /// Decoder message
        reason: String,
    },

    /// The page tree is missing or structurally broken.
    #[error("Invalid page tree: {0}")]
    InvalidPageTree(String),
}

/// Failures while building the OOXML package.
#[derive(Error, Debug)]
pub enum SerializeError {
    /// No paragraphs were produced. Recovered by emitting a single empty paragraph.
    #[error("Document contains no paragraphs")]
    EmptyDocument,

    /// Package parts are missing or inconsistent.
    #[error("Invalid package: {0}")]
    InvalidPackage(String),

    /// The zip writer failed.
    #[error("Zip error: {0}")]
    Zip(#[from] zip::result::ZipError),

    /// Writing into the in-memory buffer failed.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

/// Error types that can occur during conversion.
#[derive(Error, Debug)]
pub enum Error {
    /// I/O error when reading or writing files.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// The PDF could not be parsed.
    #[error("PDF parsing error: {0}")]
    Parse(#[from] ParseError),

    /// The DOCX package could not be written.
    #[error("Serialization error: {0}")]
    Serialize(#[from] SerializeError),

    /// Input exceeds the configured size cap.
    #[error("Input is {size} bytes, limit is {limit} bytes")]
    InputTooLarge {
        /// Actual input size
        size: usize,
        /// Configured cap
        limit: usize,
    },

    /// A page failed and skipping was disabled.
    #[error("Page {page} could not be converted: {source}")]
    PageFailed {
        /// 1-based page number
        page: usize,
        /// Underlying failure
        #[source]
        source: ParseError,
    },

    /// The caller cancelled the conversion.
    #[error("Conversion cancelled")]
    Cancelled,

    /// The intermediate document could not be written as JSON.
    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    /// The async worker task failed to complete.
    #[error("Worker task failed: {0}")]
    Task(String),
}

/// Structured error payload handed to transport layers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ErrorPayload {
    /// Stable machine-readable kind
    pub kind: &'static str,
    /// Human-readable message
    pub message: String,
}

impl ParseError {
    /// Stable machine-readable name of this error.
    pub fn kind(&self) -> &'static str {
        match self {
            ParseError::MalformedHeader => "MalformedHeader",
            ParseError::InvalidXref(_) => "InvalidXref",
            ParseError::RecoveredXref(_) => "RecoveredXref",
            ParseError::CircularReference(_) => "CircularReference",
            ParseError::UnsupportedFilter(_) => "UnsupportedFilter",
            ParseError::EncryptedDocument => "EncryptedDocument",
            ParseError::MissingObject(_) => "MissingObject",
            ParseError::UnexpectedToken { .. } => "UnexpectedToken",
            ParseError::UnexpectedEof => "UnexpectedEof",
            ParseError::CorruptStream { .. } => "CorruptStream",
            ParseError::InvalidPageTree(_) => "InvalidPageTree",
        }
    }
}

impl Error {
    /// Stable machine-readable name of this error.
    pub fn kind(&self) -> &'static str {
        match self {
            Error::Io(_) => "Io",
            Error::Parse(e) => e.kind(),
            Error::Serialize(SerializeError::EmptyDocument) => "EmptyDocument",
            Error::Serialize(SerializeError::InvalidPackage(_)) => "InvalidPackage",
            Error::Serialize(_) => "SerializeFailed",
            Error::InputTooLarge { .. } => "InputTooLarge",
            Error::PageFailed { source, .. } => source.kind(),
            Error::Cancelled => "Cancelled",
            Error::Json(_) => "Json",
            Error::Task(_) => "TaskFailed",
        }
    }

    /// Convert into the `{ kind, message }` payload exposed to callers.
    pub fn to_payload(&self) -> ErrorPayload {
        ErrorPayload {
            kind: self.kind(),
            message: self.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = Error::Parse(ParseError::EncryptedDocument);
        assert_eq!(err.to_string(), "PDF parsing error: Document is encrypted");

        let err = Error::InputTooLarge { size: 30, limit: 20 };
        assert_eq!(err.to_string(), "Input is 30 bytes, limit is 20 bytes");
    }

    #[test]
    fn test_unsupported_filter_names_filter() {
        let err = ParseError::UnsupportedFilter("JBIG2Decode".to_string());
        assert!(err.to_string().contains("JBIG2Decode"));
        assert_eq!(err.kind(), "UnsupportedFilter");
    }

    #[test]
    fn test_page_failure_reports_inner_kind() {
        let err = Error::PageFailed {
            page: 3,
            source: ParseError::UnsupportedFilter("DCTDecode".to_string()),
        };
        let payload = err.to_payload();
        assert_eq!(payload.kind, "UnsupportedFilter");
        assert!(payload.message.contains("Page 3"));
    }

    #[test]
    fn test_payload_serializes() {
        let payload = Error::Cancelled.to_payload();
        let json = serde_json::to_string(&payload).unwrap();
        assert_eq!(json, r#"{"kind":"Cancelled","message":"Conversion cancelled"}"#);
    }

    #[test]
    fn test_io_error_conversion() {
        let io_err = io::Error::new(io::ErrorKind::NotFound, "file not found");
        let err: Error = io_err.into();
        assert!(matches!(err, Error::Io(_)));
    }
}
