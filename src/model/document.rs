//! Document-level types.

use chrono::{DateTime, FixedOffset, NaiveDate, TimeZone, Utc};
use serde::{Deserialize, Serialize};

use super::Paragraph;
use crate::interpret::font::decode_text_string;
use crate::parser::{Dict, ObjectStore, PdfValue};

/// The format-neutral document handed to renderers.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Document {
    /// Document metadata (title, author, etc.)
    pub metadata: Metadata,

    /// Size of the first page, when known
    pub page_size: Option<PageSize>,

    /// Paragraphs in reading order across all pages
    pub paragraphs: Vec<Paragraph>,
}

impl Document {
    /// Create a new empty document.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_metadata(mut self, metadata: Metadata) -> Self {
        self.metadata = metadata;
        self
    }

    pub fn with_page_size(mut self, size: PageSize) -> Self {
        self.page_size = Some(size);
        self
    }

    /// Append a paragraph.
    pub fn with_paragraph(mut self, paragraph: Paragraph) -> Self {
        self.paragraphs.push(paragraph);
        self
    }

    /// Number of paragraphs.
    pub fn paragraph_count(&self) -> usize {
        self.paragraphs.len()
    }

    /// Check if the document has any paragraphs.
    pub fn is_empty(&self) -> bool {
        self.paragraphs.is_empty()
    }

    /// Get plain text content of the entire document.
    pub fn plain_text(&self) -> String {
        self.paragraphs
            .iter()
            .map(Paragraph::plain_text)
            .collect::<Vec<_>>()
            .join("\n")
    }
}

/// Page dimensions in points.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PageSize {
    pub width: f64,
    pub height: f64,
}

impl PageSize {
    pub fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }

    /// US Letter.
    pub fn letter() -> Self {
        Self::new(612.0, 792.0)
    }

    pub fn is_landscape(&self) -> bool {
        self.width > self.height
    }
}

/// Document metadata.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Metadata {
    /// Document title
    pub title: Option<String>,

    /// Document author
    pub author: Option<String>,

    /// Document subject
    pub subject: Option<String>,

    /// Keywords
    pub keywords: Option<String>,

    /// Creator application
    pub creator: Option<String>,

    /// PDF producer
    pub producer: Option<String>,

    /// Creation date
    pub created: Option<DateTime<Utc>>,

    /// Last modification date
    pub modified: Option<DateTime<Utc>>,

    /// PDF version (e.g., "1.7")
    pub pdf_version: String,

    /// Total number of pages
    pub page_count: usize,
}

impl Metadata {
    /// Create new metadata with PDF version.
    pub fn with_version(version: impl Into<String>) -> Self {
        Self {
            pdf_version: version.into(),
            ..Default::default()
        }
    }

    /// Read the `/Info` dictionary of a loaded document.
    pub fn from_store(store: &ObjectStore, page_count: usize) -> Self {
        let mut metadata = Self::with_version(store.version());
        metadata.page_count = page_count;

        let Some(info) = store.info() else {
            return metadata;
        };
        let text = |key: &str| info_string(store, &info, key);

        metadata.title = text("Title");
        metadata.author = text("Author");
        metadata.subject = text("Subject");
        metadata.keywords = text("Keywords");
        metadata.creator = text("Creator");
        metadata.producer = text("Producer");
        metadata.created = text("CreationDate").as_deref().and_then(parse_pdf_date);
        metadata.modified = text("ModDate").as_deref().and_then(parse_pdf_date);
        metadata
    }
}

fn info_string(store: &ObjectStore, info: &Dict, key: &str) -> Option<String> {
    let value = store.get(info, key)?;
    let text = match &value {
        PdfValue::String(bytes) => decode_text_string(bytes),
        PdfValue::Name(name) => name.clone(),
        _ => return None,
    };
    let text = text.trim_matches(|c: char| c.is_whitespace() || c == '\0');
    (!text.is_empty()).then(|| text.to_string())
}

/// Parse a PDF date string (`D:YYYYMMDDHHmmSSOHH'mm'`).
///
/// Every field after the year is optional. The offset, when present, is
/// applied so the result is in UTC.
pub fn parse_pdf_date(s: &str) -> Option<DateTime<Utc>> {
    let s = s.trim();
    let s = s.strip_prefix("D:").unwrap_or(s);

    // At minimum we need YYYY
    let year: i32 = s.get(0..4)?.parse().ok()?;
    let field = |range: std::ops::Range<usize>, default: u32| {
        s.get(range)
            .filter(|f| f.bytes().all(|b| b.is_ascii_digit()))
            .and_then(|f| f.parse().ok())
            .unwrap_or(default)
    };
    let month = field(4..6, 1);
    let day = field(6..8, 1);
    let hour = field(8..10, 0);
    let minute = field(10..12, 0);
    let second = field(12..14, 0);

    let naive = NaiveDate::from_ymd_opt(year, month, day)?.and_hms_opt(hour, minute, second)?;

    let offset_seconds = match s.get(14..15) {
        Some(sign @ ("+" | "-")) => {
            let digits: String = s[15..].chars().filter(char::is_ascii_digit).collect();
            let hours: i32 = digits.get(0..2).and_then(|h| h.parse().ok()).unwrap_or(0);
            let minutes: i32 = digits.get(2..4).and_then(|m| m.parse().ok()).unwrap_or(0);
            let total = hours * 3600 + minutes * 60;
            if sign == "-" {
                -total
            } else {
                total
            }
        }
        _ => 0,
    };

    let offset = FixedOffset::east_opt(offset_seconds)?;
    let local = offset.from_local_datetime(&naive).single()?;
    Some(local.with_timezone(&Utc))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Datelike, Timelike};

    #[test]
    fn test_parse_pdf_date() {
        let date = parse_pdf_date("D:20240115103045").unwrap();
        assert_eq!(date.year(), 2024);
        assert_eq!(date.month(), 1);
        assert_eq!(date.day(), 15);
        assert_eq!(date.second(), 45);
    }

    #[test]
    fn test_parse_pdf_date_minimal() {
        let date = parse_pdf_date("D:2024").unwrap();
        assert_eq!(date.year(), 2024);
        assert_eq!(date.month(), 1);
        assert_eq!(date.day(), 1);
    }

    #[test]
    fn test_parse_pdf_date_with_offset() {
        let date = parse_pdf_date("D:20240115103045+09'00'").unwrap();
        assert_eq!(date.hour(), 1);
        let date = parse_pdf_date("D:20240115103045-05'30").unwrap();
        assert_eq!((date.hour(), date.minute()), (16, 0));
        let date = parse_pdf_date("D:20240115103045Z").unwrap();
        assert_eq!(date.hour(), 10);
    }

    #[test]
    fn test_parse_pdf_date_invalid() {
        assert!(parse_pdf_date("D:20").is_none());
        assert!(parse_pdf_date("D:20241345").is_none());
        assert!(parse_pdf_date("yesterday").is_none());
    }

    #[test]
    fn test_document_text() {
        let mut doc = Document::new().with_page_size(PageSize::letter());
        doc.paragraphs.push(Paragraph::with_text("one"));
        doc.paragraphs.push(Paragraph::with_text("two"));
        assert_eq!(doc.plain_text(), "one\ntwo");
        assert_eq!(doc.paragraph_count(), 2);
        assert!(!doc.page_size.unwrap().is_landscape());
    }
}
