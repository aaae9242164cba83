//! JSON dump of the intermediate document, for inspecting layout results.

use crate::error::Result;
use crate::model::Document;

/// Layout of the JSON text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum JsonFormat {
    /// Indented, one field per line
    #[default]
    Pretty,
    /// Single line
    Compact,
}

/// Serialize `doc` as JSON.
///
/// Paragraphs without a page break omit `page_break_before`, and metadata
/// fields that the PDF did not set are `null`.
pub fn to_json(doc: &Document, format: JsonFormat) -> Result<String> {
    Ok(match format {
        JsonFormat::Pretty => serde_json::to_string_pretty(doc)?,
        JsonFormat::Compact => serde_json::to_string(doc)?,
    })
}
