//! Rendering of the intermediate document: the DOCX package and a JSON dump.

mod docx;
mod json;
mod options;
mod package;
pub mod xml;

pub use docx::{build_package, half_points, to_docx, twips, DOCX_MIME_TYPE};
pub use json::{to_json, JsonFormat};
pub use options::{Compression, RenderOptions};
pub use package::{parse_relationships, OoxmlPackage, Relationship, REQUIRED_PARTS};

use crate::error::SerializeError;
use crate::model::Document;

/// Serialize a document to DOCX bytes with default options.
pub fn serialize(doc: &Document) -> Result<Vec<u8>, SerializeError> {
    to_docx(doc, &RenderOptions::default())
}
