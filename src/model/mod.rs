//! Document model types.
//!
//! The intermediate representation between the PDF side and the OOXML
//! side: ordered paragraphs of styled runs, plus metadata and page size.
//! Nothing here knows how it will be written out.

mod builder;
mod document;
mod paragraph;

pub use builder::{build, DocumentBuilder};
pub use document::{parse_pdf_date, Document, Metadata, PageSize};
pub use paragraph::{round_half_point, Alignment, Paragraph, Run, DEFAULT_FONT_SIZE_PT};
