//! PDF object store.
//!
//! Turns raw bytes into a navigable object graph: header and cross-reference
//! parsing (with recovery by scanning), lazy object resolution, stream
//! decoding, decryption and page-tree traversal.

mod crypt;
mod filter;
pub(crate) mod lexer;
mod object;
mod page;
mod store;
mod syntax;
mod xref;

pub use filter::Filter;
pub use lexer::{Lexer, Token};
pub use object::{Dict, ObjRef, PdfValue, Stream};
pub use page::{Page, Rect};
pub use store::ObjectStore;
pub use syntax::{parse_value, ObjectParser};
pub use xref::{XrefEntry, XrefTable};
