//! Non-fatal conditions collected during a conversion.

use std::fmt;

use serde::Serialize;

/// What kind of recovery took place.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum DiagnosticKind {
    /// The cross-reference table was rebuilt by scanning the file.
    RecoveredXref,
    /// A page could not be interpreted and was left out.
    PageSkipped,
    /// A content-stream operator was malformed and ignored.
    MalformedOperator,
    /// A font resource was missing; text was decoded with defaults.
    MissingFont,
    /// No text was found; a single empty paragraph was written.
    EmptyDocument,
}

/// A recovered problem, reported alongside the output.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Diagnostic {
    /// 1-based page number, when the problem is page-scoped
    pub page: Option<usize>,
    /// Category
    pub kind: DiagnosticKind,
    /// Human-readable detail
    pub message: String,
}

impl Diagnostic {
    pub fn new(kind: DiagnosticKind, message: impl Into<String>) -> Self {
        Self {
            page: None,
            kind,
            message: message.into(),
        }
    }

    pub fn on_page(mut self, page: usize) -> Self {
        self.page = Some(page);
        self
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.page {
            Some(page) => write!(f, "[{:?}] page {}: {}", self.kind, page, self.message),
            None => write!(f, "[{:?}] {}", self.kind, self.message),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display() {
        let d = Diagnostic::new(DiagnosticKind::PageSkipped, "bad stream").on_page(2);
        assert_eq!(d.to_string(), "[PageSkipped] page 2: bad stream");
    }

    #[test]
    fn test_serialize() {
        let d = Diagnostic::new(DiagnosticKind::RecoveredXref, "rebuilt");
        let json = serde_json::to_string(&d).unwrap();
        assert_eq!(json, r#"{"page":null,"kind":"RecoveredXref","message":"rebuilt"}"#);
    }
}
