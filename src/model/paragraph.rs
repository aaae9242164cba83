//! Paragraph and run types.

use serde::{Deserialize, Serialize};

/// A paragraph of styled runs.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Paragraph {
    /// Runs in reading order
    pub runs: Vec<Run>,

    /// Horizontal alignment
    pub alignment: Alignment,

    /// The paragraph opens a new page
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub page_break_before: bool,
}

impl Paragraph {
    /// Create a new empty paragraph.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a paragraph holding one plain run.
    pub fn with_text(text: impl Into<String>) -> Self {
        let mut p = Self::new();
        p.push_run(Run::new(text));
        p
    }

    pub fn with_alignment(mut self, alignment: Alignment) -> Self {
        self.alignment = alignment;
        self
    }

    pub fn with_page_break(mut self) -> Self {
        self.page_break_before = true;
        self
    }

    /// Append a run, merging it into the last run when their styles match.
    pub fn push_run(&mut self, run: Run) {
        if run.text.is_empty() {
            return;
        }
        match self.runs.last_mut() {
            Some(last) if last.same_style(&run) => last.text.push_str(&run.text),
            _ => self.runs.push(run),
        }
    }

    /// Get plain text content of the paragraph.
    pub fn plain_text(&self) -> String {
        self.runs.iter().map(|r| r.text.as_str()).collect()
    }

    /// Check if the paragraph has no visible text.
    pub fn is_empty(&self) -> bool {
        self.runs.iter().all(|r| r.text.trim().is_empty())
    }
}

/// A span of text with uniform character formatting.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Run {
    /// Text content
    pub text: String,

    /// Bold
    #[serde(default)]
    pub bold: bool,

    /// Italic
    #[serde(default)]
    pub italic: bool,

    /// Font size in points, rounded to half points
    pub font_size_pt: f64,
}

impl Run {
    /// Create a plain run at the default size.
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            bold: false,
            italic: false,
            font_size_pt: DEFAULT_FONT_SIZE_PT,
        }
    }

    pub fn with_bold(mut self, bold: bool) -> Self {
        self.bold = bold;
        self
    }

    pub fn with_italic(mut self, italic: bool) -> Self {
        self.italic = italic;
        self
    }

    pub fn with_size(mut self, points: f64) -> Self {
        self.font_size_pt = round_half_point(points);
        self
    }

    /// Whether `other` has the same formatting.
    pub fn same_style(&self, other: &Run) -> bool {
        self.bold == other.bold && self.italic == other.italic && self.font_size_pt == other.font_size_pt
    }
}

/// Font size used when none is known.
pub const DEFAULT_FONT_SIZE_PT: f64 = 11.0;

/// Round to the nearest half point, falling back to the default size for
/// unusable values.
pub fn round_half_point(points: f64) -> f64 {
    if points.is_finite() && points > 0.0 {
        ((points * 2.0).round() / 2.0).max(0.5)
    } else {
        DEFAULT_FONT_SIZE_PT
    }
}

/// Text alignment.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Alignment {
    /// Left alignment (default)
    #[default]
    Left,
    /// Center alignment
    Center,
    /// Right alignment
    Right,
}
