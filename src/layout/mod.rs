//! Layout reconstruction: positioned text runs to lines and paragraphs.
//!
//! Everything here is geometric and works on [`TextRun`]s only. Runs are
//! clustered into lines by baseline, lines into paragraphs by vertical gap,
//! font size and left edge, and each paragraph gets an inferred alignment.
//! Simple two-column pages are read column by column.
//!
//! The thresholds are heuristics and live in [`LayoutConfig`].

mod columns;
mod line;
mod paragraph;

pub use columns::find_gutter;
pub use line::{group_into_lines, is_spaceless_script_char, Line};
pub use paragraph::{group_into_paragraphs, infer_alignment, Frame, Paragraph};

use crate::interpret::TextRun;

/// Font size assumed when a page carries no usable size.
const FALLBACK_FONT_SIZE: f64 = 12.0;

/// Thresholds for layout reconstruction.
#[derive(Debug, Clone, PartialEq)]
pub struct LayoutConfig {
    /// Runs within this fraction of the dominant font size of a baseline
    /// join that line
    pub line_tolerance_ratio: f64,

    /// A vertical gap of at least this many times the smaller line's font
    /// size starts a new paragraph
    pub paragraph_gap_ratio: f64,

    /// Left-edge drift, in average character widths, that starts a new
    /// paragraph
    pub indent_tolerance_chars: f64,

    /// Margin tolerance for alignment, as a fraction of the usable width
    pub alignment_tolerance_ratio: f64,

    /// Average character width as a fraction of font size, used when run
    /// widths are unknown
    pub avg_char_width_ratio: f64,

    /// Font size change, in points, that starts a new paragraph
    pub font_size_tolerance: f64,

    /// Read two-column pages column by column
    pub detect_columns: bool,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            line_tolerance_ratio: 0.4,
            paragraph_gap_ratio: 1.5,
            indent_tolerance_chars: 1.0,
            alignment_tolerance_ratio: 0.03,
            avg_char_width_ratio: 0.5,
            font_size_tolerance: 1.0,
            detect_columns: true,
        }
    }
}

impl LayoutConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_line_tolerance_ratio(mut self, ratio: f64) -> Self {
        self.line_tolerance_ratio = ratio;
        self
    }

    pub fn with_paragraph_gap_ratio(mut self, ratio: f64) -> Self {
        self.paragraph_gap_ratio = ratio;
        self
    }

    pub fn with_indent_tolerance_chars(mut self, chars: f64) -> Self {
        self.indent_tolerance_chars = chars;
        self
    }

    pub fn with_alignment_tolerance_ratio(mut self, ratio: f64) -> Self {
        self.alignment_tolerance_ratio = ratio;
        self
    }

    pub fn with_avg_char_width_ratio(mut self, ratio: f64) -> Self {
        self.avg_char_width_ratio = ratio;
        self
    }

    pub fn with_font_size_tolerance(mut self, points: f64) -> Self {
        self.font_size_tolerance = points;
        self
    }

    pub fn with_column_detection(mut self, enabled: bool) -> Self {
        self.detect_columns = enabled;
        self
    }
}

/// Rebuild the paragraphs of one page from its text runs.
///
/// `page_width` is the width of the page in points; zero or less means
/// unknown, and alignment is then judged against the text's own extents.
/// Deterministic for a given run order.
pub fn reconstruct(runs: Vec<TextRun>, page_width: f64, config: &LayoutConfig) -> Vec<Paragraph> {
    let runs: Vec<TextRun> = runs
        .into_iter()
        .filter(|r| !r.text.trim().is_empty() && r.x.is_finite() && r.y.is_finite())
        .collect();
    if runs.is_empty() {
        return vec![];
    }

    let font_size = dominant_font_size(&runs);
    let tolerance = config.line_tolerance_ratio * font_size;

    let gutter = if config.detect_columns {
        find_gutter(&runs)
    } else {
        None
    };

    let paragraphs = match gutter {
        Some(gutter) => {
            let (left, right) = columns::split_at(runs, gutter);
            [left, right]
                .into_iter()
                .flat_map(|column| {
                    let lines = group_into_lines(column, tolerance, config.avg_char_width_ratio);
                    let frame = Frame::from_lines(&lines);
                    group_into_paragraphs(lines, frame, config)
                })
                .collect()
        }
        None => {
            let lines = group_into_lines(runs, tolerance, config.avg_char_width_ratio);
            let frame = Frame::for_page(&lines, page_width);
            group_into_paragraphs(lines, frame, config)
        }
    };

    log::debug!(
        "layout: {} paragraphs (tolerance {:.2}pt, columns: {})",
        paragraphs.len(),
        tolerance,
        gutter.is_some()
    );
    paragraphs
}

/// Character-weighted mean font size of the runs.
pub fn dominant_font_size(runs: &[TextRun]) -> f64 {
    let (weighted, chars) = runs
        .iter()
        .filter(|r| r.font_size.is_finite() && r.font_size > 0.0)
        .fold((0.0, 0usize), |(sum, count), r| {
            let n = r.text.chars().count();
            (sum + r.font_size * n as f64, count + n)
        });
    if chars == 0 {
        FALLBACK_FONT_SIZE
    } else {
        weighted / chars as f64
    }
}
