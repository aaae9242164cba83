//! Paragraph grouping and alignment inference.

use super::line::Line;
use super::LayoutConfig;
use crate::model::Alignment;

/// Lines may start this many average characters left of a paragraph's
/// first line and still continue it (first-line indent).
const MAX_FIRST_LINE_INDENT_CHARS: f64 = 10.0;

/// Consecutive lines grouped into one block, with inferred alignment.
#[derive(Debug, Clone, PartialEq)]
pub struct Paragraph {
    pub lines: Vec<Line>,
    pub alignment: Alignment,
}

impl Paragraph {
    /// Plain text of the paragraph, lines joined by a space.
    pub fn text(&self) -> String {
        self.lines.iter().map(Line::text).collect::<Vec<_>>().join(" ")
    }

    /// Dominant font size over all lines.
    pub fn font_size(&self) -> f64 {
        let chars: usize = self.lines.iter().map(Line::char_count).sum();
        if chars == 0 {
            return self.lines.first().map_or(0.0, |l| l.font_size);
        }
        self.lines
            .iter()
            .map(|l| l.font_size * l.char_count() as f64)
            .sum::<f64>()
            / chars as f64
    }
}

/// Horizontal band the text is set in.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Frame {
    pub left: f64,
    pub right: f64,
}

impl Frame {
    /// Frame spanning exactly the lines' extents.
    pub fn from_lines(lines: &[Line]) -> Self {
        let left = lines.iter().map(|l| l.left).fold(f64::INFINITY, f64::min);
        let right = lines.iter().map(|l| l.right).fold(f64::NEG_INFINITY, f64::max);
        if left.is_finite() && right.is_finite() {
            Self { left, right }
        } else {
            Self { left: 0.0, right: 0.0 }
        }
    }

    /// Usable width of a page: equal margins on both sides, as wide as the
    /// narrower of the text's two margins allows.
    pub fn for_page(lines: &[Line], page_width: f64) -> Self {
        let extents = Self::from_lines(lines);
        if page_width <= 0.0 || extents.right > page_width || extents.left < 0.0 {
            return extents;
        }
        let margin = extents.left.min(page_width - extents.right).max(0.0);
        Self {
            left: margin,
            right: page_width - margin,
        }
    }

    pub fn width(&self) -> f64 {
        self.right - self.left
    }
}

/// Group lines, already in reading order, into paragraphs.
pub fn group_into_paragraphs(lines: Vec<Line>, frame: Frame, config: &LayoutConfig) -> Vec<Paragraph> {
    let tolerance = config.alignment_tolerance_ratio * frame.width();
    let mut groups: Vec<Vec<Line>> = Vec::new();

    for line in lines {
        match groups.last_mut() {
            Some(current) if !starts_new_paragraph(current, &line, frame, tolerance, config) => {
                current.push(line);
            }
            _ => groups.push(vec![line]),
        }
    }

    groups
        .into_iter()
        .map(|lines| {
            let alignment = infer_alignment(&lines, frame, tolerance);
            Paragraph { lines, alignment }
        })
        .collect()
}

fn starts_new_paragraph(
    paragraph: &[Line],
    line: &Line,
    frame: Frame,
    alignment_tolerance: f64,
    config: &LayoutConfig,
) -> bool {
    let Some(prev) = paragraph.last() else {
        return true;
    };

    let size = prev.font_size.min(line.font_size).max(1.0);
    let gap = prev.y - line.y;
    if gap >= config.paragraph_gap_ratio * size || gap < 0.0 {
        return true;
    }

    if (prev.font_size - line.font_size).abs() > config.font_size_tolerance {
        return true;
    }

    let char_width = average_char_width(paragraph, config.avg_char_width_ratio);
    let indent_tolerance = config.indent_tolerance_chars * char_width;

    // A single line has no established edge yet; the second line sets it.
    let first = &paragraph[0];
    let anchor = paragraph.get(1).unwrap_or(first);

    if (line.left - anchor.left).abs() <= indent_tolerance {
        return false;
    }
    if paragraph.len() == 1
        && line.left < first.left
        && first.left - line.left <= MAX_FIRST_LINE_INDENT_CHARS * char_width
    {
        return false;
    }

    // Centered and right-aligned blocks keep a shared center or right edge
    // while their left edges wander.
    let inset = |l: &Line| l.left - frame.left > alignment_tolerance;
    if inset(line) && inset(anchor) {
        if (line.center() - anchor.center()).abs() <= alignment_tolerance {
            return false;
        }
        if (line.right - anchor.right).abs() <= indent_tolerance {
            return false;
        }
    }

    true
}

fn average_char_width(lines: &[Line], ratio: f64) -> f64 {
    let (width, chars) = lines
        .iter()
        .flat_map(|l| &l.runs)
        .fold((0.0, 0usize), |(w, c), r| (w + r.width, c + r.text.chars().count()));
    if chars > 0 && width > 0.0 {
        width / chars as f64
    } else {
        lines.first().map_or(0.0, |l| l.font_size * ratio)
    }
}

/// Infer alignment from the lines' margins within `frame`.
///
/// Centered when every line has both margins beyond `tolerance` and the two
/// roughly equal; right-aligned when every line is flush right but not flush
/// left; left-aligned otherwise.
pub fn infer_alignment(lines: &[Line], frame: Frame, tolerance: f64) -> Alignment {
    if lines.is_empty() {
        return Alignment::Left;
    }
    let margins: Vec<(f64, f64)> = lines
        .iter()
        .map(|l| (l.left - frame.left, frame.right - l.right))
        .collect();

    if margins
        .iter()
        .all(|&(left, right)| left > tolerance && right > tolerance && (left - right).abs() <= tolerance)
    {
        Alignment::Center
    } else if margins.iter().all(|&(left, right)| right <= tolerance && left > tolerance) {
        Alignment::Right
    } else {
        Alignment::Left
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::interpret::TextRun;

    fn line(text: &str, x: f64, y: f64, size: f64) -> Line {
        let width = text.chars().count() as f64 * size * 0.5;
        Line::from_runs(
            vec![TextRun {
                text: text.to_string(),
                x,
                y,
                width,
                font_size: size,
                bold: false,
                italic: false,
                page_index: 0,
            }],
            0.5,
        )
    }

    fn page_frame() -> Frame {
        Frame {
            left: 72.0,
            right: 540.0,
        }
    }

    #[test]
    fn test_gap_threshold() {
        let config = LayoutConfig::default();
        let merged = group_into_paragraphs(
            vec![line("first", 72.0, 700.0, 10.0), line("second", 72.0, 685.01, 10.0)],
            page_frame(),
            &config,
        );
        assert_eq!(merged.len(), 1);

        let split = group_into_paragraphs(
            vec![line("first", 72.0, 700.0, 10.0), line("second", 72.0, 685.0, 10.0)],
            page_frame(),
            &config,
        );
        assert_eq!(split.len(), 2);
    }

    #[test]
    fn test_smaller_font_sets_gap() {
        let config = LayoutConfig::default().with_font_size_tolerance(10.0);
        let paragraphs = group_into_paragraphs(
            vec![line("big", 72.0, 700.0, 20.0), line("small", 72.0, 684.0, 10.0)],
            page_frame(),
            &config,
        );
        assert_eq!(paragraphs.len(), 2);
    }

    #[test]
    fn test_font_size_change_breaks() {
        let paragraphs = group_into_paragraphs(
            vec![line("Heading", 72.0, 700.0, 14.0), line("body", 72.0, 688.0, 10.0)],
            page_frame(),
            &LayoutConfig::default(),
        );
        assert_eq!(paragraphs.len(), 2);
    }

    #[test]
    fn test_indent_starts_paragraph() {
        let paragraphs = group_into_paragraphs(
            vec![
                line("end of one paragraph", 72.0, 700.0, 10.0),
                line("start of the next", 92.0, 688.0, 10.0),
                line("which continues here", 72.0, 676.0, 10.0),
            ],
            page_frame(),
            &LayoutConfig::default(),
        );
        assert_eq!(paragraphs.len(), 2);
        assert_eq!(paragraphs[1].lines.len(), 2);
    }

    #[test]
    fn test_left_edge_within_one_char() {
        let paragraphs = group_into_paragraphs(
            vec![
                line("aaaa", 72.0, 700.0, 10.0),
                line("bbbb", 72.0, 688.0, 10.0),
                line("cccc", 76.9, 676.0, 10.0),
                line("dddd", 77.1, 664.0, 10.0),
            ],
            page_frame(),
            &LayoutConfig::default(),
        );
        assert_eq!(paragraphs.len(), 2);
        assert_eq!(paragraphs[0].lines.len(), 3);
    }

    #[test]
    fn test_centered_lines_stay_together() {
        let paragraphs = group_into_paragraphs(
            vec![
                line("A centered title line", 253.5, 700.0, 10.0),
                line("short one", 283.5, 688.0, 10.0),
            ],
            page_frame(),
            &LayoutConfig::default(),
        );
        assert_eq!(paragraphs.len(), 1);
        assert_eq!(paragraphs[0].alignment, Alignment::Center);
    }

    #[test]
    fn test_alignment_inference() {
        let frame = page_frame();
        let left = [line("left aligned text", 72.0, 700.0, 10.0)];
        assert_eq!(infer_alignment(&left, frame, 14.0), Alignment::Left);

        let right = [line("right", 515.0, 700.0, 10.0)];
        assert_eq!(infer_alignment(&right, frame, 14.0), Alignment::Right);

        let center = [line("middle", 291.0, 700.0, 10.0)];
        assert_eq!(infer_alignment(&center, frame, 14.0), Alignment::Center);

        let full = [line(&"x".repeat(93), 72.0, 700.0, 10.0)];
        assert_eq!(infer_alignment(&full, frame, 14.0), Alignment::Left);
    }

    #[test]
    fn test_page_frame_is_symmetric() {
        let lines = [line("text", 90.0, 700.0, 10.0), line("wider text here", 72.0, 688.0, 10.0)];
        let frame = Frame::for_page(&lines, 612.0);
        assert_eq!(frame, Frame { left: 72.0, right: 540.0 });
    }
}
