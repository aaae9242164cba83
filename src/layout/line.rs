//! Baseline clustering of text runs into lines.

use std::cmp::Ordering;

use crate::interpret::TextRun;

/// A gap wider than this fraction of the average character width
/// separates words.
const WORD_GAP_RATIO: f64 = 0.2;

/// Runs sharing a baseline, ordered left to right.
#[derive(Debug, Clone, PartialEq)]
pub struct Line {
    /// The runs in this line, sorted by x; word gaps already hold a space
    pub runs: Vec<TextRun>,
    /// Baseline y of the line
    pub y: f64,
    /// Leftmost x
    pub left: f64,
    /// Rightmost x
    pub right: f64,
    /// Dominant font size, weighted by character count
    pub font_size: f64,
}

impl Line {
    /// Build a line from runs already known to share a baseline.
    pub fn from_runs(mut runs: Vec<TextRun>, avg_char_width_ratio: f64) -> Self {
        runs.sort_by(|a, b| a.x.partial_cmp(&b.x).unwrap_or(Ordering::Equal));
        insert_word_gaps(&mut runs, avg_char_width_ratio);

        let total_chars: usize = runs.iter().map(|r| r.text.chars().count()).sum();
        let weighted_size: f64 = runs
            .iter()
            .map(|r| r.font_size * r.text.chars().count() as f64)
            .sum();
        let font_size = if total_chars > 0 {
            weighted_size / total_chars as f64
        } else {
            runs.first().map_or(0.0, |r| r.font_size)
        };

        // The longest run carries the baseline; sub- and superscripts do not.
        let y = runs
            .iter()
            .max_by_key(|r| r.text.chars().count())
            .map_or(0.0, |r| r.y);
        let left = runs.iter().map(|r| r.x).fold(f64::INFINITY, f64::min);
        let right = runs.iter().map(TextRun::right).fold(f64::NEG_INFINITY, f64::max);

        Self {
            runs,
            y,
            left: if left.is_finite() { left } else { 0.0 },
            right: if right.is_finite() { right } else { 0.0 },
            font_size,
        }
    }

    /// The line's text, words separated by spaces.
    pub fn text(&self) -> String {
        self.runs.iter().map(|r| r.text.as_str()).collect()
    }

    pub fn width(&self) -> f64 {
        self.right - self.left
    }

    pub fn center(&self) -> f64 {
        (self.left + self.right) / 2.0
    }

    /// Number of characters in the line.
    pub fn char_count(&self) -> usize {
        self.runs.iter().map(|r| r.text.chars().count()).sum()
    }
}

/// Prefix a space to runs that start after a visible gap.
///
/// No space is added between two characters of scripts written without
/// word spaces (Chinese, Japanese).
fn insert_word_gaps(runs: &mut [TextRun], avg_char_width_ratio: f64) {
    for i in 1..runs.len() {
        let (before, after) = runs.split_at_mut(i);
        let prev = &before[i - 1];
        let run = &mut after[0];

        let gap = run.x - prev.right();
        let char_count = run.text.chars().count();
        let avg_char_width = if char_count > 0 && run.width > 0.0 {
            run.width / char_count as f64
        } else {
            run.font_size * avg_char_width_ratio
        };
        if gap <= avg_char_width * WORD_GAP_RATIO {
            continue;
        }

        let prev_last = prev.text.chars().last();
        let curr_first = run.text.chars().next();
        let both_spaceless = prev_last.is_some_and(is_spaceless_script_char)
            && curr_first.is_some_and(is_spaceless_script_char);
        let has_space = prev_last.is_some_and(is_space) || curr_first.is_some_and(is_space);

        if !both_spaceless && !has_space {
            run.text.insert(0, ' ');
        }
    }
}

fn is_space(c: char) -> bool {
    c == ' ' || c == '\u{00A0}'
}

/// Group runs into lines by baseline.
///
/// Runs are visited top to bottom, then left to right; a run joins the
/// current line when its baseline is within `tolerance` of the line's first
/// run.
pub fn group_into_lines(mut runs: Vec<TextRun>, tolerance: f64, avg_char_width_ratio: f64) -> Vec<Line> {
    if runs.is_empty() {
        return vec![];
    }

    runs.sort_by(|a, b| match b.y.partial_cmp(&a.y).unwrap_or(Ordering::Equal) {
        Ordering::Equal => a.x.partial_cmp(&b.x).unwrap_or(Ordering::Equal),
        other => other,
    });

    let mut lines = Vec::new();
    let mut current: Vec<TextRun> = Vec::new();
    let mut current_y: Option<f64> = None;

    for run in runs {
        match current_y {
            Some(y) if (run.y - y).abs() <= tolerance => current.push(run),
            _ => {
                if !current.is_empty() {
                    lines.push(Line::from_runs(std::mem::take(&mut current), avg_char_width_ratio));
                }
                current_y = Some(run.y);
                current.push(run);
            }
        }
    }
    if !current.is_empty() {
        lines.push(Line::from_runs(current, avg_char_width_ratio));
    }

    lines
}

/// Whether `c` belongs to a script written without spaces between words.
///
/// Chinese and Japanese qualify; Korean uses word spaces and does not.
pub fn is_spaceless_script_char(c: char) -> bool {
    let code = c as u32;

    // CJK Unified Ideographs and Extension A
    (0x4E00..=0x9FFF).contains(&code)
    || (0x3400..=0x4DBF).contains(&code)
    // Extensions B-F
    || (0x20000..=0x2EBEF).contains(&code)
    // Hiragana, Katakana
    || (0x3040..=0x30FF).contains(&code)
    // CJK Symbols and Punctuation
    || (0x3000..=0x303F).contains(&code)
    // Halfwidth and fullwidth forms
    || (0xFF00..=0xFFEF).contains(&code)
}
