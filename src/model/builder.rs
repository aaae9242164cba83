//! Assembly of the format-neutral [`Document`] from laid-out pages.

use super::{Document, Metadata, PageSize, Paragraph, Run};
use crate::layout::{self, is_spaceless_script_char, Line};

/// Accumulates pages, in order, into a [`Document`].
#[derive(Debug, Default)]
pub struct DocumentBuilder {
    document: Document,
    pages: usize,
}

impl DocumentBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn metadata(mut self, metadata: Metadata) -> Self {
        self.document.metadata = metadata;
        self
    }

    pub fn page_size(mut self, size: PageSize) -> Self {
        self.document.page_size = Some(size);
        self
    }

    /// Append the paragraphs of the next page.
    ///
    /// The first paragraph of every page after the first one that produced
    /// text is marked as starting a new page.
    pub fn push_page(&mut self, paragraphs: Vec<layout::Paragraph>) {
        let mut pending_break = !self.document.paragraphs.is_empty();
        for paragraph in paragraphs {
            let mut built = convert_paragraph(paragraph);
            if built.is_empty() {
                continue;
            }
            built.page_break_before = std::mem::take(&mut pending_break);
            self.document.paragraphs.push(built);
        }
        self.pages += 1;
    }

    pub fn finish(self) -> Document {
        log::debug!(
            "built document: {} pages, {} paragraphs",
            self.pages,
            self.document.paragraphs.len()
        );
        self.document
    }
}

/// Build a document from per-page paragraphs, in page order.
pub fn build(pages: Vec<Vec<layout::Paragraph>>) -> Document {
    let mut builder = DocumentBuilder::new();
    for page in pages {
        builder.push_page(page);
    }
    builder.finish()
}

fn convert_paragraph(paragraph: layout::Paragraph) -> Paragraph {
    let mut out = Paragraph::new().with_alignment(paragraph.alignment);
    let mut prev_line: Option<Line> = None;

    for line in paragraph.lines {
        if let Some(prev) = &prev_line {
            join_lines(&mut out, prev, &line);
        }
        for (i, run) in line.runs.iter().enumerate() {
            let text = if i == 0 { run.text.trim_start() } else { run.text.as_str() };
            out.push_run(
                Run::new(text)
                    .with_bold(run.bold)
                    .with_italic(run.italic)
                    .with_size(run.font_size),
            );
        }
        prev_line = Some(line);
    }

    if let Some(last) = out.runs.last_mut() {
        let trimmed = last.text.trim_end().len();
        last.text.truncate(trimmed);
    }
    out.runs.retain(|r| !r.text.is_empty());
    out
}

/// Prepare the paragraph's tail for the next line.
///
/// A trailing hyphen (`-`, U+00AD or U+2010) is dropped only when the
/// character before it is alphanumeric, so `co-` + `operate` reads
/// `cooperate` while a lone dash keeps its separating space. Between two
/// CJK characters nothing is inserted; every other join adds one space.
fn join_lines(paragraph: &mut Paragraph, prev: &Line, next: &Line) {
    let Some(last) = paragraph.runs.last_mut() else {
        return;
    };
    let trimmed = last.text.trim_end().len();
    last.text.truncate(trimmed);

    let mut tail = last.text.chars().rev();
    let (end, before) = (tail.next(), tail.next());
    let next_first = next.text().trim_start().chars().next();

    match end {
        Some(c) if is_wrap_hyphen(c) && before.is_some_and(char::is_alphanumeric) => {
            last.text.pop();
        }
        Some(c) if is_spaceless_script_char(c) && next_first.is_some_and(is_spaceless_script_char) => {}
        Some(_) => last.text.push(' '),
        None => {}
    }

    if last.text.is_empty() {
        paragraph.runs.pop();
    }
    log::trace!("joined line at y={:.1} to y={:.1}", prev.y, next.y);
}

fn is_wrap_hyphen(c: char) -> bool {
    matches!(c, '-' | '\u{00AD}' | '\u{2010}')
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::interpret::TextRun;
    use crate::model::Alignment;

    fn run(text: &str, x: f64, y: f64, bold: bool) -> TextRun {
        TextRun {
            text: text.to_string(),
            x,
            y,
            width: text.chars().count() as f64 * 5.0,
            font_size: 10.0,
            bold,
            italic: false,
            page_index: 0,
        }
    }

    fn paragraph(lines: Vec<Vec<TextRun>>) -> layout::Paragraph {
        layout::Paragraph {
            lines: lines.into_iter().map(|runs| Line::from_runs(runs, 0.5)).collect(),
            alignment: Alignment::Left,
        }
    }

    #[test]
    fn test_lines_joined_with_space() {
        let doc = build(vec![vec![paragraph(vec![
            vec![run("The quick brown", 72.0, 700.0, false)],
            vec![run("fox jumps", 72.0, 688.0, false)],
        ])]]);
        assert_eq!(doc.paragraphs.len(), 1);
        assert_eq!(doc.paragraphs[0].runs.len(), 1);
        assert_eq!(doc.paragraphs[0].plain_text(), "The quick brown fox jumps");
    }

    #[test]
    fn test_hyphenated_line_joined() {
        let doc = build(vec![vec![paragraph(vec![
            vec![run("an extra-", 72.0, 700.0, false)],
            vec![run("ordinary day", 72.0, 688.0, false)],
        ])]]);
        assert_eq!(doc.paragraphs[0].plain_text(), "an extraordinary day");
    }

    #[test]
    fn test_lone_dash_keeps_space() {
        let doc = build(vec![vec![paragraph(vec![
            vec![run("before -", 72.0, 700.0, false)],
            vec![run("after", 72.0, 688.0, false)],
        ])]]);
        assert_eq!(doc.paragraphs[0].plain_text(), "before - after");
    }

    #[test]
    fn test_cjk_lines_joined_without_space() {
        let doc = build(vec![vec![paragraph(vec![
            vec![run("日本語の", 72.0, 700.0, false)],
            vec![run("文章", 72.0, 688.0, false)],
        ])]]);
        assert_eq!(doc.paragraphs[0].plain_text(), "日本語の文章");
    }

    #[test]
    fn test_styles_kept_apart() {
        let doc = build(vec![vec![paragraph(vec![vec![
            run("Bold", 72.0, 700.0, true),
            run("plain", 100.0, 700.0, false),
        ]])]]);
        let runs = &doc.paragraphs[0].runs;
        assert_eq!(runs.len(), 2);
        assert_eq!(runs[0].text, "Bold");
        assert!(runs[0].bold);
        assert_eq!(runs[1].text, " plain");
        assert_eq!(runs[1].font_size_pt, 10.0);
    }

    #[test]
    fn test_page_breaks() {
        let page = || vec![paragraph(vec![vec![run("text", 72.0, 700.0, false)]])];
        let doc = build(vec![page(), vec![], page(), page()]);
        let breaks: Vec<bool> = doc.paragraphs.iter().map(|p| p.page_break_before).collect();
        assert_eq!(breaks, vec![false, true, true]);
    }

    #[test]
    fn test_page_break_skips_empty_leading_paragraph() {
        let first = vec![paragraph(vec![vec![run("one", 72.0, 700.0, false)]])];
        let second = vec![
            paragraph(vec![vec![run("   ", 72.0, 720.0, false)]]),
            paragraph(vec![vec![run("two", 72.0, 700.0, false)]]),
        ];
        let doc = build(vec![first, second]);
        let breaks: Vec<bool> = doc.paragraphs.iter().map(|p| p.page_break_before).collect();
        assert_eq!(doc.plain_text(), "one\ntwo");
        assert_eq!(breaks, vec![false, true]);
    }

    #[test]
    fn test_empty_pages() {
        let doc = build(vec![vec![], vec![]]);
        assert!(doc.is_empty());
    }
}
