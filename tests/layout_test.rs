//! Layout reconstruction at its decision boundaries.

use pdf2docx::interpret::TextRun;
use pdf2docx::layout::{reconstruct, LayoutConfig};
use pdf2docx::model::build;
use pdf2docx::Alignment;

/// A run whose glyphs are exactly half the font size wide.
fn run(text: &str, x: f64, y: f64, size: f64) -> TextRun {
    TextRun {
        text: text.to_string(),
        x,
        y,
        width: text.chars().count() as f64 * size * 0.5,
        font_size: size,
        bold: false,
        italic: false,
        page_index: 0,
    }
}

fn texts(runs: Vec<TextRun>, config: &LayoutConfig) -> Vec<String> {
    reconstruct(runs, 612.0, config).iter().map(|p| p.text()).collect()
}

#[test]
fn test_gap_just_below_threshold_continues_paragraph() {
    // 1.5 x 10pt = 15pt
    let runs = vec![run("first line", 72.0, 700.0, 10.0), run("second line", 72.0, 685.01, 10.0)];
    assert_eq!(texts(runs, &LayoutConfig::default()), vec!["first line second line"]);
}

#[test]
fn test_gap_at_threshold_breaks_paragraph() {
    let runs = vec![run("first line", 72.0, 700.0, 10.0), run("second line", 72.0, 685.0, 10.0)];
    assert_eq!(texts(runs, &LayoutConfig::default()), vec!["first line", "second line"]);
}

#[test]
fn test_gap_ratio_is_configurable() {
    let runs = vec![run("first line", 72.0, 700.0, 10.0), run("second line", 72.0, 680.0, 10.0)];
    assert_eq!(texts(runs.clone(), &LayoutConfig::default()).len(), 2);
    let loose = LayoutConfig::default().with_paragraph_gap_ratio(2.5);
    assert_eq!(texts(runs, &loose).len(), 1);
}

#[test]
fn test_left_edge_within_one_char_continues() {
    // Average character width is 5pt.
    let runs = vec![
        run("aaaaaaaaaa", 72.0, 700.0, 10.0),
        run("bbbbbbbbbb", 72.0, 688.0, 10.0),
        run("cccccccccc", 77.0, 676.0, 10.0),
    ];
    assert_eq!(texts(runs, &LayoutConfig::default()).len(), 1);
}

#[test]
fn test_left_edge_beyond_one_char_breaks() {
    let runs = vec![
        run("aaaaaaaaaa", 72.0, 700.0, 10.0),
        run("bbbbbbbbbb", 72.0, 688.0, 10.0),
        run("cccccccccc", 77.5, 676.0, 10.0),
    ];
    assert_eq!(
        texts(runs, &LayoutConfig::default()),
        vec!["aaaaaaaaaa bbbbbbbbbb", "cccccccccc"]
    );
}

#[test]
fn test_first_line_indent_is_kept() {
    let runs = vec![
        run("Indented opening", 92.0, 700.0, 10.0),
        run("and the body text", 72.0, 688.0, 10.0),
        run("that follows it.", 72.0, 676.0, 10.0),
    ];
    let paragraphs = reconstruct(runs, 612.0, &LayoutConfig::default());
    assert_eq!(paragraphs.len(), 1);
    assert_eq!(paragraphs[0].alignment, Alignment::Left);
}

#[test]
fn test_font_size_change_breaks_paragraph() {
    let runs = vec![run("Heading", 72.0, 700.0, 14.0), run("body text", 72.0, 686.0, 10.0)];
    assert_eq!(texts(runs, &LayoutConfig::default()), vec!["Heading", "body text"]);
}

#[test]
fn test_right_aligned_block() {
    let runs = vec![
        run("Signed,", 505.0, 700.0, 10.0),
        run("The Author", 490.0, 688.0, 10.0),
        run("left text", 72.0, 600.0, 10.0),
    ];
    let paragraphs = reconstruct(runs, 612.0, &LayoutConfig::default());
    assert_eq!(paragraphs.len(), 2);
    assert_eq!(paragraphs[0].alignment, Alignment::Right);
    assert_eq!(paragraphs[0].text(), "Signed, The Author");
    assert_eq!(paragraphs[1].alignment, Alignment::Left);
}

fn two_column_runs() -> Vec<TextRun> {
    let mut runs = Vec::new();
    for i in 0..6 {
        let y = 700.0 - 12.0 * i as f64;
        runs.push(run(&format!("left column line {}", i), 72.0, y, 10.0));
        runs.push(run(&format!("right column line {}", i), 320.0, y, 10.0));
    }
    runs
}

#[test]
fn test_two_columns_read_left_then_right() {
    let paragraphs = texts(two_column_runs(), &LayoutConfig::default());
    assert_eq!(paragraphs.len(), 2);
    assert!(paragraphs[0].starts_with("left column line 0 left column line 1"));
    assert!(paragraphs[1].starts_with("right column line 0 right column line 1"));
}

#[test]
fn test_column_detection_can_be_disabled() {
    let config = LayoutConfig::default().with_column_detection(false);
    let paragraphs = texts(two_column_runs(), &config);
    assert!(paragraphs[0].starts_with("left column line 0 right column line 0"));
}

#[test]
fn test_words_split_across_runs_get_spaces() {
    let runs = vec![
        run("Hello", 72.0, 700.0, 10.0),
        // 25pt wide; a 5pt gap is a word break.
        run("world", 102.0, 700.0, 10.0),
        // Touching: same word.
        run("wide", 127.0, 700.0, 10.0),
    ];
    assert_eq!(texts(runs, &LayoutConfig::default()), vec!["Hello worldwide"]);
}

#[test]
fn test_hyphenated_line_break_is_joined() {
    let runs = vec![run("the recon-", 72.0, 700.0, 10.0), run("struction of text", 72.0, 688.0, 10.0)];
    let doc = build(vec![reconstruct(runs, 612.0, &LayoutConfig::default())]);
    assert_eq!(doc.plain_text(), "the reconstruction of text");
}

#[test]
fn test_cjk_lines_join_without_space() {
    let runs = vec![run("日本語の", 72.0, 700.0, 10.0), run("文章です", 72.0, 688.0, 10.0)];
    let doc = build(vec![reconstruct(runs, 612.0, &LayoutConfig::default())]);
    assert_eq!(doc.plain_text(), "日本語の文章です");
}

#[test]
fn test_layout_is_deterministic_under_run_order() {
    let mut runs = two_column_runs();
    let forward = texts(runs.clone(), &LayoutConfig::default());
    runs.reverse();
    assert_eq!(texts(runs, &LayoutConfig::default()), forward);
}
