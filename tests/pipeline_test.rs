//! End-to-end conversion of synthetic PDFs.

mod common;

use common::{
    append_update, corrupt_startxref, document, document_with, stream_body, strip_xref, text_content, PdfBuilder,
    TestPage,
};
use pdf2docx::{
    convert_pdf_to_docx, convert_pdf_to_docx_with_diagnostics, convert_to_document, Alignment, CancelToken,
    ConversionOptions, DiagnosticKind, Error, ParseError,
};

fn body_block() -> String {
    text_content(
        &[
            (72.0, 700.0, "The quick brown fox jumps"),
            (72.0, 686.0, "over the lazy dog and keeps"),
            (72.0, 672.0, "running until the end."),
        ],
        12.0,
    )
}

fn sequential() -> ConversionOptions {
    ConversionOptions::new().with_parallel(false)
}

#[test]
fn test_left_aligned_block_is_one_paragraph() {
    let pdf = document(&[body_block()]);
    let (doc, diagnostics) = convert_to_document(&pdf, &sequential()).unwrap();

    assert!(diagnostics.is_empty(), "{:?}", diagnostics);
    assert_eq!(doc.paragraph_count(), 1);
    let paragraph = &doc.paragraphs[0];
    assert_eq!(paragraph.alignment, Alignment::Left);
    assert_eq!(
        paragraph.plain_text(),
        "The quick brown fox jumps over the lazy dog and keeps running until the end."
    );
    assert_eq!(paragraph.runs[0].font_size_pt, 12.0);
    assert!(!paragraph.runs[0].bold);
}

#[test]
fn test_large_gap_starts_new_paragraph() {
    let content = text_content(
        &[
            (72.0, 700.0, "First paragraph line one"),
            (72.0, 686.0, "first paragraph line two"),
            (72.0, 640.0, "Second paragraph"),
        ],
        12.0,
    );
    let (doc, _) = convert_to_document(&document(&[content]), &sequential()).unwrap();
    let texts: Vec<String> = doc.paragraphs.iter().map(|p| p.plain_text()).collect();
    assert_eq!(
        texts,
        vec![
            "First paragraph line one first paragraph line two".to_string(),
            "Second paragraph".to_string()
        ]
    );
}

#[test]
fn test_centered_heading() {
    // "Title" in Helvetica-Bold 20pt is about 41pt wide.
    let content = format!(
        "BT /F2 20 Tf 1 0 0 1 285 720 Tm (Title) Tj ET\n{}",
        body_block()
    );
    let (doc, _) = convert_to_document(&document(&[content]), &sequential()).unwrap();
    assert_eq!(doc.paragraph_count(), 2);
    let heading = &doc.paragraphs[0];
    assert_eq!(heading.plain_text(), "Title");
    assert_eq!(heading.alignment, Alignment::Center);
    assert!(heading.runs[0].bold);
    assert_eq!(heading.runs[0].font_size_pt, 20.0);
}

#[test]
fn test_metadata_from_info_dictionary() {
    let pdf = document_with(
        &[TestPage::new(body_block())],
        Some("<< /Title (Quarterly Report) /Author (Finance Team) /CreationDate (D:20240102030405Z) >>"),
    );
    let (doc, _) = convert_to_document(&pdf, &sequential()).unwrap();
    assert_eq!(doc.metadata.title.as_deref(), Some("Quarterly Report"));
    assert_eq!(doc.metadata.author.as_deref(), Some("Finance Team"));
    assert_eq!(doc.metadata.page_count, 1);
    assert_eq!(
        doc.metadata.created.map(|d| d.to_rfc3339()),
        Some("2024-01-02T03:04:05+00:00".to_string())
    );
    let size = doc.page_size.unwrap();
    assert_eq!((size.width, size.height), (612.0, 792.0));
}

#[test]
fn test_conversion_is_deterministic() {
    let pages: Vec<String> = (0..4).map(|_| body_block()).collect();
    let pdf = document(&pages);
    let first = convert_pdf_to_docx(&pdf, &ConversionOptions::default()).unwrap();
    let second = convert_pdf_to_docx(&pdf, &ConversionOptions::default()).unwrap();
    let third = convert_pdf_to_docx(&pdf, &sequential()).unwrap();
    assert_eq!(first, second);
    assert_eq!(first, third);
}

#[test]
fn test_page_order_with_parallel_workers() {
    let pages: Vec<String> = (1..=12)
        .map(|n| text_content(&[(72.0, 700.0, &format!("Page number {}", n))], 12.0))
        .collect();
    let pdf = document(&pages);
    let options = ConversionOptions::new().with_max_workers(3);
    let (doc, diagnostics) = convert_to_document(&pdf, &options).unwrap();

    assert!(diagnostics.is_empty());
    let texts: Vec<String> = doc.paragraphs.iter().map(|p| p.plain_text()).collect();
    let expected: Vec<String> = (1..=12).map(|n| format!("Page number {}", n)).collect();
    assert_eq!(texts, expected);
    assert!(!doc.paragraphs[0].page_break_before);
    assert!(doc.paragraphs[1..].iter().all(|p| p.page_break_before));
}

#[test]
fn test_damaged_startxref_is_recovered() {
    let pdf = document(&[body_block()]);
    let (clean, clean_diagnostics) = convert_to_document(&pdf, &sequential()).unwrap();
    let (recovered, diagnostics) = convert_to_document(&corrupt_startxref(&pdf), &sequential()).unwrap();

    assert!(clean_diagnostics.is_empty());
    assert_eq!(recovered.paragraphs, clean.paragraphs);
    assert!(diagnostics.iter().any(|d| d.kind == DiagnosticKind::RecoveredXref));
}

#[test]
fn test_missing_xref_is_recovered() {
    let pdf = document(&[body_block()]);
    let (clean, _) = convert_to_document(&pdf, &sequential()).unwrap();
    let (recovered, diagnostics) = convert_to_document(&strip_xref(&pdf), &sequential()).unwrap();

    assert_eq!(recovered.paragraphs, clean.paragraphs);
    assert!(diagnostics.iter().any(|d| d.kind == DiagnosticKind::RecoveredXref));
}

fn with_bogus_page() -> Vec<u8> {
    document_with(
        &[
            TestPage::new(text_content(&[(72.0, 700.0, "Readable first page")], 12.0)),
            TestPage::new(b"garbage".to_vec()).with_stream_entries("/Filter /BogusDecode"),
            TestPage::new(text_content(&[(72.0, 700.0, "Readable last page")], 12.0)),
        ],
        None,
    )
}

#[test]
fn test_unsupported_filter_page_is_skipped() {
    let output = convert_pdf_to_docx_with_diagnostics(&with_bogus_page(), &sequential()).unwrap();
    assert_eq!(output.page_count, 3);
    assert_eq!(output.paragraph_count, 2);

    let skipped: Vec<_> = output
        .diagnostics
        .iter()
        .filter(|d| d.kind == DiagnosticKind::PageSkipped)
        .collect();
    assert_eq!(skipped.len(), 1);
    assert_eq!(skipped[0].page, Some(2));
    assert!(skipped[0].message.contains("BogusDecode"));
}

#[test]
fn test_unsupported_filter_fails_in_strict_mode() {
    let options = sequential().with_skip_unparsable_pages(false);
    let err = convert_pdf_to_docx(&with_bogus_page(), &options).unwrap_err();
    match &err {
        Error::PageFailed { page, source } => {
            assert_eq!(*page, 2);
            assert_eq!(source, &ParseError::UnsupportedFilter("BogusDecode".to_string()));
        }
        other => panic!("expected PageFailed, got {:?}", other),
    }
    assert_eq!(err.kind(), "UnsupportedFilter");
}

#[test]
fn test_zero_pages_gives_empty_document() {
    let output = convert_pdf_to_docx_with_diagnostics(&document(&[]), &sequential()).unwrap();
    assert_eq!(output.page_count, 0);
    assert_eq!(output.paragraph_count, 0);
    assert!(output
        .diagnostics
        .iter()
        .any(|d| d.kind == DiagnosticKind::EmptyDocument));

    let body = common::zip_entry(&output.bytes, "word/document.xml");
    assert_eq!(common::paragraph_texts(&body), vec![String::new()]);
}

#[test]
fn test_page_without_text_adds_no_paragraphs() {
    let pages = vec![
        text_content(&[(72.0, 700.0, "Before")], 12.0),
        "0 0 m 100 100 l S".to_string(),
        text_content(&[(72.0, 700.0, "After")], 12.0),
    ];
    let (doc, _) = convert_to_document(&document(&pages), &sequential()).unwrap();
    assert_eq!(doc.paragraph_count(), 2);
    assert!(doc.paragraphs[1].page_break_before);
}

#[test]
fn test_cancelled_before_start() {
    let token = CancelToken::new();
    token.cancel();
    let options = ConversionOptions::new().with_cancel_token(token);
    let err = convert_pdf_to_docx(&document(&[body_block()]), &options).unwrap_err();
    assert!(matches!(err, Error::Cancelled));
    assert_eq!(err.kind(), "Cancelled");
}

#[test]
fn test_not_a_pdf() {
    let err = convert_pdf_to_docx(b"PK\x03\x04 not a pdf", &ConversionOptions::default()).unwrap_err();
    assert!(matches!(err, Error::Parse(ParseError::MalformedHeader)));
}

#[test]
fn test_unsupported_encryption_is_rejected() {
    let mut pdf = PdfBuilder::new();
    let catalog = pdf.reserve();
    let tree = pdf.add("<< /Type /Pages /Kids [] /Count 0 >>");
    pdf.set(catalog, format!("<< /Type /Catalog /Pages {} 0 R >>", tree));
    pdf.trailer_entries(
        "/Encrypt << /Filter /Standard /V 5 /R 6 /Length 256 /O <00> /U <00> /P -4 >> /ID [<00112233> <00112233>]",
    );
    let err = convert_pdf_to_docx(&pdf.finish(catalog), &ConversionOptions::default()).unwrap_err();
    assert!(matches!(err, Error::Parse(ParseError::EncryptedDocument)));
    assert_eq!(err.to_payload().kind, "EncryptedDocument");
}

#[test]
fn test_compressed_content_stream() {
    use flate2::write::ZlibEncoder;
    use flate2::Compression;
    use std::io::Write;

    let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(body_block().as_bytes()).unwrap();
    let compressed = encoder.finish().unwrap();

    let pdf = document_with(
        &[TestPage::new(compressed).with_stream_entries("/Filter /FlateDecode")],
        None,
    );
    let (doc, _) = convert_to_document(&pdf, &sequential()).unwrap();
    assert_eq!(doc.paragraph_count(), 1);
    assert!(doc.plain_text().starts_with("The quick brown fox"));
}

#[test]
fn test_crop_box_origin_is_normalised() {
    let content = text_content(&[(172.0, 800.0, "Shifted media box")], 12.0);
    let pdf = document_with(
        &[TestPage::new(content).with_media_box([100.0, 100.0, 712.0, 892.0])],
        None,
    );
    let (doc, _) = convert_to_document(&pdf, &sequential()).unwrap();
    assert_eq!(doc.plain_text(), "Shifted media box");
    assert_eq!(doc.paragraphs[0].alignment, Alignment::Left);
    let size = doc.page_size.unwrap();
    assert_eq!((size.width, size.height), (612.0, 792.0));
}

#[test]
fn test_run_far_off_page_does_not_abort() {
    let far = format!(
        "{}BT /F1 12 Tf 1 0 0 1 1000000000000 700 Tm (gamma) Tj ET\n",
        text_content(&[(72.0, 700.0, "alpha"), (72.0, 686.0, "beta")], 12.0)
    );
    let pages = vec![text_content(&[(72.0, 700.0, "First page")], 12.0), far];
    let output = convert_pdf_to_docx_with_diagnostics(&document(&pages), &ConversionOptions::default()).unwrap();
    assert_eq!(output.page_count, 2);

    let body = common::zip_entry(&output.bytes, "word/document.xml");
    let texts = common::paragraph_texts(&body);
    assert_eq!(texts[0], "First page");
    assert!(texts.iter().any(|t| t.contains("gamma")));
}

#[test]
fn test_incremental_update_replaces_page_content() {
    let original = document(&[text_content(&[(72.0, 700.0, "Old text")], 12.0)]);
    // Objects: catalog 1, page tree 2, fonts 3 and 4, content stream 5, page 6.
    let replacement = text_content(&[(72.0, 700.0, "New text")], 12.0);
    let pdf = append_update(&original, 1, 7, &[(5, stream_body(replacement.as_bytes()))]);

    let (doc, diagnostics) = convert_to_document(&pdf, &sequential()).unwrap();
    assert!(diagnostics.is_empty(), "{:?}", diagnostics);
    assert_eq!(doc.plain_text(), "New text");
}
