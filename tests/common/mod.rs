//! Synthetic PDF construction shared by the integration tests.

#![allow(dead_code)]

use std::io::{Cursor, Read};

/// Helvetica with WinAnsi encoding.
pub const HELVETICA: &str = "<< /Type /Font /Subtype /Type1 /BaseFont /Helvetica /Encoding /WinAnsiEncoding >>";

/// Helvetica Bold with WinAnsi encoding.
pub const HELVETICA_BOLD: &str =
    "<< /Type /Font /Subtype /Type1 /BaseFont /Helvetica-Bold /Encoding /WinAnsiEncoding >>";

/// Writes objects in order and a classic cross-reference table with
/// correct offsets.
#[derive(Debug, Default)]
pub struct PdfBuilder {
    objects: Vec<Option<Vec<u8>>>,
    info: Option<u32>,
    trailer_extra: String,
}

impl PdfBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reserve an object number to be filled in later with [`set`](Self::set).
    pub fn reserve(&mut self) -> u32 {
        self.objects.push(None);
        self.objects.len() as u32
    }

    pub fn set(&mut self, num: u32, body: impl AsRef<[u8]>) {
        self.objects[num as usize - 1] = Some(body.as_ref().to_vec());
    }

    pub fn add(&mut self, body: impl AsRef<[u8]>) -> u32 {
        let num = self.reserve();
        self.set(num, body);
        num
    }

    /// Add a stream; `/Length` is filled in.
    pub fn add_stream(&mut self, dict_entries: &str, data: &[u8]) -> u32 {
        let mut body = format!("<< {} /Length {} >>\nstream\n", dict_entries, data.len()).into_bytes();
        body.extend_from_slice(data);
        body.extend_from_slice(b"\nendstream");
        self.add(body)
    }

    pub fn info(&mut self, num: u32) {
        self.info = Some(num);
    }

    /// Extra trailer entries, e.g. `/Encrypt << ... >>`.
    pub fn trailer_entries(&mut self, entries: &str) {
        self.trailer_extra = entries.to_string();
    }

    pub fn finish(&self, root: u32) -> Vec<u8> {
        let mut pdf = b"%PDF-1.4\n%\xE2\xE3\xCF\xD3\n".to_vec();
        let mut offsets = Vec::with_capacity(self.objects.len());
        for (i, body) in self.objects.iter().enumerate() {
            offsets.push(pdf.len());
            pdf.extend_from_slice(format!("{} 0 obj\n", i + 1).as_bytes());
            pdf.extend_from_slice(body.as_deref().unwrap_or(b"null"));
            pdf.extend_from_slice(b"\nendobj\n");
        }

        let xref = pdf.len();
        pdf.extend_from_slice(format!("xref\n0 {}\n0000000000 65535 f \n", self.objects.len() + 1).as_bytes());
        for offset in offsets {
            pdf.extend_from_slice(format!("{:010} 00000 n \n", offset).as_bytes());
        }
        let info = self.info.map(|n| format!(" /Info {} 0 R", n)).unwrap_or_default();
        pdf.extend_from_slice(
            format!(
                "trailer\n<< /Size {} /Root {} 0 R{} {} >>\nstartxref\n{}\n%%EOF\n",
                self.objects.len() + 1,
                root,
                info,
                self.trailer_extra,
                xref
            )
            .as_bytes(),
        );
        pdf
    }
}

/// One page's content stream and extra stream dictionary entries.
#[derive(Debug, Clone, Default)]
pub struct TestPage {
    pub content: Vec<u8>,
    pub stream_entries: String,
    pub media_box: Option<[f64; 4]>,
}

impl TestPage {
    pub fn new(content: impl Into<Vec<u8>>) -> Self {
        Self {
            content: content.into(),
            ..Default::default()
        }
    }

    pub fn with_stream_entries(mut self, entries: &str) -> Self {
        self.stream_entries = entries.to_string();
        self
    }

    pub fn with_media_box(mut self, media_box: [f64; 4]) -> Self {
        self.media_box = Some(media_box);
        self
    }
}

/// Build a document whose pages share `/F1` (Helvetica) and `/F2`
/// (Helvetica-Bold). `info` is the body of an `/Info` dictionary.
pub fn document_with(pages: &[TestPage], info: Option<&str>) -> Vec<u8> {
    let mut pdf = PdfBuilder::new();
    let catalog = pdf.reserve();
    let tree = pdf.reserve();
    let regular = pdf.add(HELVETICA);
    let bold = pdf.add(HELVETICA_BOLD);

    let mut kids = Vec::new();
    for page in pages {
        let content = pdf.add_stream(&page.stream_entries, &page.content);
        let [x0, y0, x1, y1] = page.media_box.unwrap_or([0.0, 0.0, 612.0, 792.0]);
        let page = pdf.add(format!(
            "<< /Type /Page /Parent {} 0 R /MediaBox [{} {} {} {}] /Resources << /Font << /F1 {} 0 R /F2 {} 0 R >> >> /Contents {} 0 R >>",
            tree, x0, y0, x1, y1, regular, bold, content
        ));
        kids.push(format!("{} 0 R", page));
    }
    pdf.set(
        tree,
        format!("<< /Type /Pages /Kids [{}] /Count {} >>", kids.join(" "), kids.len()),
    );
    pdf.set(catalog, format!("<< /Type /Catalog /Pages {} 0 R >>", tree));

    if let Some(info) = info {
        let num = pdf.add(info);
        pdf.info(num);
    }
    pdf.finish(catalog)
}

/// Build a document from plain content streams.
pub fn document(pages: &[String]) -> Vec<u8> {
    let test_pages: Vec<TestPage> = pages.iter().map(|c| TestPage::new(c.as_bytes())).collect();
    document_with(&test_pages, None)
}

/// A line of text: x, baseline y, text.
pub type TextLine<'a> = (f64, f64, &'a str);

/// Content stream drawing each line with `/F1` at `size`.
pub fn text_content(lines: &[TextLine<'_>], size: f64) -> String {
    styled_content(lines, "F1", size)
}

/// Content stream drawing each line with `font` at `size`.
pub fn styled_content(lines: &[TextLine<'_>], font: &str, size: f64) -> String {
    let mut content = String::from("BT\n");
    content.push_str(&format!("/{} {} Tf\n", font, size));
    for (x, y, text) in lines {
        content.push_str(&format!("1 0 0 1 {} {} Tm ({}) Tj\n", x, y, escape_literal(text)));
    }
    content.push_str("ET\n");
    content
}

fn escape_literal(text: &str) -> String {
    text.replace('\\', "\\\\").replace('(', "\\(").replace(')', "\\)")
}

/// Body of a stream object holding `data`.
pub fn stream_body(data: &[u8]) -> Vec<u8> {
    let mut body = format!("<< /Length {} >>\nstream\n", data.len()).into_bytes();
    body.extend_from_slice(data);
    body.extend_from_slice(b"\nendstream");
    body
}

/// Append an incremental update redefining `objects`, with a new
/// cross-reference section chained to the previous one by `/Prev`.
pub fn append_update(pdf: &[u8], root: u32, size: u32, objects: &[(u32, Vec<u8>)]) -> Vec<u8> {
    let prev = {
        let pos = rfind(pdf, b"startxref").expect("startxref present") + b"startxref".len();
        let tail = String::from_utf8_lossy(&pdf[pos..]);
        tail.split_whitespace().next().and_then(|s| s.parse::<usize>().ok()).expect("startxref offset")
    };

    let mut out = pdf.to_vec();
    let mut rows = String::new();
    for (num, body) in objects {
        rows.push_str(&format!("{} 1\n{:010} 00000 n \n", num, out.len()));
        out.extend_from_slice(format!("{} 0 obj\n", num).as_bytes());
        out.extend_from_slice(body);
        out.extend_from_slice(b"\nendobj\n");
    }
    let xref = out.len();
    out.extend_from_slice(
        format!(
            "xref\n{}trailer\n<< /Size {} /Root {} 0 R /Prev {} >>\nstartxref\n{}\n%%EOF\n",
            rows, size, root, prev, xref
        )
        .as_bytes(),
    );
    out
}

/// Point `startxref` at a bogus offset.
pub fn corrupt_startxref(pdf: &[u8]) -> Vec<u8> {
    let pos = rfind(pdf, b"startxref").expect("startxref present");
    let mut out = pdf[..pos].to_vec();
    out.extend_from_slice(b"startxref\n999999\n%%EOF\n");
    out
}

/// Drop the cross-reference table, trailer and `startxref`.
pub fn strip_xref(pdf: &[u8]) -> Vec<u8> {
    let pos = rfind(pdf, b"xref\n0 ").expect("xref present");
    let mut out = pdf[..pos].to_vec();
    out.extend_from_slice(b"%%EOF\n");
    out
}

fn rfind(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack.windows(needle.len()).rposition(|w| w == needle)
}

/// Read one entry of a zip archive as UTF-8.
pub fn zip_entry(docx: &[u8], name: &str) -> String {
    let mut archive = zip::ZipArchive::new(Cursor::new(docx)).expect("valid zip");
    let mut file = archive.by_name(name).expect("entry present");
    let mut text = String::new();
    file.read_to_string(&mut text).expect("UTF-8 entry");
    text
}

/// Names of all entries in a zip archive, in archive order.
pub fn zip_names(docx: &[u8]) -> Vec<String> {
    let mut archive = zip::ZipArchive::new(Cursor::new(docx)).expect("valid zip");
    (0..archive.len())
        .map(|i| archive.by_index(i).expect("entry").name().to_string())
        .collect()
}

/// Text of all `w:t` elements of each `w:p`, using a real XML parser.
pub fn paragraph_texts(document_xml: &str) -> Vec<String> {
    use quick_xml::events::Event;
    use quick_xml::Reader;

    let mut reader = Reader::from_str(document_xml);
    let mut paragraphs = Vec::new();
    let mut in_text = false;
    loop {
        match reader.read_event().expect("well-formed XML") {
            Event::Start(e) if e.name().as_ref() == b"w:p" => paragraphs.push(String::new()),
            Event::Empty(e) if e.name().as_ref() == b"w:p" => paragraphs.push(String::new()),
            Event::Start(e) if e.name().as_ref() == b"w:t" => in_text = true,
            Event::End(e) if e.name().as_ref() == b"w:t" => in_text = false,
            Event::Text(t) if in_text => {
                let text = t.unescape().expect("valid escapes");
                if let Some(last) = paragraphs.last_mut() {
                    last.push_str(&text);
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }
    paragraphs
}
