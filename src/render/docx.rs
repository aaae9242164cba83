//! DOCX rendering for the intermediate document.

use std::fmt::Write as _;

use super::options::RenderOptions;
use super::package::{
    OoxmlPackage, CONTENT_TYPES_PART, DOCUMENT_PART, DOCUMENT_RELS_PART, ROOT_RELS_PART,
};
use super::xml::escape;
use crate::error::SerializeError;
use crate::model::{Alignment, Document, Metadata, PageSize, Paragraph, Run};

/// MIME type of a DOCX file.
pub const DOCX_MIME_TYPE: &str = "application/vnd.openxmlformats-officedocument.wordprocessingml.document";

const XML_DECLARATION: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>"#;
const NS_MAIN: &str = "http://schemas.openxmlformats.org/wordprocessingml/2006/main";
const NS_RELATIONSHIPS: &str = "http://schemas.openxmlformats.org/officeDocument/2006/relationships";
const NS_PACKAGE_RELATIONSHIPS: &str = "http://schemas.openxmlformats.org/package/2006/relationships";

const REL_OFFICE_DOCUMENT: &str =
    "http://schemas.openxmlformats.org/officeDocument/2006/relationships/officeDocument";
const REL_CORE_PROPERTIES: &str =
    "http://schemas.openxmlformats.org/package/2006/relationships/metadata/core-properties";
const REL_EXTENDED_PROPERTIES: &str =
    "http://schemas.openxmlformats.org/officeDocument/2006/relationships/extended-properties";
const REL_STYLES: &str = "http://schemas.openxmlformats.org/officeDocument/2006/relationships/styles";
const REL_SETTINGS: &str = "http://schemas.openxmlformats.org/officeDocument/2006/relationships/settings";

const CT_DOCUMENT: &str = "application/vnd.openxmlformats-officedocument.wordprocessingml.document.main+xml";
const CT_STYLES: &str = "application/vnd.openxmlformats-officedocument.wordprocessingml.styles+xml";
const CT_SETTINGS: &str = "application/vnd.openxmlformats-officedocument.wordprocessingml.settings+xml";
const CT_CORE: &str = "application/vnd.openxmlformats-package.core-properties+xml";
const CT_APP: &str = "application/vnd.openxmlformats-officedocument.extended-properties+xml";

const STYLES_PART: &str = "word/styles.xml";
const SETTINGS_PART: &str = "word/settings.xml";
const CORE_PART: &str = "docProps/core.xml";
const APP_PART: &str = "docProps/app.xml";

/// One inch page margins, in twentieths of a point.
const PAGE_MARGIN_TWIPS: i64 = 1440;

/// OOXML caps `w:sz` at 1638 points.
const MAX_HALF_POINTS: i64 = 3276;

/// Page size limits of `w:pgSz`, in twips.
const MIN_PAGE_TWIPS: i64 = 1440;
const MAX_PAGE_TWIPS: i64 = 31680;

/// Convert a document to DOCX bytes.
///
/// An empty document still yields an openable package holding a single
/// empty paragraph.
pub fn to_docx(doc: &Document, options: &RenderOptions) -> Result<Vec<u8>, SerializeError> {
    build_package(doc, options)?.to_bytes(options.compression)
}

/// Assemble and validate the package parts without zipping them.
pub fn build_package(doc: &Document, options: &RenderOptions) -> Result<OoxmlPackage, SerializeError> {
    if doc.is_empty() {
        log::warn!("{}; writing a single empty paragraph", SerializeError::EmptyDocument);
    }

    let mut package = OoxmlPackage::new();
    package.insert(DOCUMENT_PART, document_xml(doc));
    package.insert(STYLES_PART, styles_xml(&options.default_font));
    package.insert(SETTINGS_PART, settings_xml());
    package.insert(
        DOCUMENT_RELS_PART,
        relationships_xml(&[("rId1", REL_STYLES, "styles.xml"), ("rId2", REL_SETTINGS, "settings.xml")]),
    );

    let mut root_rels = vec![("rId1", REL_OFFICE_DOCUMENT, DOCUMENT_PART)];
    let mut overrides = vec![
        (DOCUMENT_PART, CT_DOCUMENT),
        (STYLES_PART, CT_STYLES),
        (SETTINGS_PART, CT_SETTINGS),
    ];
    if options.include_core_properties {
        package.insert(CORE_PART, core_xml(&doc.metadata));
        package.insert(APP_PART, app_xml(doc));
        root_rels.push(("rId2", REL_CORE_PROPERTIES, CORE_PART));
        root_rels.push(("rId3", REL_EXTENDED_PROPERTIES, APP_PART));
        overrides.push((CORE_PART, CT_CORE));
        overrides.push((APP_PART, CT_APP));
    }
    package.insert(ROOT_RELS_PART, relationships_xml(&root_rels));
    package.insert(CONTENT_TYPES_PART, content_types_xml(&overrides));

    package.validate()?;
    Ok(package)
}

fn document_xml(doc: &Document) -> String {
    let mut xml = String::with_capacity(4096 + doc.paragraphs.len() * 256);
    xml.push_str(XML_DECLARATION);
    let _ = write!(
        xml,
        r#"<w:document xmlns:w="{}" xmlns:r="{}"><w:body>"#,
        NS_MAIN, NS_RELATIONSHIPS
    );

    if doc.paragraphs.is_empty() {
        xml.push_str("<w:p/>");
    }
    for paragraph in &doc.paragraphs {
        write_paragraph(&mut xml, paragraph);
    }

    write_section(&mut xml, doc.page_size.unwrap_or_else(PageSize::letter));
    xml.push_str("</w:body></w:document>");
    xml
}

fn write_paragraph(xml: &mut String, paragraph: &Paragraph) {
    xml.push_str("<w:p>");
    let justification = match paragraph.alignment {
        Alignment::Left => None,
        Alignment::Center => Some("center"),
        Alignment::Right => Some("right"),
    };
    if let Some(value) = justification {
        let _ = write!(xml, r#"<w:pPr><w:jc w:val="{}"/></w:pPr>"#, value);
    }
    if paragraph.page_break_before {
        xml.push_str(r#"<w:r><w:br w:type="page"/></w:r>"#);
    }
    for run in &paragraph.runs {
        write_run(xml, run);
    }
    xml.push_str("</w:p>");
}

fn write_run(xml: &mut String, run: &Run) {
    xml.push_str("<w:r><w:rPr>");
    if run.bold {
        xml.push_str("<w:b/><w:bCs/>");
    }
    if run.italic {
        xml.push_str("<w:i/><w:iCs/>");
    }
    let half_points = half_points(run.font_size_pt);
    let _ = write!(xml, r#"<w:sz w:val="{0}"/><w:szCs w:val="{0}"/>"#, half_points);
    xml.push_str("</w:rPr>");

    // Tabs and line feeds have their own elements.
    for (i, segment) in run.text.split('\n').enumerate() {
        if i > 0 {
            xml.push_str("<w:br/>");
        }
        for (j, piece) in segment.split('\t').enumerate() {
            if j > 0 {
                xml.push_str("<w:tab/>");
            }
            if !piece.is_empty() {
                let _ = write!(xml, r#"<w:t xml:space="preserve">{}</w:t>"#, escape(piece));
            }
        }
    }
    xml.push_str("</w:r>");
}

/// Font size in half points, clamped to the range OOXML accepts.
pub fn half_points(points: f64) -> i64 {
    ((points * 2.0).round() as i64).clamp(1, MAX_HALF_POINTS)
}

/// Length in twentieths of a point.
pub fn twips(points: f64) -> i64 {
    (points * 20.0).round() as i64
}

fn write_section(xml: &mut String, size: PageSize) {
    let width = twips(size.width).clamp(MIN_PAGE_TWIPS, MAX_PAGE_TWIPS);
    let height = twips(size.height).clamp(MIN_PAGE_TWIPS, MAX_PAGE_TWIPS);
    let orient = if size.is_landscape() { r#" w:orient="landscape""# } else { "" };
    // Narrow pages get proportionally smaller margins.
    let margin = PAGE_MARGIN_TWIPS.min(width.min(height) / 8);

    let _ = write!(
        xml,
        r#"<w:sectPr><w:pgSz w:w="{}" w:h="{}"{}/><w:pgMar w:top="{m}" w:right="{m}" w:bottom="{m}" w:left="{m}" w:header="720" w:footer="720" w:gutter="0"/></w:sectPr>"#,
        width,
        height,
        orient,
        m = margin
    );
}

fn styles_xml(font: &str) -> String {
    let font = escape(font);
    format!(
        r#"{decl}<w:styles xmlns:w="{ns}"><w:docDefaults><w:rPrDefault><w:rPr><w:rFonts w:ascii="{font}" w:hAnsi="{font}" w:eastAsia="{font}" w:cs="{font}"/><w:sz w:val="22"/><w:szCs w:val="22"/><w:lang w:val="en-US"/></w:rPr></w:rPrDefault><w:pPrDefault><w:pPr><w:spacing w:after="160" w:line="259" w:lineRule="auto"/></w:pPr></w:pPrDefault></w:docDefaults><w:style w:type="paragraph" w:default="1" w:styleId="Normal"><w:name w:val="Normal"/><w:qFormat/></w:style></w:styles>"#,
        decl = XML_DECLARATION,
        ns = NS_MAIN,
        font = font
    )
}

fn settings_xml() -> String {
    format!(
        r#"{}<w:settings xmlns:w="{}"><w:defaultTabStop w:val="720"/><w:compat><w:compatSetting w:name="compatibilityMode" w:uri="http://schemas.microsoft.com/office/word" w:val="15"/></w:compat></w:settings>"#,
        XML_DECLARATION, NS_MAIN
    )
}

fn relationships_xml(relationships: &[(&str, &str, &str)]) -> String {
    let mut xml = String::from(XML_DECLARATION);
    let _ = write!(xml, r#"<Relationships xmlns="{}">"#, NS_PACKAGE_RELATIONSHIPS);
    for (id, kind, target) in relationships {
        let _ = write!(
            xml,
            r#"<Relationship Id="{}" Type="{}" Target="{}"/>"#,
            id,
            kind,
            escape(target)
        );
    }
    xml.push_str("</Relationships>");
    xml
}

fn content_types_xml(overrides: &[(&str, &str)]) -> String {
    let mut xml = String::from(XML_DECLARATION);
    xml.push_str(r#"<Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types">"#);
    xml.push_str(r#"<Default Extension="rels" ContentType="application/vnd.openxmlformats-package.relationships+xml"/>"#);
    xml.push_str(r#"<Default Extension="xml" ContentType="application/xml"/>"#);
    for (part, content_type) in overrides {
        let _ = write!(xml, r#"<Override PartName="/{}" ContentType="{}"/>"#, part, content_type);
    }
    xml.push_str("</Types>");
    xml
}

fn core_xml(metadata: &Metadata) -> String {
    let mut xml = String::from(XML_DECLARATION);
    xml.push_str(r#"<cp:coreProperties xmlns:cp="http://schemas.openxmlformats.org/package/2006/metadata/core-properties" xmlns:dc="http://purl.org/dc/elements/1.1/" xmlns:dcterms="http://purl.org/dc/terms/" xmlns:dcmitype="http://purl.org/dc/dcmitype/" xmlns:xsi="http://www.w3.org/2001/XMLSchema-instance">"#);

    let fields = [
        ("dc:title", &metadata.title),
        ("dc:subject", &metadata.subject),
        ("dc:creator", &metadata.author),
        ("cp:keywords", &metadata.keywords),
    ];
    for (tag, value) in fields {
        if let Some(value) = value {
            let _ = write!(xml, "<{0}>{1}</{0}>", tag, escape(value));
        }
    }
    // Timestamps come from the PDF only, never from the clock.
    let dates = [("dcterms:created", &metadata.created), ("dcterms:modified", &metadata.modified)];
    for (tag, value) in dates {
        if let Some(date) = value {
            let _ = write!(
                xml,
                r#"<{0} xsi:type="dcterms:W3CDTF">{1}</{0}>"#,
                tag,
                date.format("%Y-%m-%dT%H:%M:%SZ")
            );
        }
    }
    xml.push_str("</cp:coreProperties>");
    xml
}

fn app_xml(doc: &Document) -> String {
    let mut xml = String::from(XML_DECLARATION);
    xml.push_str(r#"<Properties xmlns="http://schemas.openxmlformats.org/officeDocument/2006/extended-properties" xmlns:vt="http://schemas.openxmlformats.org/officeDocument/2006/docPropsVTypes">"#);
    xml.push_str("<Application>pdf2docx</Application>");
    if doc.metadata.page_count > 0 {
        let _ = write!(xml, "<Pages>{}</Pages>", doc.metadata.page_count);
    }
    let _ = write!(xml, "<Paragraphs>{}</Paragraphs>", doc.paragraphs.len());
    xml.push_str("</Properties>");
    xml
}
