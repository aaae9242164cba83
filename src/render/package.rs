//! OOXML package assembly and zip emission.

use std::collections::{BTreeMap, BTreeSet};
use std::io::{Cursor, Write};

use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, DateTime, ZipWriter};

use super::options::Compression;
use crate::error::SerializeError;

pub const CONTENT_TYPES_PART: &str = "[Content_Types].xml";
pub const ROOT_RELS_PART: &str = "_rels/.rels";
pub const DOCUMENT_PART: &str = "word/document.xml";
pub const DOCUMENT_RELS_PART: &str = "word/_rels/document.xml.rels";

/// Parts every word-processing package must contain.
pub const REQUIRED_PARTS: [&str; 4] = [CONTENT_TYPES_PART, ROOT_RELS_PART, DOCUMENT_PART, DOCUMENT_RELS_PART];

/// One `<Relationship>` of a rels part.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Relationship {
    pub id: String,
    pub target: String,
    pub external: bool,
}

/// Archive path to content. Iteration order is lexicographic by path.
#[derive(Debug, Clone, Default)]
pub struct OoxmlPackage {
    parts: BTreeMap<String, Vec<u8>>,
}

impl OoxmlPackage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace a part.
    pub fn insert(&mut self, path: impl Into<String>, content: impl Into<Vec<u8>>) {
        self.parts.insert(path.into(), content.into());
    }

    pub fn get(&self, path: &str) -> Option<&[u8]> {
        self.parts.get(path).map(Vec::as_slice)
    }

    pub fn contains(&self, path: &str) -> bool {
        self.parts.contains_key(path)
    }

    pub fn paths(&self) -> impl Iterator<Item = &str> {
        self.parts.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.parts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.parts.is_empty()
    }

    fn text(&self, path: &str) -> Result<&str, SerializeError> {
        let bytes = self
            .get(path)
            .ok_or_else(|| SerializeError::InvalidPackage(format!("missing part {}", path)))?;
        std::str::from_utf8(bytes)
            .map_err(|_| SerializeError::InvalidPackage(format!("part {} is not UTF-8", path)))
    }

    /// Check that the package is complete and internally consistent.
    ///
    /// Required parts must exist, every relationship id used by the main
    /// document must be declared, internal relationship targets must exist,
    /// and every part must have a content type.
    pub fn validate(&self) -> Result<(), SerializeError> {
        for part in REQUIRED_PARTS {
            if !self.contains(part) {
                return Err(SerializeError::InvalidPackage(format!("missing part {}", part)));
            }
        }

        let rels_paths: Vec<&str> = self.paths().filter(|p| p.ends_with(".rels")).collect();
        for rels_path in rels_paths {
            for rel in parse_relationships(self.text(rels_path)?)? {
                if rel.external {
                    continue;
                }
                let target = resolve_target(rels_path, &rel.target);
                if !self.contains(&target) {
                    return Err(SerializeError::InvalidPackage(format!(
                        "relationship {} in {} targets missing part {}",
                        rel.id, rels_path, target
                    )));
                }
            }
        }

        let declared: BTreeSet<String> = parse_relationships(self.text(DOCUMENT_RELS_PART)?)?
            .into_iter()
            .map(|rel| rel.id)
            .collect();
        let mut undeclared = None;
        visit_elements(self.text(DOCUMENT_PART)?, |element| {
            for (key, value) in attributes(element) {
                let is_reference = matches!(key.as_str(), "r:id" | "r:embed" | "r:link");
                if is_reference && !declared.contains(&value) && undeclared.is_none() {
                    undeclared = Some(value);
                }
            }
        })?;
        if let Some(id) = undeclared {
            return Err(SerializeError::InvalidPackage(format!(
                "{} references undeclared relationship {}",
                DOCUMENT_PART, id
            )));
        }

        let mut overrides = BTreeSet::new();
        let mut defaults = BTreeSet::new();
        visit_elements(self.text(CONTENT_TYPES_PART)?, |element| {
            for (key, value) in attributes(element) {
                match (element.local_name().as_ref(), key.as_str()) {
                    (b"Override", "PartName") => {
                        overrides.insert(value.trim_start_matches('/').to_string());
                    }
                    (b"Default", "Extension") => {
                        defaults.insert(value.to_ascii_lowercase());
                    }
                    _ => {}
                }
            }
        })?;
        for path in self.paths().filter(|p| *p != CONTENT_TYPES_PART) {
            let extension = path.rsplit('.').next().unwrap_or_default().to_ascii_lowercase();
            if !overrides.contains(path) && !defaults.contains(&extension) {
                return Err(SerializeError::InvalidPackage(format!("no content type for {}", path)));
            }
        }

        Ok(())
    }

    /// Validate, then write the zip archive.
    ///
    /// Entries are written in path order with a fixed timestamp and fixed
    /// permissions, so equal packages produce equal bytes.
    pub fn to_bytes(&self, compression: Compression) -> Result<Vec<u8>, SerializeError> {
        self.validate()?;

        let method = match compression {
            Compression::Deflate => CompressionMethod::Deflated,
            Compression::Stored => CompressionMethod::Stored,
        };
        let options = SimpleFileOptions::default()
            .compression_method(method)
            .last_modified_time(DateTime::default())
            .unix_permissions(0o644);

        let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
        for (path, content) in &self.parts {
            zip.start_file(path.as_str(), options)?;
            zip.write_all(content)?;
        }
        let cursor = zip.finish()?;
        Ok(cursor.into_inner())
    }
}

/// Read the relationships declared in a rels part.
pub fn parse_relationships(xml: &str) -> Result<Vec<Relationship>, SerializeError> {
    let mut relationships = Vec::new();
    visit_elements(xml, |element| {
        if element.local_name().as_ref() != b"Relationship" {
            return;
        }
        let mut id = None;
        let mut target = None;
        let mut external = false;
        for (key, value) in attributes(element) {
            match key.as_str() {
                "Id" => id = Some(value),
                "Target" => target = Some(value),
                "TargetMode" => external = value == "External",
                _ => {}
            }
        }
        if let (Some(id), Some(target)) = (id, target) {
            relationships.push(Relationship { id, target, external });
        }
    })?;
    Ok(relationships)
}

/// Call `f` on every start and empty element of `xml`.
fn visit_elements(xml: &str, mut f: impl FnMut(&BytesStart<'_>)) -> Result<(), SerializeError> {
    let mut reader = Reader::from_str(xml);
    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) | Ok(Event::Empty(e)) => f(&e),
            Ok(Event::Eof) => return Ok(()),
            Ok(_) => {}
            Err(e) => {
                return Err(SerializeError::InvalidPackage(format!(
                    "malformed XML at byte {}: {}",
                    reader.buffer_position(),
                    e
                )))
            }
        }
    }
}

/// Qualified names and unescaped values of an element's attributes.
///
/// Attributes that fail to parse are skipped.
fn attributes(element: &BytesStart<'_>) -> Vec<(String, String)> {
    element
        .attributes()
        .filter_map(Result::ok)
        .filter_map(|attr| {
            let key = String::from_utf8_lossy(attr.key.as_ref()).into_owned();
            let value = attr.unescape_value().ok()?.into_owned();
            Some((key, value))
        })
        .collect()
}

/// Resolve a relationship target against the part that owns `rels_path`.
fn resolve_target(rels_path: &str, target: &str) -> String {
    if let Some(absolute) = target.strip_prefix('/') {
        return absolute.to_string();
    }
    // "word/_rels/document.xml.rels" is relative to "word/".
    let base = rels_path
        .rsplit_once("_rels/")
        .map(|(dir, _)| dir)
        .unwrap_or_default();

    let mut segments: Vec<&str> = base.split('/').filter(|s| !s.is_empty()).collect();
    for segment in target.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                segments.pop();
            }
            other => segments.push(other),
        }
    }
    segments.join("/")
}
