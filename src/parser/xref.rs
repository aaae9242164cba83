//! Cross-reference tables and streams, with a full-file scan as fallback.

use std::collections::{HashMap, HashSet};
use std::sync::OnceLock;

use regex::bytes::Regex;

use super::filter;
use super::lexer::{rfind_bytes, Lexer, Token};
use super::object::{Dict, ObjRef, PdfValue};
use super::syntax::ObjectParser;
use crate::error::ParseError;

/// Upper bound on `/Prev` hops; guards against pathological update chains.
const MAX_SECTIONS: usize = 1024;

/// Where an object lives.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum XrefEntry {
    Free,
    /// Byte offset of the `n g obj` header.
    InUse { offset: usize, gen: u16 },
    /// Object `index` inside object stream `container`.
    Compressed { container: u32, index: u32 },
}

/// The merged cross-reference map plus the effective trailer.
#[derive(Debug, Clone, Default)]
pub struct XrefTable {
    pub entries: HashMap<u32, XrefEntry>,
    pub trailer: Dict,
}

impl XrefTable {
    pub fn get(&self, num: u32) -> Option<XrefEntry> {
        self.entries.get(&num).copied()
    }

    /// Document catalog reference.
    pub fn root(&self) -> Option<ObjRef> {
        self.trailer.get("Root").and_then(PdfValue::as_reference)
    }

    fn insert_if_absent(&mut self, num: u32, entry: XrefEntry) {
        self.entries.entry(num).or_insert(entry);
    }
}

/// Result of loading the cross-reference structure.
#[derive(Debug)]
pub struct XrefLoad {
    pub table: XrefTable,
    /// Why the table had to be rebuilt, if it was.
    pub recovered: Option<String>,
}

/// Read the cross-reference chain starting at `startxref`, rebuilding it by
/// scanning the file when it is missing or inconsistent.
pub fn load(data: &[u8]) -> Result<XrefLoad, ParseError> {
    let failure = match find_startxref(data) {
        Some(start) => match read_chain(data, start) {
            Ok(table) => match validate(data, &table) {
                Ok(()) => {
                    return Ok(XrefLoad {
                        table,
                        recovered: None,
                    })
                }
                Err(reason) => reason,
            },
            Err(e) => e.to_string(),
        },
        None => "startxref not found".to_string(),
    };

    log::warn!("rebuilding cross-reference table: {}", failure);
    let table = recover(data)?;
    Ok(XrefLoad {
        table,
        recovered: Some(failure),
    })
}

/// Offset named by the last `startxref` keyword.
pub fn find_startxref(data: &[u8]) -> Option<usize> {
    let pos = rfind_bytes(data, b"startxref")?;
    let mut lexer = Lexer::at(data, pos + b"startxref".len());
    match lexer.next_token() {
        Ok(Some(Token::Integer(offset))) => usize::try_from(offset).ok(),
        _ => None,
    }
}

fn read_chain(data: &[u8], start: usize) -> Result<XrefTable, ParseError> {
    let mut table = XrefTable::default();
    let mut visited = HashSet::new();
    let mut next = Some(start);

    while let Some(offset) = next.take() {
        if !visited.insert(offset) || visited.len() > MAX_SECTIONS {
            log::warn!("cross-reference chain loops back to offset {}", offset);
            break;
        }
        if offset >= data.len() {
            return Err(ParseError::InvalidXref(format!(
                "offset {} is past end of file",
                offset
            )));
        }

        let trailer = read_section(data, offset, &mut table)?;

        // Hybrid files: entries in /XRefStm take precedence over /Prev.
        if let Some(stm) = trailer.get_i64("XRefStm").and_then(|o| usize::try_from(o).ok()) {
            if visited.insert(stm) {
                if let Err(e) = read_section(data, stm, &mut table) {
                    log::warn!("ignoring unreadable /XRefStm at {}: {}", stm, e);
                }
            }
        }

        next = trailer.get_i64("Prev").and_then(|o| usize::try_from(o).ok());

        if table.trailer.is_empty() {
            table.trailer = trailer;
        } else {
            for (key, value) in trailer.iter() {
                if !table.trailer.contains_key(key) && key != "Prev" {
                    table.trailer.insert(key.clone(), value.clone());
                }
            }
        }
    }

    Ok(table)
}

/// Read one section (classic table or stream) into `table`, returning its trailer.
fn read_section(data: &[u8], offset: usize, table: &mut XrefTable) -> Result<Dict, ParseError> {
    let mut lexer = Lexer::at(data, offset);
    match lexer.peek_token()? {
        Some(Token::Keyword(b"xref")) => {
            lexer.next_token()?;
            read_table(&mut lexer, table)
        }
        Some(Token::Integer(_)) => read_stream(data, offset, table),
        _ => Err(ParseError::InvalidXref(format!(
            "no cross-reference section at offset {}",
            offset
        ))),
    }
}

fn read_table(lexer: &mut Lexer<'_>, table: &mut XrefTable) -> Result<Dict, ParseError> {
    loop {
        let offset = lexer.pos();
        match lexer.next_token()? {
            Some(Token::Keyword(b"trailer")) => {
                let mut parser = ObjectParser::new(lexer.data(), lexer.pos());
                return match parser.parse_value()? {
                    PdfValue::Dictionary(d) => Ok(d),
                    _ => Err(ParseError::InvalidXref("trailer is not a dictionary".into())),
                };
            }
            Some(Token::Integer(first)) => {
                let count = match lexer.next_token()? {
                    Some(Token::Integer(c)) => c,
                    _ => {
                        return Err(ParseError::UnexpectedToken {
                            offset,
                            expected: "subsection entry count",
                        })
                    }
                };
                for i in 0..count.max(0) {
                    let entry = read_table_entry(lexer)?;
                    if let Ok(num) = u32::try_from(first + i) {
                        table.insert_if_absent(num, entry);
                    }
                }
            }
            None => return Err(ParseError::UnexpectedEof),
            _ => {
                return Err(ParseError::UnexpectedToken {
                    offset,
                    expected: "'trailer' or subsection header",
                })
            }
        }
    }
}

fn read_table_entry(lexer: &mut Lexer<'_>) -> Result<XrefEntry, ParseError> {
    let offset = lexer.pos();
    let err = || ParseError::UnexpectedToken {
        offset,
        expected: "cross-reference entry",
    };
    let (Some(Token::Integer(pos)), Some(Token::Integer(gen)), Some(Token::Keyword(kind))) =
        (lexer.next_token()?, lexer.next_token()?, lexer.next_token()?)
    else {
        return Err(err());
    };

    match kind {
        b"n" => Ok(XrefEntry::InUse {
            offset: usize::try_from(pos).map_err(|_| err())?,
            gen: u16::try_from(gen).unwrap_or(u16::MAX),
        }),
        b"f" => Ok(XrefEntry::Free),
        _ => Err(err()),
    }
}

fn read_stream(data: &[u8], offset: usize, table: &mut XrefTable) -> Result<Dict, ParseError> {
    let (_, value) = ObjectParser::new(data, offset).parse_indirect(&|_| None)?;
    let PdfValue::Stream(stream) = value else {
        return Err(ParseError::InvalidXref(format!(
            "object at offset {} is not a cross-reference stream",
            offset
        )));
    };
    if !stream.dict.has_type("XRef") {
        return Err(ParseError::InvalidXref(format!(
            "stream at offset {} is not /Type /XRef",
            offset
        )));
    }

    let decoded = filter::decode_chain(stream.raw_data(), &stream.filters())?;
    let widths: Vec<usize> = stream
        .dict
        .get("W")
        .and_then(PdfValue::as_array)
        .map(|w| w.iter().filter_map(|v| v.as_i64()).map(|v| v.clamp(0, 8) as usize).collect())
        .unwrap_or_default();
    if widths.len() != 3 {
        return Err(ParseError::InvalidXref("/W must have three entries".into()));
    }

    let size = stream.dict.get_i64("Size").unwrap_or(0);
    let index: Vec<i64> = stream
        .dict
        .get("Index")
        .and_then(PdfValue::as_array)
        .map(|a| a.iter().filter_map(PdfValue::as_i64).collect())
        .unwrap_or_else(|| vec![0, size]);

    let row_len: usize = widths.iter().sum();
    if row_len == 0 {
        return Err(ParseError::InvalidXref("/W describes empty entries".into()));
    }
    let mut rows = decoded.chunks_exact(row_len);

    for pair in index.chunks_exact(2) {
        let (first, count) = (pair[0], pair[1]);
        for i in 0..count.max(0) {
            let Some(row) = rows.next() else {
                log::warn!("cross-reference stream ended early");
                return Ok(stream.dict.clone());
            };
            let (f0, rest) = row.split_at(widths[0]);
            let (f1, f2) = rest.split_at(widths[1]);
            let kind = if widths[0] == 0 { 1 } else { be_int(f0) };
            let entry = match kind {
                0 => XrefEntry::Free,
                1 => XrefEntry::InUse {
                    offset: be_int(f1) as usize,
                    gen: be_int(f2).min(u64::from(u16::MAX)) as u16,
                },
                2 => XrefEntry::Compressed {
                    container: be_int(f1) as u32,
                    index: be_int(f2) as u32,
                },
                // Unknown types are to be treated as null references.
                _ => XrefEntry::Free,
            };
            if let Ok(num) = u32::try_from(first + i) {
                table.insert_if_absent(num, entry);
            }
        }
    }

    Ok(stream.dict.clone())
}

fn be_int(bytes: &[u8]) -> u64 {
    bytes.iter().fold(0, |acc, &b| (acc << 8) | u64::from(b))
}

/// Check that the trailer names a catalog and that in-use offsets point at
/// matching object headers.
fn validate(data: &[u8], table: &XrefTable) -> Result<(), String> {
    let root = table
        .root()
        .ok_or_else(|| "trailer has no /Root".to_string())?;
    if matches!(table.get(root.num), None | Some(XrefEntry::Free)) {
        return Err(format!("catalog {} is not in the table", root));
    }

    for (&num, entry) in &table.entries {
        if let XrefEntry::InUse { offset, .. } = *entry {
            if num != 0 && header_at(data, offset).map(|r| r.num) != Some(num) {
                return Err(format!("offset {} of object {} is wrong", offset, num));
            }
        }
    }
    Ok(())
}

/// Parse `n g obj` at `offset`.
pub fn header_at(data: &[u8], offset: usize) -> Option<ObjRef> {
    if offset >= data.len() {
        return None;
    }
    let mut lexer = Lexer::at(data, offset);
    match (
        lexer.next_token().ok()??,
        lexer.next_token().ok()??,
        lexer.next_token().ok()??,
    ) {
        (Token::Integer(num), Token::Integer(gen), Token::Keyword(b"obj")) => Some(ObjRef::new(
            u32::try_from(num).ok()?,
            u16::try_from(gen).ok()?,
        )),
        _ => None,
    }
}

fn object_header_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?-u)(?:^|[\x00\t\n\x0C\r ])(\d{1,10})[\x00\t\n\x0C\r ]+(\d{1,5})[\x00\t\n\x0C\r ]+obj\b")
            .expect("object header pattern is valid")
    })
}

/// Rebuild the table by scanning for `n g obj` headers. Later definitions win.
fn recover(data: &[u8]) -> Result<XrefTable, ParseError> {
    let mut table = XrefTable::default();

    for caps in object_header_regex().captures_iter(data) {
        let (Some(num), Some(gen)) = (caps.get(1), caps.get(2)) else {
            continue;
        };
        let parse = |m: regex::bytes::Match<'_>| {
            std::str::from_utf8(m.as_bytes())
                .ok()
                .and_then(|s| s.parse::<u64>().ok())
        };
        let (Some(n), Some(g)) = (parse(num), parse(gen)) else {
            continue;
        };
        let (Ok(n), Ok(g)) = (u32::try_from(n), u16::try_from(g)) else {
            continue;
        };
        table.entries.insert(
            n,
            XrefEntry::InUse {
                offset: num.start(),
                gen: g,
            },
        );
    }

    if table.entries.is_empty() {
        return Err(ParseError::InvalidXref("no objects found".into()));
    }

    let offsets: HashMap<u32, usize> = table
        .entries
        .iter()
        .filter_map(|(&n, e)| match e {
            XrefEntry::InUse { offset, .. } => Some((n, *offset)),
            _ => None,
        })
        .collect();
    let resolve_length = |r: ObjRef| {
        let offset = *offsets.get(&r.num)?;
        let (_, value) = ObjectParser::new(data, offset).parse_indirect(&|_| None).ok()?;
        value.as_i64()
    };

    let mut trailer = last_trailer_dict(data);
    let mut catalog = None;
    let mut sorted: Vec<(u32, usize)> = offsets.iter().map(|(&n, &o)| (n, o)).collect();
    sorted.sort_by_key(|&(_, o)| o);

    for (num, offset) in sorted {
        let Ok((id, value)) = ObjectParser::new(data, offset).parse_indirect(&resolve_length) else {
            continue;
        };
        let Some(dict) = value.as_dict() else {
            continue;
        };
        if dict.has_type("Catalog") {
            catalog = Some(id);
        } else if dict.has_type("XRef") && dict.contains_key("Root") && trailer.is_none() {
            trailer = Some(dict.clone());
        } else if dict.has_type("ObjStm") {
            if let Some(stream) = value.as_stream() {
                index_object_stream(num, stream, &mut table);
            }
        }
    }

    let mut trailer = trailer.unwrap_or_default();
    let root_ok = trailer
        .get("Root")
        .and_then(PdfValue::as_reference)
        .is_some_and(|r| table.entries.contains_key(&r.num));
    if !root_ok {
        let root = catalog.ok_or_else(|| ParseError::InvalidXref("no document catalog found".into()))?;
        trailer.insert("Root", PdfValue::Reference(root));
    }
    trailer.insert("Size", PdfValue::Integer(i64::from(table.entries.keys().max().copied().unwrap_or(0)) + 1));
    table.trailer = trailer;

    log::debug!("recovered {} objects", table.entries.len());
    Ok(table)
}

fn index_object_stream(container: u32, stream: &super::object::Stream, table: &mut XrefTable) {
    let Ok(decoded) = filter::decode_chain(stream.raw_data(), &stream.filters()) else {
        return;
    };
    let n = stream.dict.get_i64("N").unwrap_or(0).max(0);
    let mut lexer = Lexer::new(&decoded);
    for index in 0..n {
        let (Ok(Some(Token::Integer(num))), Ok(Some(Token::Integer(_)))) =
            (lexer.next_token(), lexer.next_token())
        else {
            break;
        };
        if let (Ok(num), Ok(index)) = (u32::try_from(num), u32::try_from(index)) {
            // Direct definitions found by the scan take precedence.
            table.insert_if_absent(num, XrefEntry::Compressed { container, index });
        }
    }
}

fn last_trailer_dict(data: &[u8]) -> Option<Dict> {
    let mut search_end = data.len();
    while let Some(pos) = rfind_bytes(&data[..search_end], b"trailer") {
        let mut parser = ObjectParser::new(data, pos + b"trailer".len());
        if let Ok(PdfValue::Dictionary(dict)) = parser.parse_value() {
            if dict.contains_key("Root") {
                return Some(dict);
            }
        }
        search_end = pos;
    }
    None
}
