//! CMap parsing: `/ToUnicode` streams and embedded CID encodings.
//!
//! Only the parts that matter for text extraction are read:
//! `codespacerange`, `bfchar`, `bfrange` (both destination forms),
//! `cidchar` and `cidrange`. Everything else in the PostScript
//! wrapper is ignored.

use std::collections::HashMap;

use crate::parser::{Lexer, Token};

#[derive(Debug, Clone)]
struct CodespaceRange {
    low: Vec<u8>,
    high: Vec<u8>,
}

impl CodespaceRange {
    fn matches(&self, bytes: &[u8]) -> bool {
        bytes.len() >= self.low.len()
            && self
                .low
                .iter()
                .zip(&self.high)
                .zip(bytes)
                .all(|((lo, hi), b)| (lo..=hi).contains(&b))
    }
}

#[derive(Debug, Clone)]
struct UnicodeRange {
    low: u32,
    high: u32,
    base: Vec<u16>,
}

/// A parsed CMap.
#[derive(Debug, Clone, Default)]
pub struct CMap {
    codespace: Vec<CodespaceRange>,
    unicode: HashMap<u32, String>,
    unicode_ranges: Vec<UnicodeRange>,
    cids: HashMap<u32, u32>,
    cid_ranges: Vec<(u32, u32, u32)>,
}

#[derive(Debug, Clone)]
enum Item {
    Bytes(Vec<u8>),
    Int(i64),
    Open,
    Close,
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Section {
    Codespace,
    BfChar,
    BfRange,
    CidChar,
    CidRange,
}

impl CMap {
    /// Parse a CMap program, keeping whatever was readable.
    pub fn parse(data: &[u8]) -> Self {
        let mut cmap = CMap::default();
        let mut lexer = Lexer::new(data);
        let mut section: Option<Section> = None;
        let mut items = Vec::new();

        loop {
            let pos = lexer.pos();
            let token = match lexer.next_token() {
                Ok(Some(token)) => token,
                Ok(None) => break,
                Err(_) => {
                    lexer.set_pos(pos + 1);
                    continue;
                }
            };

            match token {
                Token::Keyword(word) => match word {
                    b"begincodespacerange" => section = Some(Section::Codespace),
                    b"beginbfchar" => section = Some(Section::BfChar),
                    b"beginbfrange" => section = Some(Section::BfRange),
                    b"begincidchar" => section = Some(Section::CidChar),
                    b"begincidrange" => section = Some(Section::CidRange),
                    b"endcodespacerange" | b"endbfchar" | b"endbfrange" | b"endcidchar"
                    | b"endcidrange" => {
                        if let Some(current) = section.take() {
                            cmap.apply(current, &items);
                        }
                        items.clear();
                    }
                    _ => {}
                },
                _ if section.is_none() => {}
                Token::String(bytes) => items.push(Item::Bytes(bytes)),
                Token::Integer(n) => items.push(Item::Int(n)),
                Token::ArrayStart => items.push(Item::Open),
                Token::ArrayEnd => items.push(Item::Close),
                // Glyph-name destinations are rare and carry no code point.
                Token::Name(_) => items.push(Item::Bytes(Vec::new())),
                _ => {}
            }
        }

        cmap.codespace.sort_by_key(|range| range.low.len());
        cmap
    }

    fn apply(&mut self, section: Section, items: &[Item]) {
        let mut iter = items.iter();
        match section {
            Section::Codespace => {
                while let (Some(Item::Bytes(low)), Some(Item::Bytes(high))) = (iter.next(), iter.next()) {
                    if !low.is_empty() && low.len() == high.len() && low.len() <= 4 {
                        self.codespace.push(CodespaceRange {
                            low: low.clone(),
                            high: high.clone(),
                        });
                    }
                }
            }
            Section::BfChar => {
                while let (Some(Item::Bytes(src)), Some(Item::Bytes(dst))) = (iter.next(), iter.next()) {
                    if !dst.is_empty() {
                        self.unicode.insert(code_of(src), utf16_text(&utf16_units(dst)));
                    }
                }
            }
            Section::BfRange => {
                while let (Some(Item::Bytes(low)), Some(Item::Bytes(high))) = (iter.next(), iter.next()) {
                    let (low, high) = (code_of(low), code_of(high));
                    match iter.next() {
                        Some(Item::Bytes(dst)) if !dst.is_empty() && high >= low => {
                            self.unicode_ranges.push(UnicodeRange {
                                low,
                                high,
                                base: utf16_units(dst),
                            });
                        }
                        Some(Item::Open) => {
                            let mut code = low;
                            for item in iter.by_ref() {
                                match item {
                                    Item::Bytes(dst) => {
                                        if code <= high && !dst.is_empty() {
                                            self.unicode.insert(code, utf16_text(&utf16_units(dst)));
                                        }
                                        code = code.saturating_add(1);
                                    }
                                    Item::Close => break,
                                    _ => {}
                                }
                            }
                        }
                        _ => {}
                    }
                }
            }
            Section::CidChar => {
                while let (Some(Item::Bytes(src)), Some(Item::Int(cid))) = (iter.next(), iter.next()) {
                    self.cids.insert(code_of(src), (*cid).max(0) as u32);
                }
            }
            Section::CidRange => {
                while let (Some(Item::Bytes(low)), Some(Item::Bytes(high)), Some(Item::Int(cid))) =
                    (iter.next(), iter.next(), iter.next())
                {
                    self.cid_ranges.push((code_of(low), code_of(high), (*cid).max(0) as u32));
                }
            }
        }
    }

    /// Whether any code-space ranges were declared.
    pub fn has_codespace(&self) -> bool {
        !self.codespace.is_empty()
    }

    /// Whether the CMap maps anything to Unicode.
    pub fn has_unicode(&self) -> bool {
        !self.unicode.is_empty() || !self.unicode_ranges.is_empty()
    }

    /// Match the next character code at the start of `bytes`.
    ///
    /// Returns the code and its length in bytes, or `None` when no
    /// code-space range matches.
    pub fn match_code(&self, bytes: &[u8]) -> Option<(u32, usize)> {
        self.codespace
            .iter()
            .find(|range| range.matches(bytes))
            .map(|range| (code_of(&bytes[..range.low.len()]), range.low.len()))
    }

    /// Unicode text for `code`.
    pub fn lookup(&self, code: u32) -> Option<String> {
        if let Some(text) = self.unicode.get(&code) {
            return Some(text.clone());
        }
        let range = self
            .unicode_ranges
            .iter()
            .rev()
            .find(|range| (range.low..=range.high).contains(&code))?;
        let mut units = range.base.clone();
        if let Some(last) = units.last_mut() {
            *last = last.wrapping_add((code - range.low) as u16);
        }
        Some(utf16_text(&units))
    }

    /// CID for `code`, when the CMap defines one.
    pub fn cid(&self, code: u32) -> Option<u32> {
        if let Some(&cid) = self.cids.get(&code) {
            return Some(cid);
        }
        self.cid_ranges
            .iter()
            .rev()
            .find(|(low, high, _)| (*low..=*high).contains(&code))
            .map(|(low, _, cid)| cid + (code - low))
    }
}

/// Big-endian integer value of a code.
fn code_of(bytes: &[u8]) -> u32 {
    bytes.iter().take(4).fold(0u32, |acc, &b| (acc << 8) | b as u32)
}

fn utf16_units(bytes: &[u8]) -> Vec<u16> {
    if bytes.len() == 1 {
        return vec![bytes[0] as u16];
    }
    bytes
        .chunks(2)
        .map(|pair| match pair {
            [hi, lo] => u16::from_be_bytes([*hi, *lo]),
            [single] => *single as u16,
            _ => 0,
        })
        .collect()
}

fn utf16_text(units: &[u16]) -> String {
    String::from_utf16_lossy(units)
}

#[cfg(test)]
mod tests {
    use super::*;

    const TO_UNICODE: &[u8] = b"/CIDInit /ProcSet findresource begin
12 dict begin
begincmap
/CMapName /Adobe-Identity-UCS def
1 begincodespacerange
<0000> <FFFF>
endcodespacerange
2 beginbfchar
<0003> <0020>
<0011> <00660069>
endbfchar
2 beginbfrange
<0024> <0026> <0041>
<0030> <0031> [<03B1> <03B2>]
endbfrange
endcmap
CMapName currentdict /CMap defineresource pop
end
end";

    #[test]
    fn test_bfchar_and_bfrange() {
        let cmap = CMap::parse(TO_UNICODE);
        assert!(cmap.has_codespace());
        assert!(cmap.has_unicode());
        assert_eq!(cmap.lookup(0x0003).as_deref(), Some(" "));
        assert_eq!(cmap.lookup(0x0011).as_deref(), Some("fi"));
        assert_eq!(cmap.lookup(0x0024).as_deref(), Some("A"));
        assert_eq!(cmap.lookup(0x0026).as_deref(), Some("C"));
        assert_eq!(cmap.lookup(0x0027), None);
        assert_eq!(cmap.lookup(0x0031).as_deref(), Some("\u{03B2}"));
    }

    #[test]
    fn test_codespace_matching() {
        let cmap = CMap::parse(
            b"2 begincodespacerange <00> <7F> <8140> <9FFC> endcodespacerange",
        );
        assert_eq!(cmap.match_code(b"A\x81\x40"), Some((0x41, 1)));
        assert_eq!(cmap.match_code(b"\x81\x40"), Some((0x8140, 2)));
        assert_eq!(cmap.match_code(b"\xFF"), None);
    }

    #[test]
    fn test_cid_ranges() {
        let cmap = CMap::parse(
            b"1 begincidrange <0020> <007E> 1 endcidrange 1 begincidchar <0100> 500 endcidchar",
        );
        assert_eq!(cmap.cid(0x0020), Some(1));
        assert_eq!(cmap.cid(0x0041), Some(34));
        assert_eq!(cmap.cid(0x0100), Some(500));
        assert_eq!(cmap.cid(0x0200), None);
    }

    #[test]
    fn test_surrogate_pair_destination() {
        let cmap = CMap::parse(b"1 beginbfchar <01> <D83DDE00> endbfchar");
        assert_eq!(cmap.lookup(1).as_deref(), Some("\u{1F600}"));
    }

    #[test]
    fn test_garbage_is_tolerated() {
        let cmap = CMap::parse(b") ) begincodespacerange <00> endcodespacerange }{");
        assert!(!cmap.has_codespace());
        assert_eq!(cmap.lookup(0), None);
    }
}
