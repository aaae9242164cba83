//! Fonts: character-code decoding, advance widths and style flags.

mod cmap;
mod encoding;
mod metrics;

pub use cmap::CMap;
pub use encoding::{decode_text_string, BaseEncoding, EncodingTables};
pub use metrics::StandardMetrics;

use std::collections::HashMap;
use std::sync::{Arc, OnceLock, RwLock};

use regex::Regex;
use unicode_normalization::UnicodeNormalization;

use crate::parser::{Dict, ObjRef, ObjectStore, PdfValue};

/// `/Flags` bits from the font descriptor.
const FLAG_FIXED_PITCH: i64 = 1;
const FLAG_SERIF: i64 = 1 << 1;
const FLAG_ITALIC: i64 = 1 << 6;
const FLAG_FORCE_BOLD: i64 = 1 << 18;

/// Widest `/W` range expanded into the width table.
const MAX_WIDTH_RANGE: i64 = 0xFFFF;

/// One decoded character code.
#[derive(Debug, Clone, PartialEq)]
pub struct Glyph {
    /// Unicode text; empty when the code has no known mapping
    pub text: String,
    /// Advance in thousandths of text space
    pub width: f64,
    /// Single-byte code 32, which receives word spacing
    pub is_word_space: bool,
}

#[derive(Debug, Clone)]
enum CodeMap {
    /// One byte per code, mapped through a 256-entry table.
    Simple(Vec<Option<String>>),
    /// Multi-byte codes. `encoding` is an embedded CMap; without one codes
    /// are two bytes and equal to their CID.
    Composite { encoding: Option<CMap>, ucs2: bool },
}

/// Everything the interpreter needs to know about one font.
#[derive(Debug, Clone)]
pub struct FontInfo {
    /// Base font name with any subset prefix removed
    pub name: String,
    pub bold: bool,
    pub italic: bool,
    codes: CodeMap,
    to_unicode: Option<CMap>,
    widths: HashMap<u32, f64>,
    metrics: Option<StandardMetrics>,
    default_width: f64,
}

impl FontInfo {
    /// Build from a font dictionary.
    pub fn load(store: &ObjectStore, dict: &Dict, tables: &EncodingTables) -> Self {
        let subtype = dict.get_name("Subtype").unwrap_or("Type1").to_string();
        let raw_name = store
            .get(dict, "BaseFont")
            .or_else(|| store.get(dict, "Name"))
            .and_then(|v| v.as_name().map(str::to_string))
            .unwrap_or_default();
        let name = strip_subset_prefix(&raw_name).to_string();

        let to_unicode = store
            .get(dict, "ToUnicode")
            .and_then(|v| v.as_stream().cloned())
            .and_then(|stream| match store.decode_stream(&stream) {
                Ok(data) => Some(CMap::parse(&data)),
                Err(e) => {
                    log::warn!("unreadable /ToUnicode for {}: {}", name, e);
                    None
                }
            })
            .filter(CMap::has_unicode);

        let font = if subtype == "Type0" {
            Self::load_composite(store, dict, name, to_unicode)
        } else {
            Self::load_simple(store, dict, &subtype, name, to_unicode, tables)
        };
        log::debug!(
            "loaded {} font {} (bold: {}, italic: {})",
            subtype,
            font.name,
            font.bold,
            font.italic
        );
        font
    }

    /// Substitute for a font that is referenced but missing.
    pub fn fallback(tables: &EncodingTables) -> Self {
        let codes = (0..=255u8)
            .map(|code| tables.decode(BaseEncoding::WinAnsi, code).map(String::from))
            .collect();
        let metrics = StandardMetrics::guess("Helvetica", false, false);
        Self {
            name: "Helvetica".to_string(),
            bold: false,
            italic: false,
            codes: CodeMap::Simple(codes),
            to_unicode: None,
            widths: HashMap::new(),
            metrics: Some(metrics),
            default_width: metrics.default_width(),
        }
    }

    fn load_simple(
        store: &ObjectStore,
        dict: &Dict,
        subtype: &str,
        name: String,
        to_unicode: Option<CMap>,
        tables: &EncodingTables,
    ) -> Self {
        let descriptor = store.get_dict(dict, "FontDescriptor");
        let flags = descriptor_flags(store, descriptor.as_ref());
        let (bold, italic) = style(store, &name, descriptor.as_ref(), flags);
        let codes = simple_codes(store, dict, subtype, tables);

        // Type 3 glyph space is scaled by the font matrix, usually 0.001.
        let scale = if subtype == "Type3" {
            store
                .get(dict, "FontMatrix")
                .and_then(|m| m.as_array().and_then(|a| a.first().and_then(PdfValue::as_f64)))
                .map(|a| a * 1000.0)
                .unwrap_or(1.0)
        } else {
            1.0
        };

        let mut widths = HashMap::new();
        let first_char = store.get(dict, "FirstChar").and_then(|v| v.as_i64()).unwrap_or(0);
        if let Some(PdfValue::Array(items)) = store.get(dict, "Widths") {
            for (i, item) in items.iter().enumerate() {
                let code = first_char + i as i64;
                if let (Ok(code), Some(w)) = (u32::try_from(code), store.deref(item).ok().and_then(|v| v.as_f64())) {
                    widths.insert(code, w * scale);
                }
            }
        }

        let guessed = StandardMetrics::guess(&name, flags & FLAG_SERIF != 0, flags & FLAG_FIXED_PITCH != 0);
        let missing_width = descriptor
            .as_ref()
            .and_then(|d| store.get(d, "MissingWidth"))
            .and_then(|v| v.as_f64())
            .filter(|w| *w > 0.0);

        Self {
            name,
            bold,
            italic,
            codes: CodeMap::Simple(codes),
            to_unicode,
            metrics: widths.is_empty().then_some(guessed),
            widths,
            default_width: missing_width.unwrap_or_else(|| guessed.default_width()),
        }
    }

    fn load_composite(store: &ObjectStore, dict: &Dict, name: String, to_unicode: Option<CMap>) -> Self {
        let descendant = store
            .get(dict, "DescendantFonts")
            .and_then(|v| v.as_array().and_then(|a| a.first().cloned()))
            .and_then(|v| store.deref(&v).ok())
            .and_then(|v| v.as_dict().cloned())
            .unwrap_or_default();

        let (encoding, ucs2) = match store.get(dict, "Encoding") {
            Some(PdfValue::Name(cmap_name)) => {
                let ucs2 = cmap_name.contains("UCS2") || cmap_name.contains("UTF16");
                if !ucs2 && !cmap_name.starts_with("Identity") {
                    log::debug!("predefined CMap {} read as two-byte codes", cmap_name);
                }
                (None, ucs2)
            }
            Some(PdfValue::Stream(stream)) => match store.decode_stream(&stream) {
                Ok(data) => (Some(CMap::parse(&data)).filter(CMap::has_codespace), false),
                Err(e) => {
                    log::warn!("unreadable CMap for {}: {}", name, e);
                    (None, false)
                }
            },
            _ => (None, false),
        };

        let descriptor = store.get_dict(&descendant, "FontDescriptor");
        let flags = descriptor_flags(store, descriptor.as_ref());
        let (bold, italic) = style(store, &name, descriptor.as_ref(), flags);

        let widths = store
            .get(&descendant, "W")
            .and_then(|w| w.as_array().map(|items| cid_widths(store, items)))
            .unwrap_or_default();
        let default_width = store.get(&descendant, "DW").and_then(|v| v.as_f64()).unwrap_or(1000.0);

        Self {
            name,
            bold,
            italic,
            codes: CodeMap::Composite { encoding, ucs2 },
            to_unicode,
            widths,
            metrics: None,
            default_width,
        }
    }

    /// Split a string operand into glyphs.
    pub fn decode(&self, bytes: &[u8]) -> Vec<Glyph> {
        match &self.codes {
            CodeMap::Simple(table) => bytes
                .iter()
                .map(|&b| {
                    let code = b as u32;
                    let text = self
                        .to_unicode
                        .as_ref()
                        .and_then(|cmap| cmap.lookup(code))
                        .or_else(|| table[b as usize].clone())
                        .unwrap_or_default();
                    Glyph {
                        text: expand_ligatures(text),
                        width: self.width(code),
                        is_word_space: b == b' ',
                    }
                })
                .collect(),
            CodeMap::Composite { encoding, ucs2 } => {
                let mut glyphs = Vec::with_capacity(bytes.len() / 2);
                let mut pos = 0;
                while pos < bytes.len() {
                    let rest = &bytes[pos..];
                    let (code, len) = encoding
                        .as_ref()
                        .and_then(|cmap| cmap.match_code(rest))
                        .unwrap_or_else(|| match rest {
                            [hi, lo, ..] => (u16::from_be_bytes([*hi, *lo]) as u32, 2),
                            [single, ..] => (*single as u32, 1),
                            [] => (0, 1),
                        });
                    pos += len;

                    let cid = encoding.as_ref().and_then(|cmap| cmap.cid(code)).unwrap_or(code);
                    let text = self
                        .to_unicode
                        .as_ref()
                        .and_then(|cmap| cmap.lookup(code))
                        .or_else(|| if *ucs2 { char::from_u32(code).map(String::from) } else { None })
                        .unwrap_or_default();
                    glyphs.push(Glyph {
                        text: expand_ligatures(text),
                        width: self.width(cid),
                        is_word_space: len == 1 && code == 32,
                    });
                }
                glyphs
            }
        }
    }

    /// Advance width for `code` (a CID for composite fonts).
    pub fn width(&self, code: u32) -> f64 {
        if let Some(&w) = self.widths.get(&code) {
            return w;
        }
        match (self.metrics, u8::try_from(code)) {
            (Some(metrics), Ok(byte)) => metrics.width(byte),
            _ => self.default_width,
        }
    }
}

/// Fonts shared by every page of one document, keyed by object reference.
#[derive(Debug, Default)]
pub struct FontCache {
    fonts: RwLock<HashMap<ObjRef, Arc<FontInfo>>>,
}

impl FontCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load the font a `/Font` resource entry points at.
    ///
    /// Indirect fonts are built once per document; inline dictionaries are
    /// built on every call. Returns `None` when the entry is not a font.
    pub fn get_or_load(&self, store: &ObjectStore, entry: &PdfValue, tables: &EncodingTables) -> Option<Arc<FontInfo>> {
        let id = entry.as_reference();
        if let Some(id) = id {
            if let Some(font) = self.fonts.read().ok().and_then(|fonts| fonts.get(&id).cloned()) {
                return Some(font);
            }
        }

        let dict = match store.deref(entry) {
            Ok(PdfValue::Dictionary(dict)) => dict,
            Ok(other) => {
                log::warn!("font resource is a {}", other.type_name());
                return None;
            }
            Err(e) => {
                log::warn!("cannot resolve font: {}", e);
                return None;
            }
        };
        let font = Arc::new(FontInfo::load(store, &dict, tables));

        if let Some(id) = id {
            if let Ok(mut fonts) = self.fonts.write() {
                fonts.insert(id, font.clone());
            }
        }
        Some(font)
    }

    /// Number of cached fonts.
    pub fn len(&self) -> usize {
        self.fonts.read().map(|fonts| fonts.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Remove a six-letter subset tag such as `ABCDEF+`.
pub fn strip_subset_prefix(name: &str) -> &str {
    match name.split_once('+') {
        Some((tag, rest)) if tag.len() == 6 && tag.bytes().all(|b| b.is_ascii_uppercase()) => rest,
        _ => name,
    }
}

/// Expand presentation-form ligatures (U+FB00 to U+FB06).
fn expand_ligatures(text: String) -> String {
    let is_ligature = |c: char| ('\u{FB00}'..='\u{FB06}').contains(&c);
    if !text.chars().any(is_ligature) {
        return text;
    }
    text.chars()
        .flat_map(|c| {
            if is_ligature(c) {
                std::iter::once(c).nfkc().collect::<Vec<_>>()
            } else {
                vec![c]
            }
        })
        .collect()
}

fn bold_name_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)bold|black|heavy|semibold|demi").expect("bold pattern is valid"))
}

fn italic_name_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)italic|oblique|[-,]it\b").expect("italic pattern is valid"))
}

fn descriptor_flags(store: &ObjectStore, descriptor: Option<&Dict>) -> i64 {
    descriptor
        .and_then(|d| store.get(d, "Flags"))
        .and_then(|v| v.as_i64())
        .unwrap_or(0)
}

fn style(store: &ObjectStore, name: &str, descriptor: Option<&Dict>, flags: i64) -> (bool, bool) {
    let number = |key: &str| {
        descriptor
            .and_then(|d| store.get(d, key))
            .and_then(|v| v.as_f64())
            .unwrap_or(0.0)
    };
    let bold = flags & FLAG_FORCE_BOLD != 0 || number("FontWeight") >= 600.0 || bold_name_regex().is_match(name);
    let italic = flags & FLAG_ITALIC != 0 || number("ItalicAngle") != 0.0 || italic_name_regex().is_match(name);
    (bold, italic)
}

fn simple_codes(store: &ObjectStore, dict: &Dict, subtype: &str, tables: &EncodingTables) -> Vec<Option<String>> {
    let (base_name, differences) = match store.get(dict, "Encoding") {
        Some(PdfValue::Name(name)) => (Some(name), None),
        Some(PdfValue::Dictionary(enc)) => (
            enc.get_name("BaseEncoding").map(str::to_string),
            store.get(&enc, "Differences"),
        ),
        _ => (None, None),
    };

    let default = if subtype == "TrueType" {
        BaseEncoding::WinAnsi
    } else {
        BaseEncoding::Standard
    };
    let base = base_name
        .as_deref()
        .and_then(BaseEncoding::from_name)
        .unwrap_or(default);

    let mut codes: Vec<Option<String>> = (0..=255u8)
        .map(|code| tables.decode(base, code).map(String::from))
        .collect();

    if let Some(PdfValue::Array(items)) = differences {
        let mut code = 0usize;
        for item in &items {
            match store.deref(item) {
                Ok(PdfValue::Integer(n)) => code = n.max(0) as usize,
                Ok(PdfValue::Name(glyph)) => {
                    if let Some(slot) = codes.get_mut(code) {
                        *slot = tables.glyph_to_unicode(&glyph);
                    }
                    code += 1;
                }
                _ => {}
            }
        }
    }
    codes
}

/// Parse a CID `/W` array: `c [w1 w2 ...]` and `cfirst clast w` forms.
fn cid_widths(store: &ObjectStore, items: &[PdfValue]) -> HashMap<u32, f64> {
    let items: Vec<PdfValue> = items
        .iter()
        .map(|item| store.deref(item).unwrap_or(PdfValue::Null))
        .collect();
    let mut widths = HashMap::new();
    let mut i = 0;
    while i < items.len() {
        let Some(first) = items[i].as_i64().filter(|n| *n >= 0) else {
            i += 1;
            continue;
        };
        match items.get(i + 1) {
            Some(PdfValue::Array(list)) => {
                for (k, w) in list.iter().enumerate() {
                    if let Some(w) = store.deref(w).ok().and_then(|v| v.as_f64()) {
                        widths.insert((first + k as i64) as u32, w);
                    }
                }
                i += 2;
            }
            Some(last) => {
                if let (Some(last), Some(w)) = (last.as_i64(), items.get(i + 2).and_then(PdfValue::as_f64)) {
                    let last = last.min(first + MAX_WIDTH_RANGE);
                    for cid in first..=last {
                        widths.insert(cid as u32, w);
                    }
                }
                i += 3;
            }
            None => break,
        }
    }
    widths
}
