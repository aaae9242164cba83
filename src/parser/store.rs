//! Random access to the objects of a loaded PDF.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use super::crypt::Decryptor;
use super::filter;
use super::lexer::{Lexer, Token};
use super::object::{filter_chain, Dict, ObjRef, PdfValue, Stream};
use super::syntax::ObjectParser;
use super::xref::{self, XrefEntry, XrefTable};
use crate::detect::{self, PdfFormat};
use crate::diagnostics::{Diagnostic, DiagnosticKind};
use crate::error::{ParseError, Result};

/// Reference chains longer than this are treated as cycles.
const MAX_REFERENCE_DEPTH: usize = 32;

/// Decoded object stream: its payload and the offsets of its members.
#[derive(Debug)]
struct ObjectStream {
    data: Vec<u8>,
    members: Vec<(u32, usize)>,
}

/// The object graph of one PDF, resolved lazily and cached.
///
/// Shared read-only between page workers; the caches use interior
/// mutability so resolution works through `&self`.
#[derive(Debug)]
pub struct ObjectStore {
    data: Vec<u8>,
    xref: XrefTable,
    format: PdfFormat,
    cache: RwLock<HashMap<ObjRef, PdfValue>>,
    object_streams: RwLock<HashMap<u32, Arc<ObjectStream>>>,
    decryptor: Option<Decryptor>,
    encrypt_ref: Option<ObjRef>,
    diagnostics: Vec<Diagnostic>,
}

impl ObjectStore {
    /// Parse the header and cross-reference structure of `bytes`.
    ///
    /// Object bodies are parsed on first access. Fails with
    /// [`ParseError::MalformedHeader`] for non-PDF input and
    /// [`ParseError::EncryptedDocument`] when the empty password does not
    /// open the file.
    pub fn load(bytes: &[u8]) -> Result<Self> {
        let format = detect::detect_format_from_bytes(bytes)?;
        // Offsets are relative to the header when there is leading junk.
        let data = bytes[format.header_offset..].to_vec();

        let load = xref::load(&data)?;
        let mut diagnostics = Vec::new();
        if let Some(reason) = load.recovered {
            diagnostics.push(Diagnostic::new(
                DiagnosticKind::RecoveredXref,
                format!("cross-reference table rebuilt: {}", reason),
            ));
        }

        let mut store = Self {
            data,
            xref: load.table,
            format,
            cache: RwLock::new(HashMap::new()),
            object_streams: RwLock::new(HashMap::new()),
            decryptor: None,
            encrypt_ref: None,
            diagnostics,
        };
        store.setup_encryption()?;

        log::debug!(
            "loaded PDF {} with {} xref entries",
            store.format.version,
            store.xref.entries.len()
        );
        Ok(store)
    }

    fn setup_encryption(&mut self) -> std::result::Result<(), ParseError> {
        let Some(encrypt) = self.xref.trailer.get("Encrypt").cloned() else {
            return Ok(());
        };
        self.encrypt_ref = encrypt.as_reference();
        let dict = match self.deref(&encrypt)? {
            PdfValue::Dictionary(d) => d,
            _ => return Err(ParseError::EncryptedDocument),
        };
        let id0 = self
            .xref
            .trailer
            .get("ID")
            .and_then(PdfValue::as_array)
            .and_then(|ids| ids.first())
            .and_then(PdfValue::as_string)
            .map(<[u8]>::to_vec)
            .unwrap_or_default();

        self.decryptor = Some(Decryptor::new(&dict, &id0)?);
        // Anything cached while reading /Encrypt was read without decryption.
        if let Ok(mut cache) = self.cache.write() {
            cache.clear();
        }
        log::debug!("document decrypted with the empty user password");
        Ok(())
    }

    /// Header information.
    pub fn format(&self) -> &PdfFormat {
        &self.format
    }

    /// PDF version, preferring the catalog's `/Version` over the header.
    pub fn version(&self) -> String {
        self.catalog()
            .ok()
            .and_then(|c| c.get_name("Version").map(str::to_string))
            .unwrap_or_else(|| self.format.version.clone())
    }

    pub fn trailer(&self) -> &Dict {
        &self.xref.trailer
    }

    pub fn is_encrypted(&self) -> bool {
        self.decryptor.is_some()
    }

    /// Number of objects listed in the cross-reference table.
    pub fn object_count(&self) -> usize {
        self.xref
            .entries
            .values()
            .filter(|e| !matches!(e, XrefEntry::Free))
            .count()
    }

    /// Problems recovered from while loading.
    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }

    /// The document catalog.
    pub fn catalog(&self) -> std::result::Result<Dict, ParseError> {
        let root = self
            .xref
            .root()
            .ok_or_else(|| ParseError::InvalidXref("trailer has no /Root".into()))?;
        match self.resolve(root)? {
            PdfValue::Dictionary(d) => Ok(d),
            other => Err(ParseError::InvalidPageTree(format!(
                "catalog is a {}",
                other.type_name()
            ))),
        }
    }

    /// The document information dictionary, if present.
    pub fn info(&self) -> Option<Dict> {
        let info = self.xref.trailer.get("Info")?;
        self.deref(info).ok()?.as_dict().cloned()
    }

    /// Load the indirect object `id`.
    pub fn resolve(&self, id: ObjRef) -> std::result::Result<PdfValue, ParseError> {
        if let Ok(cache) = self.cache.read() {
            if let Some(value) = cache.get(&id) {
                return Ok(value.clone());
            }
        }

        let value = match self.xref.get(id.num) {
            Some(XrefEntry::InUse { offset, gen }) => {
                if gen != id.gen {
                    log::debug!("generation mismatch for {}: table has {}", id, gen);
                }
                self.load_direct(id, offset)?
            }
            Some(XrefEntry::Compressed { container, index }) => {
                self.load_compressed(id, container, index)?
            }
            Some(XrefEntry::Free) | None => return Err(ParseError::MissingObject(id)),
        };

        if let Ok(mut cache) = self.cache.write() {
            cache.insert(id, value.clone());
        }
        Ok(value)
    }

    /// Follow references until a direct value is reached.
    pub fn deref(&self, value: &PdfValue) -> std::result::Result<PdfValue, ParseError> {
        let mut current = value.clone();
        let mut depth = 0;
        while let PdfValue::Reference(id) = current {
            depth += 1;
            if depth > MAX_REFERENCE_DEPTH {
                return Err(ParseError::CircularReference(id));
            }
            current = self.resolve(id)?;
        }
        Ok(current)
    }

    /// Resolve `dict[key]`, treating missing or dangling entries as absent.
    pub fn get(&self, dict: &Dict, key: &str) -> Option<PdfValue> {
        let value = dict.get(key)?;
        match self.deref(value) {
            Ok(PdfValue::Null) => None,
            Ok(v) => Some(v),
            Err(e) => {
                log::debug!("cannot resolve /{}: {}", key, e);
                None
            }
        }
    }

    /// Resolve `dict[key]` as a dictionary (or a stream's dictionary).
    pub fn get_dict(&self, dict: &Dict, key: &str) -> Option<Dict> {
        self.get(dict, key)?.as_dict().cloned()
    }

    /// Decode a stream's payload through its filter chain.
    pub fn decode_stream(&self, stream: &Stream) -> std::result::Result<Vec<u8>, ParseError> {
        let filter = self.get(&stream.dict, "Filter");
        let params = self.get(&stream.dict, "DecodeParms").map(|p| match p {
            PdfValue::Array(items) => PdfValue::Array(
                items
                    .iter()
                    .map(|item| self.deref(item).unwrap_or(PdfValue::Null))
                    .collect(),
            ),
            other => other,
        });
        let chain = filter_chain(filter.as_ref(), params.as_ref());
        if chain.is_empty() {
            return Ok(stream.raw_data().to_vec());
        }
        filter::decode_chain(stream.raw_data(), &chain)
    }

    fn load_direct(&self, id: ObjRef, offset: usize) -> std::result::Result<PdfValue, ParseError> {
        let resolve_length = |r: ObjRef| self.load_length(r);
        let (found, mut value) =
            ObjectParser::new(&self.data, offset).parse_indirect(&resolve_length)?;
        if found.num != id.num {
            log::warn!("xref entry for {} points at {}", id, found);
            return Err(ParseError::MissingObject(id));
        }

        if let Some(decryptor) = &self.decryptor {
            if Some(id) != self.encrypt_ref {
                decryptor.decrypt_value(id, &mut value);
            }
        }
        Ok(value)
    }

    /// Integer value of an indirect `/Length`, read without recursion.
    fn load_length(&self, id: ObjRef) -> Option<i64> {
        if let Ok(cache) = self.cache.read() {
            if let Some(value) = cache.get(&id) {
                return value.as_i64();
            }
        }
        let Some(XrefEntry::InUse { offset, .. }) = self.xref.get(id.num) else {
            return None;
        };
        let (_, value) = ObjectParser::new(&self.data, offset)
            .parse_indirect(&|_| None)
            .ok()?;
        value.as_i64()
    }

    fn load_compressed(
        &self,
        id: ObjRef,
        container: u32,
        index: u32,
    ) -> std::result::Result<PdfValue, ParseError> {
        let stream = self.object_stream(container)?;
        let member = stream
            .members
            .get(index as usize)
            .filter(|(num, _)| *num == id.num)
            .or_else(|| stream.members.iter().find(|(num, _)| *num == id.num))
            .ok_or(ParseError::MissingObject(id))?;
        ObjectParser::new(&stream.data, member.1).parse_value()
    }

    fn object_stream(&self, container: u32) -> std::result::Result<Arc<ObjectStream>, ParseError> {
        if let Ok(streams) = self.object_streams.read() {
            if let Some(stream) = streams.get(&container) {
                return Ok(Arc::clone(stream));
            }
        }

        let id = ObjRef::new(container, 0);
        let Some(XrefEntry::InUse { offset, .. }) = self.xref.get(container) else {
            return Err(ParseError::MissingObject(id));
        };
        let value = self.load_direct(id, offset)?;
        let stream = value
            .as_stream()
            .filter(|s| s.dict.has_type("ObjStm"))
            .ok_or_else(|| ParseError::InvalidXref(format!("{} is not an object stream", id)))?;

        let data = self.decode_stream(stream)?;
        let count = stream.dict.get_i64("N").unwrap_or(0).max(0) as usize;
        let first = stream.dict.get_i64("First").unwrap_or(0).max(0) as usize;

        // Each member header takes at least four bytes ("n o ").
        let mut members = Vec::with_capacity(count.min(data.len() / 4));
        let mut lexer = Lexer::new(&data);
        for _ in 0..count {
            match (lexer.next_token(), lexer.next_token()) {
                (Ok(Some(Token::Integer(num))), Ok(Some(Token::Integer(off)))) => {
                    if let (Ok(num), Ok(off)) = (u32::try_from(num), usize::try_from(off)) {
                        members.push((num, first + off));
                    }
                }
                _ => break,
            }
        }

        let parsed = Arc::new(ObjectStream { data, members });
        if let Ok(mut streams) = self.object_streams.write() {
            streams.insert(container, Arc::clone(&parsed));
        }
        Ok(parsed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;

    fn build(objects: &[&str], trailer_extra: &str) -> Vec<u8> {
        let mut pdf = b"%PDF-1.4\n".to_vec();
        let mut offsets = Vec::new();
        for (i, body) in objects.iter().enumerate() {
            offsets.push(pdf.len());
            pdf.extend_from_slice(format!("{} 0 obj\n{}\nendobj\n", i + 1, body).as_bytes());
        }
        let xref = pdf.len();
        pdf.extend_from_slice(format!("xref\n0 {}\n0000000000 65535 f \n", objects.len() + 1).as_bytes());
        for offset in offsets {
            pdf.extend_from_slice(format!("{:010} 00000 n \n", offset).as_bytes());
        }
        pdf.extend_from_slice(
            format!(
                "trailer\n<< /Size {} /Root 1 0 R {} >>\nstartxref\n{}\n%%EOF\n",
                objects.len() + 1,
                trailer_extra,
                xref
            )
            .as_bytes(),
        );
        pdf
    }

    #[test]
    fn test_resolve_and_cache() {
        let pdf = build(&["<< /Type /Catalog /Pages 2 0 R >>", "<< /Type /Pages /Kids [] /Count 0 >>"], "");
        let store = ObjectStore::load(&pdf).unwrap();
        let catalog = store.catalog().unwrap();
        assert!(catalog.has_type("Catalog"));
        let pages = store.get_dict(&catalog, "Pages").unwrap();
        assert_eq!(pages.get_i64("Count"), Some(0));
        assert!(store.diagnostics().is_empty());
        assert_eq!(store.object_count(), 2);
    }

    #[test]
    fn test_missing_object() {
        let pdf = build(&["<< /Type /Catalog >>"], "");
        let store = ObjectStore::load(&pdf).unwrap();
        assert_eq!(
            store.resolve(ObjRef::new(9, 0)),
            Err(ParseError::MissingObject(ObjRef::new(9, 0)))
        );
    }

    #[test]
    fn test_reference_cycle_is_bounded() {
        let pdf = build(&["<< /Type /Catalog >>", "3 0 R", "2 0 R"], "");
        let store = ObjectStore::load(&pdf).unwrap();
        let err = store.deref(&PdfValue::Reference(ObjRef::new(2, 0))).unwrap_err();
        assert!(matches!(err, ParseError::CircularReference(_)));
    }

    #[test]
    fn test_not_a_pdf() {
        let err = ObjectStore::load(b"hello world").unwrap_err();
        assert!(matches!(err, Error::Parse(ParseError::MalformedHeader)));
    }

    #[test]
    fn test_indirect_length() {
        let pdf = build(
            &["<< /Type /Catalog >>", "<< /Length 3 0 R >>\nstream\nabcde\nendstream", "5"],
            "",
        );
        let store = ObjectStore::load(&pdf).unwrap();
        let value = store.resolve(ObjRef::new(2, 0)).unwrap();
        let stream = value.as_stream().unwrap();
        assert_eq!(store.decode_stream(stream).unwrap(), b"abcde");
    }

    #[test]
    fn test_object_stream_member() {
        let members = "4 0 5 4 ";
        let body = format!("{}(a) (bc)", members);
        let pdf = build(
            &[
                "<< /Type /Catalog >>",
                &format!(
                    "<< /Type /ObjStm /N 2 /First {} /Length {} >>\nstream\n{}\nendstream",
                    members.len(),
                    body.len(),
                    body
                ),
            ],
            "",
        );
        let mut store = ObjectStore::load(&pdf).unwrap();
        store.xref.entries.insert(4, XrefEntry::Compressed { container: 2, index: 0 });
        store.xref.entries.insert(5, XrefEntry::Compressed { container: 2, index: 1 });

        assert_eq!(store.resolve(ObjRef::new(4, 0)).unwrap(), PdfValue::String(b"a".to_vec()));
        assert_eq!(store.resolve(ObjRef::new(5, 0)).unwrap(), PdfValue::String(b"bc".to_vec()));
    }

    #[test]
    fn test_object_stream_with_absurd_count() {
        let members = "4 0 ";
        let body = format!("{}(a)", members);
        let pdf = build(
            &[
                "<< /Type /Catalog >>",
                &format!(
                    "<< /Type /ObjStm /N 4000000000000 /First {} /Length {} >>\nstream\n{}\nendstream",
                    members.len(),
                    body.len(),
                    body
                ),
            ],
            "",
        );
        let mut store = ObjectStore::load(&pdf).unwrap();
        store.xref.entries.insert(4, XrefEntry::Compressed { container: 2, index: 0 });
        assert_eq!(store.resolve(ObjRef::new(4, 0)).unwrap(), PdfValue::String(b"a".to_vec()));
    }

    #[test]
    fn test_encrypted_document_with_empty_password() {
        use crate::parser::crypt::tests::{rc4_encrypt, rc4_encrypt_dict};

        let id0 = b"0123456789abcdef";
        let (dict, key) = rc4_encrypt_dict(id0);
        let secret = rc4_encrypt(&key, ObjRef::new(2, 0), b"Secret");
        let hex = |b: &[u8]| b.iter().map(|x| format!("{:02X}", x)).collect::<String>();
        let encrypt = format!(
            "<< /Filter /Standard /V 2 /R 3 /Length 128 /P -4 /O <{}> /U <{}> >>",
            hex(dict.get("O").and_then(PdfValue::as_string).unwrap()),
            hex(dict.get("U").and_then(PdfValue::as_string).unwrap()),
        );
        let pdf = build(
            &["<< /Type /Catalog >>", &format!("<{}>", hex(&secret)), &encrypt],
            &format!("/Encrypt 3 0 R /ID [<{}> <{}>]", hex(id0), hex(id0)),
        );

        let store = ObjectStore::load(&pdf).unwrap();
        assert!(store.is_encrypted());
        assert_eq!(
            store.resolve(ObjRef::new(2, 0)).unwrap(),
            PdfValue::String(b"Secret".to_vec())
        );
    }
}
