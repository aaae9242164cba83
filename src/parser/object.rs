//! PDF value types.
//!
//! Objects are plain data: a reference is just an `(object, generation)` pair
//! that the [`ObjectStore`](super::ObjectStore) looks up on demand. Nothing in
//! here owns another indirect object, so cyclic graphs are representable
//! without cyclic ownership.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

/// Identifier of an indirect object.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObjRef {
    /// Object number
    pub num: u32,
    /// Generation number
    pub gen: u16,
}

impl ObjRef {
    /// Create a new reference.
    pub fn new(num: u32, gen: u16) -> Self {
        Self { num, gen }
    }
}

impl fmt::Display for ObjRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} R", self.num, self.gen)
    }
}

/// A PDF value.
#[derive(Debug, Clone, PartialEq)]
pub enum PdfValue {
    Null,
    Boolean(bool),
    Integer(i64),
    Real(f64),
    /// Literal or hexadecimal string, already unescaped.
    String(Vec<u8>),
    Name(String),
    Array(Vec<PdfValue>),
    Dictionary(Dict),
    Stream(Stream),
    Reference(ObjRef),
}

impl PdfValue {
    /// Numeric value of an integer or real.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            PdfValue::Integer(i) => Some(*i as f64),
            PdfValue::Real(r) => Some(*r),
            _ => None,
        }
    }

    /// Numeric value narrowed to `f32`.
    pub fn as_f32(&self) -> Option<f32> {
        self.as_f64().map(|v| v as f32)
    }

    /// Integer value; reals are truncated.
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            PdfValue::Integer(i) => Some(*i),
            PdfValue::Real(r) if r.is_finite() => Some(*r as i64),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            PdfValue::Boolean(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_name(&self) -> Option<&str> {
        match self {
            PdfValue::Name(n) => Some(n),
            _ => None,
        }
    }

    pub fn as_string(&self) -> Option<&[u8]> {
        match self {
            PdfValue::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&[PdfValue]> {
        match self {
            PdfValue::Array(a) => Some(a),
            _ => None,
        }
    }

    /// The dictionary of a dictionary or stream value.
    pub fn as_dict(&self) -> Option<&Dict> {
        match self {
            PdfValue::Dictionary(d) => Some(d),
            PdfValue::Stream(s) => Some(&s.dict),
            _ => None,
        }
    }

    pub fn as_stream(&self) -> Option<&Stream> {
        match self {
            PdfValue::Stream(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_reference(&self) -> Option<ObjRef> {
        match self {
            PdfValue::Reference(r) => Some(*r),
            _ => None,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, PdfValue::Null)
    }

    /// Short type name used in log messages.
    pub fn type_name(&self) -> &'static str {
        match self {
            PdfValue::Null => "null",
            PdfValue::Boolean(_) => "boolean",
            PdfValue::Integer(_) => "integer",
            PdfValue::Real(_) => "real",
            PdfValue::String(_) => "string",
            PdfValue::Name(_) => "name",
            PdfValue::Array(_) => "array",
            PdfValue::Dictionary(_) => "dictionary",
            PdfValue::Stream(_) => "stream",
            PdfValue::Reference(_) => "reference",
        }
    }
}

/// A PDF dictionary with deterministic key order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Dict(BTreeMap<String, PdfValue>);

impl Dict {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &str) -> Option<&PdfValue> {
        self.0.get(key)
    }

    pub fn insert(&mut self, key: impl Into<String>, value: PdfValue) {
        self.0.insert(key.into(), value);
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &PdfValue)> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Direct name value of `key`.
    pub fn get_name(&self, key: &str) -> Option<&str> {
        self.get(key).and_then(PdfValue::as_name)
    }

    /// Direct integer value of `key`.
    pub fn get_i64(&self, key: &str) -> Option<i64> {
        self.get(key).and_then(PdfValue::as_i64)
    }

    /// Direct numeric value of `key`.
    pub fn get_f64(&self, key: &str) -> Option<f64> {
        self.get(key).and_then(PdfValue::as_f64)
    }

    /// Whether `/Type` equals `ty`.
    pub fn has_type(&self, ty: &str) -> bool {
        self.get_name("Type") == Some(ty)
    }
}

impl FromIterator<(String, PdfValue)> for Dict {
    fn from_iter<T: IntoIterator<Item = (String, PdfValue)>>(iter: T) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// A stream object: its dictionary plus the raw (still encoded) bytes.
///
/// The bytes are shared so cloning a resolved stream out of the object cache
/// does not copy the payload.
#[derive(Debug, Clone, PartialEq)]
pub struct Stream {
    pub dict: Dict,
    data: Arc<[u8]>,
}

impl Stream {
    pub fn new(dict: Dict, data: Vec<u8>) -> Self {
        Self {
            dict,
            data: data.into(),
        }
    }

    /// Encoded bytes exactly as stored in the file (after decryption).
    pub fn raw_data(&self) -> &[u8] {
        &self.data
    }

    pub(crate) fn set_raw_data(&mut self, data: Vec<u8>) {
        self.data = data.into();
    }

    /// The filter chain with each filter's decode parameters, in application order.
    ///
    /// Filter names and parameters may be direct only; indirect entries are
    /// resolved by the store before this is called.
    pub fn filters(&self) -> Vec<(String, Option<Dict>)> {
        filter_chain(self.dict.get("Filter"), self.dict.get("DecodeParms"))
    }
}

/// Pair up `/Filter` and `/DecodeParms` entries (either may be a single value or an array).
pub(crate) fn filter_chain(
    filter: Option<&PdfValue>,
    params: Option<&PdfValue>,
) -> Vec<(String, Option<Dict>)> {
    let names: Vec<String> = match filter {
        Some(PdfValue::Name(n)) => vec![n.clone()],
        Some(PdfValue::Array(items)) => items
            .iter()
            .filter_map(|v| v.as_name().map(str::to_string))
            .collect(),
        _ => Vec::new(),
    };

    let params: Vec<Option<Dict>> = match params {
        Some(PdfValue::Dictionary(d)) => vec![Some(d.clone())],
        Some(PdfValue::Array(items)) => items.iter().map(|v| v.as_dict().cloned()).collect(),
        _ => Vec::new(),
    };

    names
        .into_iter()
        .enumerate()
        .map(|(i, name)| (name, params.get(i).cloned().flatten()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_obj_ref_display() {
        assert_eq!(ObjRef::new(12, 0).to_string(), "12 0 R");
    }

    #[test]
    fn test_numeric_accessors() {
        assert_eq!(PdfValue::Integer(3).as_f64(), Some(3.0));
        assert_eq!(PdfValue::Real(2.5).as_i64(), Some(2));
        assert_eq!(PdfValue::Name("X".into()).as_f64(), None);
    }

    #[test]
    fn test_filter_chain_pairs_params() {
        let mut parms = Dict::new();
        parms.insert("Predictor", PdfValue::Integer(12));
        let filter = PdfValue::Array(vec![
            PdfValue::Name("ASCII85Decode".into()),
            PdfValue::Name("FlateDecode".into()),
        ]);
        let params = PdfValue::Array(vec![PdfValue::Null, PdfValue::Dictionary(parms)]);

        let chain = filter_chain(Some(&filter), Some(&params));
        assert_eq!(chain.len(), 2);
        assert_eq!(chain[0].0, "ASCII85Decode");
        assert!(chain[0].1.is_none());
        assert_eq!(chain[1].1.as_ref().and_then(|d| d.get_i64("Predictor")), Some(12));
    }

    #[test]
    fn test_single_filter() {
        let chain = filter_chain(Some(&PdfValue::Name("FlateDecode".into())), None);
        assert_eq!(chain, vec![("FlateDecode".to_string(), None)]);
    }
}
