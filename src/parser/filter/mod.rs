//! Stream filters.
//!
//! Text extraction only needs the general-purpose filters. Image codecs
//! (DCT, JPX, CCITT, JBIG2) are recognised and reported as unsupported so the
//! caller can skip the stream instead of failing the document.

mod ascii;
mod flate;
mod lzw;
mod predictor;
mod run_length;

use super::object::Dict;
use crate::error::ParseError;

/// A stream filter named in a `/Filter` entry.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Filter {
    AsciiHexDecode,
    Ascii85Decode,
    LzwDecode,
    FlateDecode,
    RunLengthDecode,
    /// `/Crypt` with the identity crypt filter.
    Crypt,
    /// Recognised image codecs this crate does not decode.
    Image(&'static str),
}

impl Filter {
    /// Look up a filter by its full or abbreviated name.
    pub fn from_name(name: &str) -> Result<Self, ParseError> {
        Ok(match name {
            "ASCIIHexDecode" | "AHx" => Filter::AsciiHexDecode,
            "ASCII85Decode" | "A85" => Filter::Ascii85Decode,
            "LZWDecode" | "LZW" => Filter::LzwDecode,
            "FlateDecode" | "Fl" => Filter::FlateDecode,
            "RunLengthDecode" | "RL" => Filter::RunLengthDecode,
            "Crypt" => Filter::Crypt,
            "DCTDecode" | "DCT" => Filter::Image("DCTDecode"),
            "JPXDecode" => Filter::Image("JPXDecode"),
            "CCITTFaxDecode" | "CCF" => Filter::Image("CCITTFaxDecode"),
            "JBIG2Decode" => Filter::Image("JBIG2Decode"),
            other => return Err(ParseError::UnsupportedFilter(other.to_string())),
        })
    }

    pub fn name(&self) -> &'static str {
        match self {
            Filter::AsciiHexDecode => "ASCIIHexDecode",
            Filter::Ascii85Decode => "ASCII85Decode",
            Filter::LzwDecode => "LZWDecode",
            Filter::FlateDecode => "FlateDecode",
            Filter::RunLengthDecode => "RunLengthDecode",
            Filter::Crypt => "Crypt",
            Filter::Image(name) => name,
        }
    }

    /// Decode `data` with this filter.
    pub fn apply(&self, data: &[u8], params: Option<&Dict>) -> Result<Vec<u8>, ParseError> {
        let corrupt = |reason: &str| ParseError::CorruptStream {
            filter: self.name().to_string(),
            reason: reason.to_string(),
        };

        match self {
            Filter::AsciiHexDecode => ascii::decode_hex(data).ok_or_else(|| corrupt("invalid hex digit")),
            Filter::Ascii85Decode => ascii::decode_85(data).ok_or_else(|| corrupt("invalid base-85 data")),
            Filter::RunLengthDecode => Ok(run_length::decode(data)),
            Filter::FlateDecode => {
                let decoded = flate::decode(data).map_err(|e| corrupt(&e))?;
                predictor::apply(decoded, params).map_err(|e| corrupt(&e))
            }
            Filter::LzwDecode => {
                let early_change = params
                    .and_then(|p| p.get_i64("EarlyChange"))
                    .map_or(true, |e| e != 0);
                let decoded = lzw::decode(data, early_change).ok_or_else(|| corrupt("invalid code"))?;
                predictor::apply(decoded, params).map_err(|e| corrupt(&e))
            }
            Filter::Crypt => match params.and_then(|p| p.get_name("Name")) {
                None | Some("Identity") => Ok(data.to_vec()),
                Some(other) => Err(ParseError::UnsupportedFilter(format!("Crypt/{}", other))),
            },
            Filter::Image(name) => Err(ParseError::UnsupportedFilter(name.to_string())),
        }
    }
}

/// Run a whole filter chain.
pub fn decode_chain(data: &[u8], chain: &[(String, Option<Dict>)]) -> Result<Vec<u8>, ParseError> {
    let mut current = data.to_vec();
    for (name, params) in chain {
        let filter = Filter::from_name(name)?;
        current = filter.apply(&current, params.as_ref())?;
    }
    Ok(current)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_abbreviated_names() {
        assert_eq!(Filter::from_name("Fl").unwrap(), Filter::FlateDecode);
        assert_eq!(Filter::from_name("AHx").unwrap(), Filter::AsciiHexDecode);
    }

    #[test]
    fn test_unknown_filter_is_unsupported() {
        let err = Filter::from_name("BogusDecode").unwrap_err();
        assert_eq!(err, ParseError::UnsupportedFilter("BogusDecode".into()));
    }

    #[test]
    fn test_image_filter_is_unsupported() {
        let filter = Filter::from_name("DCTDecode").unwrap();
        let err = filter.apply(b"\xFF\xD8", None).unwrap_err();
        assert_eq!(err, ParseError::UnsupportedFilter("DCTDecode".into()));
    }

    #[test]
    fn test_chain_hex_then_run_length() {
        // Hex of [2, b'a', b'b', b'c', 128]
        let chain = vec![
            ("ASCIIHexDecode".to_string(), None),
            ("RunLengthDecode".to_string(), None),
        ];
        assert_eq!(decode_chain(b"0261626380>", &chain).unwrap(), b"abc");
    }
}
