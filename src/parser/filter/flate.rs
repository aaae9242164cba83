use std::io::Read;

use flate2::read::{DeflateDecoder, ZlibDecoder};

/// Inflate zlib data, falling back to raw deflate.
///
/// A stream that breaks off mid-way still yields its decoded prefix, since
/// damaged content streams usually carry most of their text before the
/// corruption.
pub fn decode(data: &[u8]) -> Result<Vec<u8>, String> {
    let mut out = Vec::new();
    match ZlibDecoder::new(data).read_to_end(&mut out) {
        Ok(_) => return Ok(out),
        Err(e) if !out.is_empty() => {
            log::warn!("flate stream truncated after {} bytes: {}", out.len(), e);
            return Ok(out);
        }
        Err(_) => {}
    }

    let mut out = Vec::new();
    match DeflateDecoder::new(data).read_to_end(&mut out) {
        Ok(_) => Ok(out),
        Err(e) if !out.is_empty() => {
            log::warn!("raw deflate stream truncated after {} bytes: {}", out.len(), e);
            Ok(out)
        }
        Err(e) => Err(e.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use flate2::write::ZlibEncoder;
    use flate2::Compression;
    use std::io::Write;

    #[test]
    fn test_zlib() {
        let mut enc = ZlibEncoder::new(Vec::new(), Compression::default());
        enc.write_all(b"BT /F1 12 Tf (Hi) Tj ET").unwrap();
        let compressed = enc.finish().unwrap();
        assert_eq!(decode(&compressed).unwrap(), b"BT /F1 12 Tf (Hi) Tj ET");
    }

    #[test]
    fn test_garbage_fails() {
        assert!(decode(b"\x00\x01\x02 not deflate at all").is_err());
    }
}
