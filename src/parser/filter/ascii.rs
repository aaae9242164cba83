//! ASCIIHexDecode and ASCII85Decode.

use crate::parser::lexer::{hex_value, is_whitespace};

/// Decode hex pairs up to `>`; whitespace is ignored and an odd trailing
/// digit is padded with zero.
pub fn decode_hex(data: &[u8]) -> Option<Vec<u8>> {
    let mut out = Vec::with_capacity(data.len() / 2);
    let mut high: Option<u8> = None;

    for &b in data {
        if b == b'>' {
            break;
        }
        if is_whitespace(b) {
            continue;
        }
        let nibble = hex_value(b)?;
        match high.take() {
            Some(h) => out.push((h << 4) | nibble),
            None => high = Some(nibble),
        }
    }

    if let Some(h) = high {
        out.push(h << 4);
    }
    Some(out)
}

/// Decode base-85 data up to `~>`.
pub fn decode_85(data: &[u8]) -> Option<Vec<u8>> {
    let mut out = Vec::with_capacity(data.len() * 4 / 5);
    let mut group = [0u8; 5];
    let mut len = 0;

    let body = data.strip_prefix(b"<~").unwrap_or(data);
    for &b in body {
        match b {
            b'~' => break,
            b'z' if len == 0 => out.extend_from_slice(&[0; 4]),
            b'!'..=b'u' => {
                group[len] = b - b'!';
                len += 1;
                if len == 5 {
                    out.extend_from_slice(&word(group)?);
                    len = 0;
                }
            }
            b if is_whitespace(b) => {}
            _ => return None,
        }
    }

    if len == 1 {
        return None;
    }
    if len > 0 {
        for slot in group.iter_mut().skip(len) {
            *slot = b'u' - b'!';
        }
        let tail = word(group)?;
        out.extend_from_slice(&tail[..len - 1]);
    }
    Some(out)
}

fn word(group: [u8; 5]) -> Option<[u8; 4]> {
    let value = group
        .iter()
        .fold(0u64, |acc, &d| acc * 85 + u64::from(d));
    // 85^5 exceeds 2^32, so a malformed group may overflow.
    u32::try_from(value).ok().map(u32::to_be_bytes)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hex() {
        assert_eq!(decode_hex(b"48 65 6c 6C 6f>").unwrap(), b"Hello");
        assert_eq!(decode_hex(b"7>").unwrap(), vec![0x70]);
        assert!(decode_hex(b"4G>").is_none());
    }

    #[test]
    fn test_85() {
        assert_eq!(decode_85(b"87cURDZ~>").unwrap(), b"Hello");
        assert_eq!(decode_85(b"<~87cU RDZ~>").unwrap(), b"Hello");
        assert_eq!(decode_85(b"z~>").unwrap(), vec![0; 4]);
    }
}
