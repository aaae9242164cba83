/// Decode RunLengthDecode data. Truncated input yields what was decoded so far.
pub fn decode(data: &[u8]) -> Vec<u8> {
    let mut out = Vec::new();
    let mut i = 0;

    while let Some(&length) = data.get(i) {
        i += 1;
        match length {
            128 => return out,
            0..=127 => {
                let end = (i + length as usize + 1).min(data.len());
                out.extend_from_slice(&data[i..end]);
                i = end;
            }
            _ => {
                let Some(&byte) = data.get(i) else {
                    break;
                };
                i += 1;
                out.extend(std::iter::repeat(byte).take(257 - length as usize));
            }
        }
    }

    log::warn!("run-length stream ended without EOD marker");
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_run_length() {
        let input = [4, 10, 11, 12, 13, 14, 253, 3, 128];
        assert_eq!(decode(&input), vec![10, 11, 12, 13, 14, 3, 3, 3, 3]);
    }
}
