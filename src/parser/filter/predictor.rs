//! PNG and TIFF predictors for Flate and LZW streams.

use crate::parser::object::Dict;

struct PredictorParams {
    predictor: i64,
    colors: usize,
    bits_per_component: usize,
    columns: usize,
}

impl PredictorParams {
    fn from_params(dict: Option<&Dict>) -> Self {
        let get = |key: &str, default: i64| dict.and_then(|d| d.get_i64(key)).unwrap_or(default);
        Self {
            predictor: get("Predictor", 1),
            colors: get("Colors", 1).clamp(1, 32) as usize,
            bits_per_component: get("BitsPerComponent", 8).clamp(1, 16) as usize,
            columns: get("Columns", 1).clamp(1, 1 << 20) as usize,
        }
    }

    fn bytes_per_pixel(&self) -> usize {
        (self.bits_per_component * self.colors).div_ceil(8)
    }

    fn row_length(&self) -> usize {
        (self.columns * self.colors * self.bits_per_component).div_ceil(8)
    }
}

/// Undo the predictor named in `params`, if any.
pub fn apply(data: Vec<u8>, params: Option<&Dict>) -> Result<Vec<u8>, String> {
    let params = PredictorParams::from_params(params);
    match params.predictor {
        1 => Ok(data),
        2 => Ok(tiff(data, &params)),
        10..=15 => Ok(png(&data, &params)),
        other => Err(format!("unknown predictor {}", other)),
    }
}

fn png(data: &[u8], params: &PredictorParams) -> Vec<u8> {
    let row_len = params.row_length();
    let bpp = params.bytes_per_pixel();
    let mut out = Vec::with_capacity(data.len());
    let mut prev = vec![0u8; row_len];

    for chunk in data.chunks(row_len + 1) {
        let (kind, input) = (chunk[0], &chunk[1..]);
        let mut row = vec![0u8; row_len];
        for i in 0..input.len() {
            let left = if i >= bpp { row[i - bpp] } else { 0 };
            let up = prev[i];
            let up_left = if i >= bpp { prev[i - bpp] } else { 0 };
            let predicted = match kind {
                1 => left,
                2 => up,
                3 => ((u16::from(left) + u16::from(up)) / 2) as u8,
                4 => paeth(left, up, up_left),
                _ => 0,
            };
            row[i] = input[i].wrapping_add(predicted);
        }
        out.extend_from_slice(&row[..input.len()]);
        prev = row;
    }

    out
}

fn paeth(a: u8, b: u8, c: u8) -> u8 {
    let p = i16::from(a) + i16::from(b) - i16::from(c);
    let pa = (p - i16::from(a)).abs();
    let pb = (p - i16::from(b)).abs();
    let pc = (p - i16::from(c)).abs();
    if pa <= pb && pa <= pc {
        a
    } else if pb <= pc {
        b
    } else {
        c
    }
}

fn tiff(mut data: Vec<u8>, params: &PredictorParams) -> Vec<u8> {
    if params.bits_per_component != 8 {
        log::warn!(
            "TIFF predictor with {} bits per component left undecoded",
            params.bits_per_component
        );
        return data;
    }
    let row_len = params.row_length();
    for row in data.chunks_mut(row_len) {
        for i in params.colors..row.len() {
            row[i] = row[i].wrapping_add(row[i - params.colors]);
        }
    }
    data
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::object::PdfValue;

    fn params(predictor: i64, columns: i64) -> Dict {
        let mut d = Dict::new();
        d.insert("Predictor", PdfValue::Integer(predictor));
        d.insert("Columns", PdfValue::Integer(columns));
        d
    }

    #[test]
    fn test_png_up() {
        let data = vec![2, 1, 2, 3, 2, 1, 1, 1];
        let out = apply(data, Some(&params(12, 3))).unwrap();
        assert_eq!(out, vec![1, 2, 3, 2, 3, 4]);
    }

    #[test]
    fn test_png_sub() {
        let data = vec![1, 5, 1, 1];
        let out = apply(data, Some(&params(11, 3))).unwrap();
        assert_eq!(out, vec![5, 6, 7]);
    }

    #[test]
    fn test_no_predictor() {
        assert_eq!(apply(vec![9, 9], None).unwrap(), vec![9, 9]);
    }
}
