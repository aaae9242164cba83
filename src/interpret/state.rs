//! Graphics and text state.

use std::sync::Arc;

use super::font::FontInfo;

/// A PDF transformation matrix `[a b c d e f]`.
///
/// Points are row vectors: `[x y 1] × M`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Matrix {
    pub a: f64,
    pub b: f64,
    pub c: f64,
    pub d: f64,
    pub e: f64,
    pub f: f64,
}

impl Default for Matrix {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl Matrix {
    pub const IDENTITY: Matrix = Matrix {
        a: 1.0,
        b: 0.0,
        c: 0.0,
        d: 1.0,
        e: 0.0,
        f: 0.0,
    };

    pub fn new(a: f64, b: f64, c: f64, d: f64, e: f64, f: f64) -> Self {
        Self { a, b, c, d, e, f }
    }

    /// Build from six operands, if all are present.
    pub fn from_slice(values: &[f64]) -> Option<Self> {
        match values {
            [a, b, c, d, e, f] => Some(Self::new(*a, *b, *c, *d, *e, *f)),
            _ => None,
        }
    }

    pub fn translation(tx: f64, ty: f64) -> Self {
        Self::new(1.0, 0.0, 0.0, 1.0, tx, ty)
    }

    /// `self × other`: apply `self` first, then `other`.
    pub fn multiply(&self, other: &Matrix) -> Matrix {
        Matrix {
            a: self.a * other.a + self.b * other.c,
            b: self.a * other.b + self.b * other.d,
            c: self.c * other.a + self.d * other.c,
            d: self.c * other.b + self.d * other.d,
            e: self.e * other.a + self.f * other.c + other.e,
            f: self.e * other.b + self.f * other.d + other.f,
        }
    }

    pub fn transform_point(&self, x: f64, y: f64) -> (f64, f64) {
        (self.a * x + self.c * y + self.e, self.b * x + self.d * y + self.f)
    }

    /// Length of the transformed unit y vector.
    pub fn vertical_scale(&self) -> f64 {
        (self.c * self.c + self.d * self.d).sqrt()
    }

    pub fn is_finite(&self) -> bool {
        [self.a, self.b, self.c, self.d, self.e, self.f]
            .iter()
            .all(|v| v.is_finite())
    }
}

/// Text state parameters (`Tc`, `Tw`, `Tz`, `TL`, `Ts`, `Tr`, `Tf`).
#[derive(Debug, Clone)]
pub struct TextState {
    pub char_spacing: f64,
    pub word_spacing: f64,
    /// `Tz / 100`
    pub horizontal_scale: f64,
    pub leading: f64,
    pub rise: f64,
    pub render_mode: i64,
    pub font: Option<Arc<FontInfo>>,
    pub font_size: f64,
}

impl Default for TextState {
    fn default() -> Self {
        Self {
            char_spacing: 0.0,
            word_spacing: 0.0,
            horizontal_scale: 1.0,
            leading: 0.0,
            rise: 0.0,
            render_mode: 0,
            font: None,
            font_size: 0.0,
        }
    }
}

/// The part of the graphics state saved by `q` and restored by `Q`.
#[derive(Debug, Clone, Default)]
pub struct GraphicsState {
    pub ctm: Matrix,
    pub text: TextState,
}

/// Text object state: reset by `BT`, discarded by `ET`.
#[derive(Debug, Clone, Copy, Default)]
pub struct TextObject {
    /// Text matrix `Tm`
    pub matrix: Matrix,
    /// Text line matrix `Tlm`
    pub line_matrix: Matrix,
}

impl TextObject {
    /// Start a new line offset from the current line start (`Td`).
    pub fn move_line(&mut self, tx: f64, ty: f64) {
        self.line_matrix = Matrix::translation(tx, ty).multiply(&self.line_matrix);
        self.matrix = self.line_matrix;
    }

    /// Set both matrices (`Tm`).
    pub fn set_matrix(&mut self, matrix: Matrix) {
        self.matrix = matrix;
        self.line_matrix = matrix;
    }

    /// Move the pen along the baseline by `tx` text-space units.
    pub fn advance(&mut self, tx: f64) {
        self.matrix = Matrix::translation(tx, 0.0).multiply(&self.matrix);
    }
}
