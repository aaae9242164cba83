//! Built-in advance widths for the standard 14 fonts.
//!
//! Only the printable ASCII range is tabulated; other codes use the
//! family's typical width. Common TrueType clones (Arial, Times New Roman,
//! Courier New) share the metrics of the face they imitate.

/// Width table for one standard face.
#[derive(Debug, Clone, Copy)]
pub struct StandardMetrics {
    widths: Option<&'static [u16; 95]>,
    default_width: u16,
}

impl StandardMetrics {
    const COURIER: Self = Self {
        widths: None,
        default_width: 600,
    };

    /// Advance of `code` in thousandths of an em.
    pub fn width(&self, code: u8) -> f64 {
        let width = match (self.widths, code) {
            (Some(table), 32..=126) => table[(code - 32) as usize],
            _ => self.default_width,
        };
        width as f64
    }

    /// Typical width used for unknown codes.
    pub fn default_width(&self) -> f64 {
        self.default_width as f64
    }

    /// Metrics for a font name, if it is (or imitates) a standard face.
    pub fn for_name(name: &str) -> Option<Self> {
        let lower = name.to_ascii_lowercase().replace([' ', '-', ','], "");
        let bold = lower.contains("bold") || lower.contains("black") || lower.contains("heavy");

        if lower.starts_with("courier") {
            return Some(Self::COURIER);
        }
        if lower.starts_with("helvetica") || lower.starts_with("arial") {
            return Some(Self::sans(bold));
        }
        if lower.starts_with("times") {
            return Some(Self::serif(bold));
        }
        None
    }

    /// Best guess for fonts without any width information.
    pub fn guess(name: &str, serif: bool, fixed_pitch: bool) -> Self {
        if let Some(metrics) = Self::for_name(name) {
            return metrics;
        }
        let lower = name.to_ascii_lowercase();
        let bold = lower.contains("bold") || lower.contains("black") || lower.contains("heavy");
        if fixed_pitch || lower.contains("mono") {
            Self::COURIER
        } else if serif {
            Self::serif(bold)
        } else {
            Self::sans(bold)
        }
    }

    fn sans(bold: bool) -> Self {
        Self {
            widths: Some(if bold { &HELVETICA_BOLD } else { &HELVETICA }),
            default_width: 556,
        }
    }

    fn serif(bold: bool) -> Self {
        Self {
            widths: Some(if bold { &TIMES_BOLD } else { &TIMES_ROMAN }),
            default_width: 500,
        }
    }
}

/// Helvetica and Helvetica-Oblique.
static HELVETICA: [u16; 95] = [
    278, 278, 355, 556, 556, 889, 667, 222, 333, 333, 389, 584,
    278, 333, 278, 278, 556, 556, 556, 556, 556, 556, 556, 556,
    556, 556, 278, 278, 584, 584, 584, 556, 1015, 667, 667, 722,
    722, 667, 611, 778, 722, 278, 500, 667, 556, 833, 722, 778,
    667, 778, 722, 667, 611, 722, 667, 944, 667, 667, 611, 278,
    278, 278, 469, 556, 222, 556, 556, 500, 556, 556, 278, 556,
    556, 222, 222, 500, 222, 833, 556, 556, 556, 556, 333, 500,
    278, 556, 500, 722, 500, 500, 500, 334, 260, 334, 584,
];

/// Helvetica-Bold and Helvetica-BoldOblique.
static HELVETICA_BOLD: [u16; 95] = [
    278, 333, 474, 556, 556, 889, 722, 278, 333, 333, 389, 584,
    278, 333, 278, 278, 556, 556, 556, 556, 556, 556, 556, 556,
    556, 556, 333, 333, 584, 584, 584, 611, 975, 722, 722, 722,
    722, 667, 611, 778, 722, 278, 556, 722, 611, 833, 722, 778,
    667, 778, 722, 667, 611, 722, 667, 944, 667, 667, 611, 333,
    278, 333, 584, 556, 278, 556, 611, 556, 611, 556, 333, 611,
    611, 278, 278, 556, 278, 889, 611, 611, 611, 611, 389, 556,
    333, 611, 556, 778, 556, 556, 500, 389, 280, 389, 584,
];

/// Times-Roman; also used for Times-Italic.
static TIMES_ROMAN: [u16; 95] = [
    250, 333, 408, 500, 500, 833, 778, 333, 333, 333, 500, 564,
    250, 333, 250, 278, 500, 500, 500, 500, 500, 500, 500, 500,
    500, 500, 278, 278, 564, 564, 564, 444, 921, 722, 667, 667,
    722, 611, 556, 722, 722, 333, 389, 722, 611, 889, 722, 722,
    556, 722, 667, 556, 611, 722, 722, 944, 722, 722, 611, 333,
    278, 333, 469, 500, 333, 444, 500, 444, 500, 444, 333, 500,
    500, 278, 278, 500, 278, 778, 500, 500, 500, 500, 333, 389,
    278, 500, 500, 722, 500, 500, 444, 480, 200, 480, 541,
];

/// Times-Bold; also used for Times-BoldItalic.
static TIMES_BOLD: [u16; 95] = [
    250, 333, 555, 500, 500, 1000, 833, 333, 333, 333, 500, 570,
    250, 333, 250, 278, 500, 500, 500, 500, 500, 500, 500, 500,
    500, 500, 333, 333, 570, 570, 570, 500, 930, 722, 667, 722,
    722, 667, 611, 778, 778, 389, 500, 778, 667, 944, 722, 778,
    611, 778, 722, 556, 667, 722, 722, 1000, 722, 722, 667, 333,
    278, 333, 581, 500, 333, 500, 556, 444, 556, 444, 333, 500,
    556, 278, 333, 556, 278, 833, 556, 500, 556, 556, 444, 389,
    333, 556, 500, 722, 500, 500, 444, 394, 220, 394, 520,
];
