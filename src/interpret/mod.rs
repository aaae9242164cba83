//! Content Interpreter.
//!
//! Executes a page's content stream and produces positioned text runs.
//! Only the text-relevant part of the graphics model is tracked: the
//! transformation matrix, text state and the save/restore stack. Drawing,
//! colour and image operators are parsed and ignored.

pub mod font;
mod ops;
mod state;

pub use font::{EncodingTables, FontCache, FontInfo, Glyph};
pub use ops::{parse_content, ContentOps, Operation, Operator};
pub use state::{GraphicsState, Matrix, TextObject, TextState};

use std::collections::HashSet;
use std::sync::Arc;

use serde::Serialize;

use crate::diagnostics::{Diagnostic, DiagnosticKind};
use crate::error::ParseError;
use crate::parser::{Dict, ObjRef, ObjectStore, Page, PdfValue};

/// Form XObjects nested deeper than this are not entered.
const MAX_FORM_DEPTH: usize = 8;

/// `q` nesting beyond this is ignored.
const MAX_STATE_DEPTH: usize = 256;

/// A `TJ` adjustment moving the pen right by more than this many
/// thousandths of an em ends the current run.
const RUN_BREAK_THOUSANDTHS: f64 = 200.0;

/// Size assumed when text is shown before any `Tf`.
const DEFAULT_FONT_SIZE: f64 = 12.0;

/// A piece of text drawn with one font at one position.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TextRun {
    /// Unicode text
    pub text: String,
    /// Baseline origin, in points from the page's lower-left corner
    pub x: f64,
    pub y: f64,
    /// Horizontal extent of the run
    pub width: f64,
    /// Effective font size in points
    pub font_size: f64,
    pub bold: bool,
    pub italic: bool,
    /// 0-based page index
    pub page_index: usize,
}

impl TextRun {
    /// Right edge of the run.
    pub fn right(&self) -> f64 {
        self.x + self.width
    }
}

/// Output of interpreting one page.
#[derive(Debug, Default)]
pub struct PageText {
    pub runs: Vec<TextRun>,
    pub diagnostics: Vec<Diagnostic>,
}

/// Runs content streams against a shared object store and font cache.
pub struct Interpreter<'a> {
    store: &'a ObjectStore,
    fonts: &'a FontCache,
    tables: &'a EncodingTables,
}

impl<'a> Interpreter<'a> {
    pub fn new(store: &'a ObjectStore, fonts: &'a FontCache, tables: &'a EncodingTables) -> Self {
        Self { store, fonts, tables }
    }

    /// Extract the text runs of `page`.
    ///
    /// Fails only when the page's content streams cannot be decoded.
    /// Malformed operators and missing fonts are reported as diagnostics.
    pub fn interpret(&self, page: &Page) -> Result<PageText, ParseError> {
        let content = self.store.page_content(page)?;

        // Coordinates are made relative to the visible area.
        let origin = Matrix::translation(-page.crop_box.x0, -page.crop_box.y0);
        let mut exec = Execution::new(self, page.index, origin);
        exec.run(&content, &page.resources, 0);
        let text = exec.finish();

        log::debug!(
            "page {}: {} runs, {} diagnostics",
            page.index + 1,
            text.runs.len(),
            text.diagnostics.len()
        );
        Ok(text)
    }
}

/// Interpret `page` with a fresh font cache and the global tables.
pub fn interpret(store: &ObjectStore, page: &Page) -> Result<Vec<TextRun>, ParseError> {
    let fonts = FontCache::new();
    let interpreter = Interpreter::new(store, &fonts, EncodingTables::global());
    Ok(interpreter.interpret(page)?.runs)
}

/// A run being accumulated glyph by glyph.
struct PendingRun {
    text: String,
    x: f64,
    y: f64,
    end_x: f64,
    font_size: f64,
    bold: bool,
    italic: bool,
}

/// Mutable state for one page.
struct Execution<'i, 'a> {
    interp: &'i Interpreter<'a>,
    page_index: usize,
    gs: GraphicsState,
    stack: Vec<GraphicsState>,
    text: TextObject,
    pending: Option<PendingRun>,
    runs: Vec<TextRun>,
    active_forms: HashSet<ObjRef>,
    fallback: Option<Arc<FontInfo>>,
    missing_fonts: HashSet<String>,
    malformed: usize,
    diagnostics: Vec<Diagnostic>,
}

impl<'i, 'a> Execution<'i, 'a> {
    fn new(interp: &'i Interpreter<'a>, page_index: usize, ctm: Matrix) -> Self {
        Self {
            interp,
            page_index,
            gs: GraphicsState {
                ctm,
                ..GraphicsState::default()
            },
            stack: Vec::new(),
            text: TextObject::default(),
            pending: None,
            runs: Vec::new(),
            active_forms: HashSet::new(),
            fallback: None,
            missing_fonts: HashSet::new(),
            malformed: 0,
            diagnostics: Vec::new(),
        }
    }

    fn finish(mut self) -> PageText {
        self.flush();
        if self.malformed > 0 {
            log::warn!(
                "page {}: skipped {} malformed content-stream items",
                self.page_index + 1,
                self.malformed
            );
            self.diagnostics.push(
                Diagnostic::new(
                    DiagnosticKind::MalformedOperator,
                    format!("{} malformed content-stream items skipped", self.malformed),
                )
                .on_page(self.page_index + 1),
            );
        }
        PageText {
            runs: self.runs,
            diagnostics: self.diagnostics,
        }
    }

    fn run(&mut self, content: &[u8], resources: &Dict, depth: usize) {
        let parsed = parse_content(content);
        self.malformed += parsed.malformed;
        for op in &parsed.operations {
            self.execute(op, resources, depth);
        }
    }

    fn execute(&mut self, op: &Operation, resources: &Dict, depth: usize) {
        let operands = op.operands.as_slice();
        match op.operator {
            Operator::Save => {
                if self.stack.len() < MAX_STATE_DEPTH {
                    self.stack.push(self.gs.clone());
                }
            }
            Operator::Restore => {
                if let Some(saved) = self.stack.pop() {
                    self.gs = saved;
                }
            }
            Operator::Concat => match numbers(operands, 6).and_then(|v| Matrix::from_slice(&v)) {
                Some(m) if m.is_finite() => self.gs.ctm = m.multiply(&self.gs.ctm),
                _ => self.malformed += 1,
            },
            Operator::BeginText => {
                self.text = TextObject::default();
            }
            Operator::EndText => self.flush(),
            Operator::CharSpacing => self.set_number(operands, |t, v| t.char_spacing = v),
            Operator::WordSpacing => self.set_number(operands, |t, v| t.word_spacing = v),
            Operator::HorizontalScale => self.set_number(operands, |t, v| t.horizontal_scale = v / 100.0),
            Operator::Leading => self.set_number(operands, |t, v| t.leading = v),
            Operator::Rise => self.set_number(operands, |t, v| t.rise = v),
            Operator::RenderMode => self.set_number(operands, |t, v| t.render_mode = v as i64),
            Operator::SetFont => self.set_font(operands, resources),
            Operator::MoveText => match numbers(operands, 2) {
                Some(v) => self.text.move_line(v[0], v[1]),
                None => self.malformed += 1,
            },
            Operator::MoveTextSetLeading => match numbers(operands, 2) {
                Some(v) => {
                    self.gs.text.leading = -v[1];
                    self.text.move_line(v[0], v[1]);
                }
                None => self.malformed += 1,
            },
            Operator::SetTextMatrix => match numbers(operands, 6).and_then(|v| Matrix::from_slice(&v)) {
                Some(m) if m.is_finite() => self.text.set_matrix(m),
                _ => self.malformed += 1,
            },
            Operator::NextLine => self.next_line(),
            Operator::ShowText => match operands.last() {
                Some(PdfValue::String(bytes)) => self.show(bytes),
                _ => self.malformed += 1,
            },
            Operator::ShowTextArray => match operands.last() {
                Some(PdfValue::Array(items)) => self.show_array(items),
                _ => self.malformed += 1,
            },
            Operator::NextLineShowText => match operands.last() {
                Some(PdfValue::String(bytes)) => {
                    self.next_line();
                    self.show(bytes);
                }
                _ => self.malformed += 1,
            },
            Operator::NextLineShowTextSpaced => match operands {
                [.., aw, ac, PdfValue::String(bytes)] => match (aw.as_f64(), ac.as_f64()) {
                    (Some(aw), Some(ac)) => {
                        self.gs.text.word_spacing = aw;
                        self.gs.text.char_spacing = ac;
                        self.next_line();
                        self.show(bytes);
                    }
                    _ => self.malformed += 1,
                },
                _ => self.malformed += 1,
            },
            Operator::PaintXObject => match operands.last() {
                Some(PdfValue::Name(name)) => self.paint_xobject(name, resources, depth),
                _ => self.malformed += 1,
            },
            Operator::InlineImage | Operator::Other => {}
        }
    }

    fn set_number(&mut self, operands: &[PdfValue], apply: impl FnOnce(&mut TextState, f64)) {
        match operands.last().and_then(PdfValue::as_f64) {
            Some(v) if v.is_finite() => apply(&mut self.gs.text, v),
            _ => self.malformed += 1,
        }
    }

    fn next_line(&mut self) {
        let leading = self.gs.text.leading;
        self.text.move_line(0.0, -leading);
    }

    fn set_font(&mut self, operands: &[PdfValue], resources: &Dict) {
        let (name, size) = match operands {
            [.., PdfValue::Name(name), size] => match size.as_f64() {
                Some(size) => (name.clone(), size),
                None => {
                    self.malformed += 1;
                    return;
                }
            },
            _ => {
                self.malformed += 1;
                return;
            }
        };
        self.gs.text.font_size = size;

        let store = self.interp.store;
        let font = store
            .get_dict(resources, "Font")
            .and_then(|fonts| fonts.get(&name).cloned())
            .and_then(|entry| self.interp.fonts.get_or_load(store, &entry, self.interp.tables));

        self.gs.text.font = match font {
            Some(font) => Some(font),
            None => {
                if self.missing_fonts.insert(name.clone()) {
                    log::warn!("page {}: font /{} not found, using defaults", self.page_index + 1, name);
                    self.diagnostics.push(
                        Diagnostic::new(DiagnosticKind::MissingFont, format!("font /{} not found", name))
                            .on_page(self.page_index + 1),
                    );
                }
                Some(self.fallback_font())
            }
        };
    }

    fn fallback_font(&mut self) -> Arc<FontInfo> {
        self.fallback
            .get_or_insert_with(|| Arc::new(FontInfo::fallback(self.interp.tables)))
            .clone()
    }

    fn show_array(&mut self, items: &[PdfValue]) {
        for item in items {
            match item {
                PdfValue::String(bytes) => self.show(bytes),
                PdfValue::Integer(_) | PdfValue::Real(_) => {
                    let adjust = item.as_f64().unwrap_or(0.0);
                    let text = &self.gs.text;
                    let tx = -adjust / 1000.0 * text.font_size * text.horizontal_scale;
                    if -adjust > RUN_BREAK_THOUSANDTHS {
                        self.flush();
                    }
                    self.text.advance(tx);
                }
                _ => self.malformed += 1,
            }
        }
    }

    fn show(&mut self, bytes: &[u8]) {
        let font = match self.gs.text.font.clone() {
            Some(font) => font,
            None => {
                if self.missing_fonts.insert(String::new()) {
                    log::warn!("page {}: text shown before any font was selected", self.page_index + 1);
                    self.diagnostics.push(
                        Diagnostic::new(DiagnosticKind::MissingFont, "text shown before any font was selected")
                            .on_page(self.page_index + 1),
                    );
                }
                if self.gs.text.font_size == 0.0 {
                    self.gs.text.font_size = DEFAULT_FONT_SIZE;
                }
                let font = self.fallback_font();
                self.gs.text.font = Some(font.clone());
                font
            }
        };

        for glyph in font.decode(bytes) {
            let state = &self.gs.text;
            let device = self.text.matrix.multiply(&self.gs.ctm);
            let (x, y) = device.transform_point(0.0, state.rise);
            let size = (state.font_size * device.vertical_scale()).abs();

            let mut tx = glyph.width / 1000.0 * state.font_size + state.char_spacing;
            if glyph.is_word_space {
                tx += state.word_spacing;
            }
            tx *= state.horizontal_scale;
            self.text.advance(tx);
            let end_x = self.text.matrix.multiply(&self.gs.ctm).transform_point(0.0, state.rise).0;

            if glyph.text.is_empty() {
                continue;
            }
            self.push_glyph(&glyph.text, x, y, end_x, size, font.bold, font.italic);
        }
    }

    #[allow(clippy::too_many_arguments)]
    fn push_glyph(&mut self, text: &str, x: f64, y: f64, end_x: f64, size: f64, bold: bool, italic: bool) {
        if let Some(run) = &mut self.pending {
            let same_style = run.bold == bold && run.italic == italic && (run.font_size - size).abs() < 0.01;
            let same_line = (run.y - y).abs() < size.max(1.0) * 0.1;
            let adjacent = (x - run.end_x).abs() < size.max(1.0) * 0.2;
            if same_style && same_line && adjacent {
                run.text.push_str(text);
                run.end_x = end_x;
                return;
            }
        }
        self.flush();
        self.pending = Some(PendingRun {
            text: text.to_string(),
            x,
            y,
            end_x,
            font_size: size,
            bold,
            italic,
        });
    }

    fn flush(&mut self) {
        let Some(run) = self.pending.take() else {
            return;
        };
        if run.text.trim().is_empty() {
            return;
        }
        self.runs.push(TextRun {
            text: run.text,
            x: run.x,
            y: run.y,
            width: (run.end_x - run.x).max(0.0),
            font_size: run.font_size,
            bold: run.bold,
            italic: run.italic,
            page_index: self.page_index,
        });
    }

    fn paint_xobject(&mut self, name: &str, resources: &Dict, depth: usize) {
        let store = self.interp.store;
        let Some(entry) = store
            .get_dict(resources, "XObject")
            .and_then(|xobjects| xobjects.get(name).cloned())
        else {
            log::debug!("XObject /{} not found", name);
            return;
        };

        let id = entry.as_reference();
        let stream = match store.deref(&entry) {
            Ok(PdfValue::Stream(stream)) if stream.dict.get_name("Subtype") == Some("Form") => stream,
            Ok(_) => return,
            Err(e) => {
                log::warn!("cannot resolve XObject /{}: {}", name, e);
                return;
            }
        };

        if depth >= MAX_FORM_DEPTH {
            log::warn!("form XObject /{} nested too deeply, skipping", name);
            return;
        }
        if let Some(id) = id {
            if !self.active_forms.insert(id) {
                log::warn!("form XObject {} draws itself, skipping", id);
                return;
            }
        }

        match store.decode_stream(&stream) {
            Ok(content) => {
                let form_resources = store.get_dict(&stream.dict, "Resources").unwrap_or_else(|| resources.clone());
                let matrix = store
                    .get(&stream.dict, "Matrix")
                    .and_then(|m| {
                        let values: Vec<f64> = m.as_array()?.iter().filter_map(PdfValue::as_f64).collect();
                        Matrix::from_slice(&values)
                    })
                    .unwrap_or(Matrix::IDENTITY);

                let saved_gs = self.gs.clone();
                let saved_text = self.text;
                let saved_depth = self.stack.len();
                self.gs.ctm = matrix.multiply(&self.gs.ctm);
                self.text = TextObject::default();

                self.run(&content, &form_resources, depth + 1);

                self.flush();
                self.stack.truncate(saved_depth);
                self.gs = saved_gs;
                self.text = saved_text;
            }
            Err(e) => log::warn!("cannot decode form XObject /{}: {}", name, e),
        }

        if let Some(id) = id {
            self.active_forms.remove(&id);
        }
    }
}

/// The last `n` operands as numbers.
fn numbers(operands: &[PdfValue], n: usize) -> Option<Vec<f64>> {
    if operands.len() < n {
        return None;
    }
    operands[operands.len() - n..]
        .iter()
        .map(|v| v.as_f64().filter(|f| f.is_finite()))
        .collect()
}
