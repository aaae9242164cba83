//! The PDF to DOCX pipeline.

use rayon::prelude::*;

use super::{ConversionOptions, ConversionOutput};
use crate::diagnostics::{Diagnostic, DiagnosticKind};
use crate::error::{Error, ParseError, Result};
use crate::interpret::{EncodingTables, FontCache, Interpreter};
use crate::layout::{self, Paragraph};
use crate::model::{Document, DocumentBuilder, Metadata, PageSize};
use crate::parser::{ObjectStore, Page};
use crate::render;

/// What happened to one page.
#[derive(Debug)]
enum PageOutcome {
    Done {
        paragraphs: Vec<Paragraph>,
        diagnostics: Vec<Diagnostic>,
    },
    Failed(ParseError),
    Cancelled,
}

/// Converts PDF bytes to DOCX.
#[derive(Debug, Clone, Default)]
pub struct PdfConverter {
    options: ConversionOptions,
}

impl PdfConverter {
    /// Create a new converter.
    pub fn new(options: ConversionOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> &ConversionOptions {
        &self.options
    }

    /// Convert PDF bytes to DOCX bytes, with diagnostics.
    pub fn convert(&self, input: &[u8]) -> Result<ConversionOutput> {
        let (document, mut diagnostics) = self.to_document(input)?;

        if document.is_empty() {
            diagnostics.push(Diagnostic::new(
                DiagnosticKind::EmptyDocument,
                "no text found; wrote a single empty paragraph",
            ));
        }

        let bytes = render::to_docx(&document, &self.options.render)?;
        log::debug!(
            "wrote {} byte package, {} paragraphs, {} diagnostics",
            bytes.len(),
            document.paragraph_count(),
            diagnostics.len()
        );

        Ok(ConversionOutput {
            bytes,
            page_count: document.metadata.page_count,
            paragraph_count: document.paragraph_count(),
            diagnostics,
        })
    }

    /// Run the pipeline up to the intermediate document.
    pub fn to_document(&self, input: &[u8]) -> Result<(Document, Vec<Diagnostic>)> {
        let limit = self.options.max_input_bytes;
        if input.len() > limit {
            return Err(Error::InputTooLarge {
                size: input.len(),
                limit,
            });
        }
        self.check_cancelled()?;

        let store = ObjectStore::load(input)?;
        let mut diagnostics: Vec<Diagnostic> = store.diagnostics().to_vec();
        for diagnostic in &diagnostics {
            log::warn!("{}", diagnostic);
        }

        let pages = store.pages()?;
        let outcomes = self.process_pages(&store, &pages);
        self.check_cancelled()?;

        let page_size = pages.first().map(|page| {
            let (width, height) = page.display_size();
            PageSize::new(width, height)
        });
        let mut builder = DocumentBuilder::new().metadata(Metadata::from_store(&store, pages.len()));
        if let Some(size) = page_size {
            builder = builder.page_size(size);
        }

        for (page, outcome) in pages.iter().zip(outcomes) {
            match outcome {
                PageOutcome::Done {
                    paragraphs,
                    diagnostics: page_diagnostics,
                } => {
                    diagnostics.extend(page_diagnostics);
                    builder.push_page(paragraphs);
                }
                PageOutcome::Failed(source) if self.options.skip_unparsable_pages => {
                    log::warn!("skipping page {}: {}", page.index + 1, source);
                    diagnostics.push(
                        Diagnostic::new(DiagnosticKind::PageSkipped, source.to_string()).on_page(page.index + 1),
                    );
                    builder.push_page(Vec::new());
                }
                PageOutcome::Failed(source) => {
                    return Err(Error::PageFailed {
                        page: page.index + 1,
                        source,
                    });
                }
                PageOutcome::Cancelled => return Err(Error::Cancelled),
            }
        }

        Ok((builder.finish(), diagnostics))
    }

    fn check_cancelled(&self) -> Result<()> {
        if self.options.is_cancelled() {
            Err(Error::Cancelled)
        } else {
            Ok(())
        }
    }

    /// Interpret and lay out every page. Outcomes are in page order.
    fn process_pages(&self, store: &ObjectStore, pages: &[Page]) -> Vec<PageOutcome> {
        let fonts = FontCache::new();
        let interpreter = Interpreter::new(store, &fonts, EncodingTables::global());
        let work = |page: &Page| self.process_page(&interpreter, page);

        let workers = self.options.worker_count(pages.len());
        if self.options.parallel && workers > 1 {
            match rayon::ThreadPoolBuilder::new().num_threads(workers).build() {
                Ok(pool) => {
                    log::debug!("processing {} pages on {} workers", pages.len(), workers);
                    return pool.install(|| pages.par_iter().map(work).collect());
                }
                Err(e) => log::warn!("worker pool unavailable, processing pages sequentially: {}", e),
            }
        }
        pages.iter().map(work).collect()
    }

    fn process_page(&self, interpreter: &Interpreter<'_>, page: &Page) -> PageOutcome {
        if self.options.is_cancelled() {
            return PageOutcome::Cancelled;
        }
        match interpreter.interpret(page) {
            Ok(text) => {
                let paragraphs = layout::reconstruct(text.runs, page.crop_box.width(), &self.options.layout);
                PageOutcome::Done {
                    paragraphs,
                    diagnostics: text.diagnostics,
                }
            }
            Err(e) => PageOutcome::Failed(e),
        }
    }
}
