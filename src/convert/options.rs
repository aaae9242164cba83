//! Conversion options and cancellation.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::layout::LayoutConfig;
use crate::render::RenderOptions;

/// Default input size cap: 20 MiB.
pub const DEFAULT_MAX_INPUT_BYTES: usize = 20 * 1024 * 1024;

/// A shared flag that stops a running conversion.
///
/// Clones share the same flag.
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    cancelled: Arc<AtomicBool>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation. Pages not yet started are not processed.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }
}

/// Options for PDF to DOCX conversion.
#[derive(Debug, Clone)]
pub struct ConversionOptions {
    /// Inputs larger than this are rejected
    pub max_input_bytes: usize,

    /// Leave out pages that fail to interpret instead of failing
    pub skip_unparsable_pages: bool,

    /// Process pages on a worker pool
    pub parallel: bool,

    /// Worker pool size; `None` uses the available parallelism
    pub max_workers: Option<usize>,

    /// Layout heuristics
    pub layout: LayoutConfig,

    /// DOCX output options
    pub render: RenderOptions,

    /// Cancellation flag checked before each page
    pub cancel: Option<CancelToken>,
}

impl Default for ConversionOptions {
    fn default() -> Self {
        Self {
            max_input_bytes: DEFAULT_MAX_INPUT_BYTES,
            skip_unparsable_pages: true,
            parallel: true,
            max_workers: None,
            layout: LayoutConfig::default(),
            render: RenderOptions::default(),
            cancel: None,
        }
    }
}

impl ConversionOptions {
    /// Create new conversion options.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the input size cap.
    pub fn with_max_input_bytes(mut self, bytes: usize) -> Self {
        self.max_input_bytes = bytes;
        self
    }

    /// Skip or fail on pages that cannot be interpreted.
    pub fn with_skip_unparsable_pages(mut self, skip: bool) -> Self {
        self.skip_unparsable_pages = skip;
        self
    }

    /// Enable or disable the page worker pool.
    pub fn with_parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    /// Bound the worker pool size.
    pub fn with_max_workers(mut self, workers: usize) -> Self {
        self.max_workers = Some(workers.max(1));
        self
    }

    /// Set layout thresholds.
    pub fn with_layout(mut self, layout: LayoutConfig) -> Self {
        self.layout = layout;
        self
    }

    /// Set rendering options.
    pub fn with_render_options(mut self, render: RenderOptions) -> Self {
        self.render = render;
        self
    }

    /// Attach a cancellation token.
    pub fn with_cancel_token(mut self, token: CancelToken) -> Self {
        self.cancel = Some(token);
        self
    }

    pub(crate) fn is_cancelled(&self) -> bool {
        self.cancel.as_ref().is_some_and(CancelToken::is_cancelled)
    }

    /// Number of page workers for a document of `pages` pages.
    pub(crate) fn worker_count(&self, pages: usize) -> usize {
        let available = std::thread::available_parallelism().map_or(1, |n| n.get());
        self.max_workers.unwrap_or(available).min(pages).max(1)
    }
}
