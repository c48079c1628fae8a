//! Progress-callback trait for per-stage and per-page pipeline events.
//!
//! Inject an [`Arc<dyn PipelineProgressCallback>`] via
//! [`crate::config::PipelineConfigBuilder::progress_callback`] to receive
//! events as the pipeline works through a document.
//!
//! # Example
//!
//! ```rust
//! use scan2pdf::{PipelineConfig, PipelineProgressCallback, Stage};
//! use std::sync::{Arc, atomic::{AtomicUsize, Ordering}};
//!
//! struct BlankCounter {
//!     blank: AtomicUsize,
//! }
//!
//! impl PipelineProgressCallback for BlankCounter {
//!     fn on_page_scored(&self, _page: &str, _inkiness: f64, blank: bool) {
//!         if blank {
//!             self.blank.fetch_add(1, Ordering::SeqCst);
//!         }
//!     }
//! }
//!
//! let config = PipelineConfig::builder()
//!     .progress_callback(Arc::new(BlankCounter { blank: AtomicUsize::new(0) }))
//!     .build()
//!     .unwrap();
//! ```

use crate::output::RunReport;
use crate::workspace::Stage;
use std::path::Path;
use std::sync::Arc;

/// Called by the pipeline as it moves through stages and pages.
///
/// Events arrive strictly in pipeline order from a single task. All methods
/// have default no-op implementations.
pub trait PipelineProgressCallback: Send + Sync {
    /// Called once the scratch workspace exists, before the first tool runs.
    fn on_run_start(&self, workspace: &Path) {
        let _ = workspace;
    }

    /// Called when a stage begins.
    ///
    /// # Arguments
    /// * `stage` — the stage about to run
    /// * `items` — number of invocations (pages) the stage will make
    fn on_stage_start(&self, stage: Stage, items: usize) {
        let _ = (stage, items);
    }

    /// Called after each per-page invocation of a stage finishes.
    fn on_item_complete(&self, stage: Stage, done: usize, total: usize) {
        let _ = (stage, done, total);
    }

    /// Called for every split page once its blankness has been scored.
    ///
    /// # Arguments
    /// * `page`     — file name of the scored page image
    /// * `inkiness` — `255 − mean brightness`
    /// * `blank`    — whether the page will be dropped
    fn on_page_scored(&self, page: &str, inkiness: f64, blank: bool) {
        let _ = (page, inkiness, blank);
    }

    /// Called when a stage has finished and produced `produced` artifacts.
    fn on_stage_complete(&self, stage: Stage, produced: usize) {
        let _ = (stage, produced);
    }

    /// Called once after the output document has been published.
    fn on_run_complete(&self, report: &RunReport) {
        let _ = report;
    }
}

/// A no-op implementation for callers that don't need progress events.
pub struct NoopProgressCallback;

impl PipelineProgressCallback for NoopProgressCallback {}

/// Convenience alias matching the type stored in [`crate::config::PipelineConfig`].
pub type ProgressCallback = Arc<dyn PipelineProgressCallback>;
