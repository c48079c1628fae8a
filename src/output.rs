//! Result types returned by a successful run.

use crate::config::PageMode;
use crate::workspace::{PageKey, Stage};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Blankness verdict for one split page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PageScore {
    pub key: PageKey,
    /// File name of the scored stage-3 image.
    pub file: String,
    /// `255 − mean brightness`, on a 0–255 scale.
    pub inkiness: f64,
    pub blank: bool,
}

/// Wall-clock time spent in one stage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StageTiming {
    pub stage: Stage,
    pub duration_ms: u64,
}

/// Summary of a completed run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunReport {
    /// Where the searchable PDF was written.
    pub output_path: PathBuf,
    /// Size of the output document in bytes.
    pub output_bytes: u64,
    /// Scratch directory used by the run (already removed).
    pub workspace: PathBuf,
    pub page_mode: PageMode,
    /// Pages produced by the rasterizer (physical scans).
    pub sheets: usize,
    /// Logical pages after splitting.
    pub split_pages: usize,
    /// Logical pages dropped as blank.
    pub blank_pages: usize,
    /// Pages in the output document, in order.
    pub kept_pages: Vec<PageKey>,
    /// Blankness score of every split page, in scan order.
    pub scores: Vec<PageScore>,
    pub timings: Vec<StageTiming>,
    pub total_duration_ms: u64,
}

impl RunReport {
    /// Number of pages in the output document.
    pub fn output_pages(&self) -> usize {
        self.kept_pages.len()
    }
}
