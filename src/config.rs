//! Configuration types for a scan-to-PDF run.
//!
//! All run behaviour is controlled through [`PipelineConfig`], built via its
//! [`PipelineConfigBuilder`]. The two hand-tuned constants of the pipeline,
//! the blankness threshold and the lightness boost of the tone filter, are
//! plain fields here with their empirical defaults; both usually need
//! adjusting for a new scanner/paper combination.

use crate::error::ScanError;
use crate::pipeline::runner::ToolRunner;
use crate::progress::ProgressCallback;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// Default inkiness (0–255 scale) below which a page counts as blank.
pub const DEFAULT_BLANK_THRESHOLD: f64 = 1.0;

/// Default multiplicative boost applied to HSL lightness by the tone filter.
pub const DEFAULT_LIGHTNESS_FACTOR: f64 = 1.075;

/// Default language hint handed to the OCR tool.
pub const DEFAULT_OCR_LANGUAGE: &str = "deu";

/// Configuration for one pipeline run.
///
/// # Example
/// ```rust
/// use scan2pdf::{PageMode, PipelineConfig};
///
/// let config = PipelineConfig::builder()
///     .page_mode(PageMode::SinglePage)
///     .blank_threshold(2.5)
///     .ocr_language("eng")
///     .build()
///     .unwrap();
/// assert_eq!(config.page_mode, PageMode::SinglePage);
/// ```
#[derive(Clone)]
pub struct PipelineConfig {
    /// Whether every rasterized page is a two-up spread. Default: double-page.
    ///
    /// Applied uniformly to every page of the run.
    pub page_mode: PageMode,

    /// Inkiness below which a split page is dropped as blank. Default: 1.0.
    ///
    /// Inkiness is `255 − mean brightness`. The check is global: a page with
    /// a single small stamp on it can fall below the threshold.
    pub blank_threshold: f64,

    /// Factor applied to HSL lightness by the tone filter. Default: 1.075.
    pub lightness_factor: f64,

    /// Language hint for the OCR tool (tesseract codes, `+`-joined). Default: "deu".
    pub ocr_language: String,

    /// Program names or paths of the external tools.
    pub programs: ToolPrograms,

    /// Pre-constructed tool runner. Takes precedence over spawning
    /// [`ToolPrograms`] directly with [`crate::pipeline::runner::SystemRunner`].
    pub runner: Option<Arc<dyn ToolRunner>>,

    /// Optional per-stage / per-page progress events.
    pub progress_callback: Option<ProgressCallback>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            page_mode: PageMode::default(),
            blank_threshold: DEFAULT_BLANK_THRESHOLD,
            lightness_factor: DEFAULT_LIGHTNESS_FACTOR,
            ocr_language: DEFAULT_OCR_LANGUAGE.to_string(),
            programs: ToolPrograms::default(),
            runner: None,
            progress_callback: None,
        }
    }
}

impl fmt::Debug for PipelineConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PipelineConfig")
            .field("page_mode", &self.page_mode)
            .field("blank_threshold", &self.blank_threshold)
            .field("lightness_factor", &self.lightness_factor)
            .field("ocr_language", &self.ocr_language)
            .field("programs", &self.programs)
            .field("runner", &self.runner.as_ref().map(|_| "<dyn ToolRunner>"))
            .field(
                "progress_callback",
                &self.progress_callback.as_ref().map(|_| "<dyn PipelineProgressCallback>"),
            )
            .finish()
    }
}

impl PipelineConfig {
    /// Create a new builder for `PipelineConfig`.
    pub fn builder() -> PipelineConfigBuilder {
        PipelineConfigBuilder {
            config: Self::default(),
        }
    }
}

/// Builder for [`PipelineConfig`].
#[derive(Debug)]
pub struct PipelineConfigBuilder {
    config: PipelineConfig,
}

impl PipelineConfigBuilder {
    pub fn page_mode(mut self, mode: PageMode) -> Self {
        self.config.page_mode = mode;
        self
    }

    pub fn double_page(mut self, v: bool) -> Self {
        self.config.page_mode = PageMode::from_double_page(v);
        self
    }

    pub fn blank_threshold(mut self, threshold: f64) -> Self {
        self.config.blank_threshold = threshold;
        self
    }

    pub fn lightness_factor(mut self, factor: f64) -> Self {
        self.config.lightness_factor = factor;
        self
    }

    pub fn ocr_language(mut self, language: impl Into<String>) -> Self {
        self.config.ocr_language = language.into();
        self
    }

    pub fn programs(mut self, programs: ToolPrograms) -> Self {
        self.config.programs = programs;
        self
    }

    pub fn runner(mut self, runner: Arc<dyn ToolRunner>) -> Self {
        self.config.runner = Some(runner);
        self
    }

    pub fn progress_callback(mut self, cb: ProgressCallback) -> Self {
        self.config.progress_callback = Some(cb);
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<PipelineConfig, ScanError> {
        let c = &self.config;
        if !c.blank_threshold.is_finite() || !(0.0..=255.0).contains(&c.blank_threshold) {
            return Err(ScanError::InvalidConfig(format!(
                "blank threshold must be within 0–255, got {}",
                c.blank_threshold
            )));
        }
        if !c.lightness_factor.is_finite() || c.lightness_factor <= 0.0 {
            return Err(ScanError::InvalidConfig(format!(
                "lightness factor must be a positive number, got {}",
                c.lightness_factor
            )));
        }
        let lang = c.ocr_language.trim();
        if lang.is_empty() || lang.contains(char::is_whitespace) {
            return Err(ScanError::InvalidConfig(format!(
                "OCR language must be a non-empty code like 'deu' or 'deu+eng', got {:?}",
                c.ocr_language
            )));
        }
        for (stage, program) in c.programs.iter() {
            if program.trim().is_empty() {
                return Err(ScanError::InvalidConfig(format!(
                    "program for the {stage} stage must not be empty"
                )));
            }
        }
        Ok(self.config)
    }
}

// ── Enums ────────────────────────────────────────────────────────────────

/// How each rasterized page is laid out.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PageMode {
    /// Each scan is a two-up spread and is cut into left and right pages. (default)
    #[default]
    DoublePage,
    /// Each scan is a single page and passes the splitter unchanged.
    SinglePage,
}

impl PageMode {
    pub fn from_double_page(double_page: bool) -> Self {
        if double_page {
            PageMode::DoublePage
        } else {
            PageMode::SinglePage
        }
    }

    /// Number of logical pages the splitter must emit per input image.
    pub fn pages_per_sheet(&self) -> usize {
        match self {
            PageMode::DoublePage => 2,
            PageMode::SinglePage => 1,
        }
    }
}

/// Program names (looked up on `PATH`) or absolute paths of the external tools.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolPrograms {
    pub pdftoppm: String,
    pub convert: String,
    pub unpaper: String,
    pub img2pdf: String,
    pub ocrmypdf: String,
}

impl Default for ToolPrograms {
    fn default() -> Self {
        Self {
            pdftoppm: "pdftoppm".into(),
            convert: "convert".into(),
            unpaper: "unpaper".into(),
            img2pdf: "img2pdf".into(),
            ocrmypdf: "ocrmypdf".into(),
        }
    }
}

impl ToolPrograms {
    /// `(stage, program)` pairs in pipeline order.
    pub fn iter(&self) -> impl Iterator<Item = (crate::workspace::Stage, &str)> {
        use crate::workspace::Stage;
        [
            (Stage::Rasterize, self.pdftoppm.as_str()),
            (Stage::ToneCorrect, self.convert.as_str()),
            (Stage::Split, self.unpaper.as_str()),
            (Stage::Assemble, self.img2pdf.as_str()),
            (Stage::Ocr, self.ocrmypdf.as_str()),
        ]
        .into_iter()
    }
}
