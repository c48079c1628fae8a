//! Blank-page detection.
//!
//! The score is global: average every colour sample of the page to one mean
//! brightness in [0, 255] and call `255 − mean` the page's *inkiness*. A page
//! is blank when its inkiness is below a small threshold (1.0 by default).
//!
//! There is no spatial awareness. A page whose only content is a small stamp
//! may well score below the threshold and be dropped, so the threshold has to
//! be tuned per scanner and paper.

use super::runner::{require_extension, RASTER_EXT};
use crate::error::ScanError;
use crate::workspace::Stage;
use image::{DynamicImage, ImageReader};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Mean brightness over all colour channels and pixels, in [0, 255].
///
/// Alpha is ignored. An image without pixels has nothing printed on it and
/// reports full brightness.
pub fn mean_brightness(image: &DynamicImage) -> f64 {
    let rgb = image.to_rgb8();
    let samples = rgb.as_raw();
    if samples.is_empty() {
        return 255.0;
    }
    let sum: u64 = samples.iter().map(|&s| u64::from(s)).sum();
    sum as f64 / samples.len() as f64
}

/// `255 − mean brightness`.
pub fn inkiness(image: &DynamicImage) -> f64 {
    255.0 - mean_brightness(image)
}

/// Threshold-based blank classifier.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BlankClassifier {
    pub threshold: f64,
}

impl Default for BlankClassifier {
    fn default() -> Self {
        Self {
            threshold: crate::config::DEFAULT_BLANK_THRESHOLD,
        }
    }
}

impl BlankClassifier {
    pub fn new(threshold: f64) -> Self {
        Self { threshold }
    }

    pub fn is_blank_score(&self, inkiness: f64) -> bool {
        inkiness < self.threshold
    }

    pub fn is_blank(&self, image: &DynamicImage) -> bool {
        self.is_blank_score(inkiness(image))
    }
}

/// Decode a page image and return its inkiness.
pub fn score_file(path: &Path) -> Result<f64, ScanError> {
    require_extension(Stage::Filter, "input", path, RASTER_EXT)?;
    let decode_err = |detail: String| ScanError::ImageDecode {
        path: path.to_path_buf(),
        detail,
    };
    let image = ImageReader::open(path)
        .map_err(|e| decode_err(e.to_string()))?
        .with_guessed_format()
        .map_err(|e| decode_err(e.to_string()))?
        .decode()
        .map_err(|e| decode_err(e.to_string()))?;
    let score = inkiness(&image);
    debug!(
        "{}: {}x{} px, inkiness {:.3}",
        path.display(),
        image.width(),
        image.height(),
        score
    );
    Ok(score)
}

/// [`score_file`] on the blocking thread pool.
pub async fn score_page(path: &Path) -> Result<f64, ScanError> {
    let path: PathBuf = path.to_path_buf();
    tokio::task::spawn_blocking(move || score_file(&path))
        .await
        .map_err(|e| ScanError::Internal(format!("Scoring task panicked: {}", e)))?
}
