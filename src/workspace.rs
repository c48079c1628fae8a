//! Scratch workspace and stage artifact naming.
//!
//! Every run owns exactly one [`Workspace`]: a uniquely named directory under
//! the system temp dir that holds all intermediate files. Files are named
//! with the number of the stage that produced them (`1-scan-01.ppm`,
//! `2-1-scan-01.ppm`, `3-2-1-scan-01-1.ppm`, …) so artifacts of different
//! stages never collide and a kept-alive workspace reads like a log.
//!
//! The directory is removed when the `Workspace` is dropped, so an aborted or
//! cancelled run cleans up after itself. [`Workspace::close`] performs the same removal explicitly and reports
//! failures instead of swallowing them.

use crate::error::ScanError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use tempfile::TempDir;
use tracing::debug;

const WORKSPACE_PREFIX: &str = "scan2pdf-";

/// The fixed sequence of pipeline stages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Stage {
    Rasterize,
    ToneCorrect,
    Split,
    Filter,
    Assemble,
    Ocr,
}

impl Stage {
    /// All stages in execution order.
    pub const ALL: [Stage; 6] = [
        Stage::Rasterize,
        Stage::ToneCorrect,
        Stage::Split,
        Stage::Filter,
        Stage::Assemble,
        Stage::Ocr,
    ];

    /// Number used to prefix the files this stage writes.
    ///
    /// The filter stage only inspects split output and writes nothing.
    pub fn artifact_prefix(&self) -> Option<u8> {
        match self {
            Stage::Rasterize => Some(1),
            Stage::ToneCorrect => Some(2),
            Stage::Split => Some(3),
            Stage::Filter => None,
            Stage::Assemble => Some(4),
            Stage::Ocr => Some(5),
        }
    }

    /// Name of the CLI flag that overrides this stage's external program.
    ///
    /// `None` for the filter stage, which runs no program.
    pub fn tool_flag(&self) -> Option<&'static str> {
        match self {
            Stage::Rasterize => Some("pdftoppm"),
            Stage::ToneCorrect => Some("convert"),
            Stage::Split => Some("unpaper"),
            Stage::Filter => None,
            Stage::Assemble => Some("img2pdf"),
            Stage::Ocr => Some("ocrmypdf"),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::Rasterize => "rasterize",
            Stage::ToneCorrect => "tone-correct",
            Stage::Split => "split",
            Stage::Filter => "filter",
            Stage::Assemble => "assemble",
            Stage::Ocr => "ocr",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Position of a page in the original scan sequence.
///
/// `sheet` is the 1-based index of the rasterized input page, `side` the
/// 1-based index of the logical page cut from it (0 until the page has been
/// through the split stage). Ordering is scan order, left before right.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PageKey {
    pub sheet: u32,
    pub side: u32,
}

impl PageKey {
    pub fn sheet(sheet: u32) -> Self {
        Self { sheet, side: 0 }
    }

    pub fn with_side(self, side: u32) -> Self {
        Self { side, ..self }
    }
}

impl fmt::Display for PageKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.side == 0 {
            write!(f, "sheet {}", self.sheet)
        } else {
            write!(f, "sheet {}.{}", self.sheet, self.side)
        }
    }
}

/// A raster file produced by one stage and consumed by the next.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageImage {
    pub path: PathBuf,
    pub key: PageKey,
}

impl PageImage {
    pub fn new(path: impl Into<PathBuf>, key: PageKey) -> Self {
        Self {
            path: path.into(),
            key,
        }
    }

    /// The file name as a `String` (lossy), used to derive the next stage's names.
    pub fn file_name(&self) -> String {
        self.path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default()
    }

    /// The file stem as a `String` (lossy).
    pub fn file_stem(&self) -> String {
        self.path
            .file_stem()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default()
    }
}

/// Per-run scratch directory. Removed on drop.
#[derive(Debug)]
pub struct Workspace {
    dir: TempDir,
}

impl Workspace {
    /// Create a fresh, uniquely named workspace under the system temp dir.
    pub fn create() -> Result<Self, ScanError> {
        let dir = tempfile::Builder::new()
            .prefix(WORKSPACE_PREFIX)
            .tempdir()
            .map_err(ScanError::Workspace)?;
        debug!("Created workspace {}", dir.path().display());
        Ok(Self { dir })
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    /// Path of an artifact written by `stage`: `<workspace>/<N>-<name>`.
    pub fn artifact(&self, stage: Stage, name: &str) -> PathBuf {
        match stage.artifact_prefix() {
            Some(n) => self.dir.path().join(format!("{n}-{name}")),
            None => self.dir.path().join(name),
        }
    }

    /// Remove the workspace now, reporting any failure.
    pub fn close(self) -> Result<(), ScanError> {
        let path = self.dir.path().to_path_buf();
        self.dir.close().map_err(ScanError::Workspace)?;
        debug!("Removed workspace {}", path.display());
        Ok(())
    }
}
