//! Stage 3: cut spreads into single pages (`unpaper`).
//!
//! unpaper is only used for page separation. Every correction filter it
//! would otherwise apply (deskew, border detection, noise/blur/gray filters,
//! masking) is switched off; the scanner's own calibration is trusted.

use super::runner::{
    invoke_and_collect, require_extension, OutputPattern, ToolInvocation, ToolRunner, RASTER_EXT,
};
use crate::config::{PageMode, ToolPrograms};
use crate::error::ScanError;
use crate::workspace::{PageImage, Stage, Workspace};
use std::path::{Path, PathBuf};

/// unpaper filters disabled on every call.
pub const DISABLED_FILTERS: [&str; 11] = [
    "--no-blackfilter",
    "--no-blurfilter",
    "--no-border-align",
    "--no-border-scan",
    "--no-border",
    "--no-deskew",
    "--no-grayfilter",
    "--no-mask-center",
    "--no-mask-scan",
    "--no-noisefilter",
    "--no-wipe",
];

/// Build the `unpaper` invocation.
pub fn invocation(
    programs: &ToolPrograms,
    input: &Path,
    output_pattern: &Path,
    mode: PageMode,
) -> ToolInvocation {
    let (layout, pages) = match mode {
        PageMode::DoublePage => ("double", "2"),
        PageMode::SinglePage => ("single", "1"),
    };
    ToolInvocation::new(Stage::Split, &programs.unpaper)
        .args(["--layout", layout])
        .args(DISABLED_FILTERS)
        .args(["--output-pages", pages])
        .arg(input)
        .arg(output_pattern)
}

/// Output pattern inside the workspace: `<ws>/3-<input stem>-%d.ppm`.
pub fn output_pattern(page: &PageImage, workspace: &Workspace) -> PathBuf {
    workspace.artifact(
        Stage::Split,
        &format!("{}-%d.{}", page.file_stem(), RASTER_EXT),
    )
}

/// Split one page image into one (single-page) or two (double-page) images.
///
/// Results are in reading order, left page first; each keeps the sheet
/// number of `page` and gets a 1-based side.
pub async fn split(
    runner: &dyn ToolRunner,
    programs: &ToolPrograms,
    page: &PageImage,
    mode: PageMode,
    workspace: &Workspace,
) -> Result<Vec<PageImage>, ScanError> {
    require_extension(Stage::Split, "input", &page.path, RASTER_EXT)?;
    let pattern_path = output_pattern(page, workspace);
    let pattern = OutputPattern::from_placeholder(&pattern_path)?.ok_or_else(|| {
        ScanError::ContractViolation {
            stage: Stage::Split,
            role: "output pattern (with a single %d)",
            path: pattern_path.clone(),
            expected: RASTER_EXT,
        }
    })?;

    let inv = invocation(programs, &page.path, &pattern_path, mode);
    let files = invoke_and_collect(runner, &inv, &pattern).await?;

    let expected = mode.pages_per_sheet();
    if files.len() != expected {
        return Err(ScanError::UnexpectedOutputCount {
            stage: Stage::Split,
            input: page.path.clone(),
            expected,
            found: files.len(),
        });
    }

    Ok(files
        .into_iter()
        .enumerate()
        .map(|(i, path)| PageImage::new(path, page.key.with_side(i as u32 + 1)))
        .collect())
}
