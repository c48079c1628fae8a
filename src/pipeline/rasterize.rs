//! Stage 1: rasterize the input PDF into one raster per page (`pdftoppm`).
//!
//! `pdftoppm IN BASE` writes `BASE-N.ppm` for every page, zero-padding `N`
//! to the width of the page count, so lexicographic order is page order.

use super::runner::{
    invoke_and_collect, require_extension, OutputPattern, ToolInvocation, ToolRunner,
    DOCUMENT_EXT, RASTER_EXT,
};
use crate::config::ToolPrograms;
use crate::error::ScanError;
use crate::workspace::{PageImage, PageKey, Stage, Workspace};
use std::path::{Path, PathBuf};
use tracing::info;

/// Build the `pdftoppm` invocation for `document`.
pub fn invocation(programs: &ToolPrograms, document: &Path, base: &Path) -> ToolInvocation {
    ToolInvocation::new(Stage::Rasterize, &programs.pdftoppm)
        .arg(document)
        .arg(base)
}

/// Output basename inside the workspace: `<ws>/1-<input stem>`.
///
/// Every later artifact name derives from this one, and unpaper reads `%` in
/// its output name as a format directive, so the stem is reduced to
/// `[A-Za-z0-9._-]`.
pub fn output_base(document: &Path, workspace: &Workspace) -> PathBuf {
    let stem = document
        .file_stem()
        .map(|s| artifact_stem(&s.to_string_lossy()))
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| "input".to_string());
    workspace.artifact(Stage::Rasterize, &stem)
}

fn artifact_stem(stem: &str) -> String {
    stem.chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-') {
                c
            } else {
                '_'
            }
        })
        .collect()
}

/// Rasterize every page of `document` into the workspace.
///
/// Returns one [`PageImage`] per page in document order, keyed by sheet
/// number (1-based).
pub async fn rasterize(
    runner: &dyn ToolRunner,
    programs: &ToolPrograms,
    document: &Path,
    workspace: &Workspace,
) -> Result<Vec<PageImage>, ScanError> {
    require_extension(Stage::Rasterize, "input", document, DOCUMENT_EXT)?;

    let base = output_base(document, workspace);
    let pattern = OutputPattern::numbered(&base, RASTER_EXT)?;
    let inv = invocation(programs, document, &base);

    let files = invoke_and_collect(runner, &inv, &pattern).await?;
    info!("Rasterized {} page(s) from {}", files.len(), document.display());

    Ok(files
        .into_iter()
        .enumerate()
        .map(|(i, path)| PageImage::new(path, PageKey::sheet(i as u32 + 1)))
        .collect())
}
