//! Stage 2: tone correction (ImageMagick `convert`).
//!
//! Fixed recipe: stretch levels to the full range, multiply HSL lightness by
//! a constant factor (clamped to 1.0), then convert to grayscale. The `u.b`
//! in the `-fx` expression is the third channel, which holds lightness once
//! the image is in HSL.

use super::runner::{invoke_single, require_extension, ToolInvocation, ToolRunner, RASTER_EXT};
use crate::config::ToolPrograms;
use crate::error::ScanError;
use crate::workspace::{PageImage, Stage, Workspace};
use std::path::Path;

/// The `-fx` expression boosting lightness by `factor`.
pub fn lightness_expression(factor: f64) -> String {
    format!("min(1.0,u.b*{factor})")
}

/// Build the `convert` invocation.
pub fn invocation(
    programs: &ToolPrograms,
    input: &Path,
    output: &Path,
    lightness_factor: f64,
) -> ToolInvocation {
    ToolInvocation::new(Stage::ToneCorrect, &programs.convert)
        .arg(input)
        .args([
            "-normalize",
            "-colorspace",
            "HSL",
            "-channel",
            "lightness",
            "-fx",
        ])
        .arg(lightness_expression(lightness_factor))
        .args(["-colorspace", "RGB", "-colorspace", "Gray"])
        .arg(output)
}

/// Tone-correct one page into `<ws>/2-<input file name>`.
pub async fn tone_correct(
    runner: &dyn ToolRunner,
    programs: &ToolPrograms,
    page: &PageImage,
    lightness_factor: f64,
    workspace: &Workspace,
) -> Result<PageImage, ScanError> {
    require_extension(Stage::ToneCorrect, "input", &page.path, RASTER_EXT)?;
    let output = workspace.artifact(Stage::ToneCorrect, &page.file_name());
    require_extension(Stage::ToneCorrect, "output", &output, RASTER_EXT)?;

    let inv = invocation(programs, &page.path, &output, lightness_factor);
    let path = invoke_single(runner, &inv, &output).await?;
    Ok(PageImage::new(path, page.key))
}
