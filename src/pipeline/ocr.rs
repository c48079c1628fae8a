//! Stage 5: add a searchable text layer (`ocrmypdf`).
//!
//! Treated as atomic: confidence and partial results are never inspected.

use super::runner::{invoke_single, require_extension, ToolInvocation, ToolRunner, DOCUMENT_EXT};
use crate::config::ToolPrograms;
use crate::error::ScanError;
use crate::workspace::Stage;
use std::path::{Path, PathBuf};

/// Build the `ocrmypdf` invocation.
pub fn invocation(
    programs: &ToolPrograms,
    input: &Path,
    output: &Path,
    language: &str,
) -> ToolInvocation {
    ToolInvocation::new(Stage::Ocr, &programs.ocrmypdf)
        .args(["--language", language])
        .arg(input)
        .arg(output)
}

/// OCR `input` into `output`.
pub async fn ocr(
    runner: &dyn ToolRunner,
    programs: &ToolPrograms,
    input: &Path,
    output: &Path,
    language: &str,
) -> Result<PathBuf, ScanError> {
    require_extension(Stage::Ocr, "input", input, DOCUMENT_EXT)?;
    require_extension(Stage::Ocr, "output", output, DOCUMENT_EXT)?;

    let inv = invocation(programs, input, output, language);
    invoke_single(runner, &inv, output).await
}
