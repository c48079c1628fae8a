//! Stage 4: concatenate page images into one PDF (`img2pdf`).

use super::runner::{
    invoke_single, require_extension, ToolInvocation, ToolRunner, DOCUMENT_EXT, RASTER_EXT,
};
use crate::config::ToolPrograms;
use crate::error::ScanError;
use crate::workspace::{PageImage, Stage};
use std::path::{Path, PathBuf};

/// Build the `img2pdf` invocation: `img2pdf P1 .. Pn -o OUT`.
pub fn invocation(programs: &ToolPrograms, pages: &[PageImage], output: &Path) -> ToolInvocation {
    ToolInvocation::new(Stage::Assemble, &programs.img2pdf)
        .args(pages.iter().map(|p| p.path.as_os_str()))
        .arg("-o")
        .arg(output)
}

/// Assemble `pages`, in the order given, into the document at `output`.
pub async fn assemble(
    runner: &dyn ToolRunner,
    programs: &ToolPrograms,
    pages: &[PageImage],
    output: &Path,
) -> Result<PathBuf, ScanError> {
    if pages.is_empty() {
        return Err(ScanError::EmptyPageList { blank: 0 });
    }
    for page in pages {
        require_extension(Stage::Assemble, "input", &page.path, RASTER_EXT)?;
    }
    require_extension(Stage::Assemble, "output", output, DOCUMENT_EXT)?;

    let inv = invocation(programs, pages, output);
    invoke_single(runner, &inv, output).await
}
