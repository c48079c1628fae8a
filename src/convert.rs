//! Pipeline orchestrator: the only place that knows the full stage sequence.
//!
//! [`convert`] validates the caller's paths, creates a scratch
//! [`Workspace`], drives the five tool stages plus the blank filter strictly
//! one after another, publishes the OCR result to the output path and
//! removes the workspace again. Any error aborts the run; nothing is retried
//! and nothing is ever written to the output path unless every stage
//! succeeded.

use crate::config::PipelineConfig;
use crate::error::ScanError;
use crate::output::{PageScore, RunReport, StageTiming};
use crate::pipeline::blank::{self, BlankClassifier};
use crate::pipeline::runner::{
    has_extension, SystemRunner, ToolInvocation, ToolRunner, DOCUMENT_EXT,
};
use crate::pipeline::{assemble, ocr, rasterize, split, tone};
use crate::progress::PipelineProgressCallback;
use crate::workspace::{PageImage, Stage, Workspace};
use serde::Serialize;
use std::io::{ErrorKind, Read};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

/// Convert a scanned PDF into a clean, searchable PDF.
///
/// # Arguments
/// * `input`  — existing PDF file
/// * `output` — where to write the result; must not exist yet, its
///   directory must
/// * `config` — run configuration
///
/// # Errors
/// Precondition failures are returned before any tool is started. Every
/// other failure aborts the run; the scratch workspace is removed either way
/// and the output path is left untouched.
pub async fn convert(
    input: impl AsRef<Path>,
    output: impl AsRef<Path>,
    config: &PipelineConfig,
) -> Result<RunReport, ScanError> {
    let total_start = Instant::now();
    let input = input.as_ref();
    let output = output.as_ref();
    info!("Starting conversion: {} → {}", input.display(), output.display());

    // ── Step 0: Preconditions ────────────────────────────────────────────
    validate_input(input)?;
    validate_output(output)?;

    let runner = resolve_runner(config);

    // ── Step 1: Scratch workspace ────────────────────────────────────────
    let workspace = Workspace::create()?;
    let workspace_path = workspace.path().to_path_buf();
    info!("Scratch workspace: {}", workspace_path.display());
    notify(config, |cb| cb.on_run_start(&workspace_path));

    let result = run_stages(runner.as_ref(), input, output, config, &workspace).await;

    // ── Teardown (success or failure) ────────────────────────────────────
    if let Err(e) = workspace.close() {
        warn!(
            "Failed to remove workspace {}: {}",
            workspace_path.display(),
            e
        );
    }

    let outcome = result?;

    let report = RunReport {
        output_path: output.to_path_buf(),
        output_bytes: outcome.output_bytes,
        workspace: workspace_path,
        page_mode: config.page_mode,
        sheets: outcome.sheets,
        split_pages: outcome.scores.len(),
        blank_pages: outcome.scores.iter().filter(|s| s.blank).count(),
        kept_pages: outcome.kept.iter().map(|p| p.key).collect(),
        scores: outcome.scores,
        timings: outcome.timings,
        total_duration_ms: total_start.elapsed().as_millis() as u64,
    };

    info!(
        "Conversion complete: {} sheet(s) → {} page(s), {} blank dropped, {}ms total",
        report.sheets,
        report.output_pages(),
        report.blank_pages,
        report.total_duration_ms
    );
    notify(config, |cb| cb.on_run_complete(&report));

    Ok(report)
}

/// Synchronous wrapper around [`convert`].
///
/// Creates a temporary tokio runtime internally.
pub fn convert_sync(
    input: impl AsRef<Path>,
    output: impl AsRef<Path>,
    config: &PipelineConfig,
) -> Result<RunReport, ScanError> {
    tokio::runtime::Runtime::new()
        .map_err(|e| ScanError::Internal(format!("Failed to create tokio runtime: {}", e)))?
        .block_on(convert(input, output, config))
}

/// Check that `path` is an existing, regular PDF file.
pub fn validate_input(path: &Path) -> Result<(), ScanError> {
    let meta = std::fs::metadata(path).map_err(|e| match e.kind() {
        ErrorKind::NotFound => ScanError::InputNotFound {
            path: path.to_path_buf(),
        },
        _ => ScanError::Io {
            path: path.to_path_buf(),
            source: e,
        },
    })?;
    if !meta.is_file() {
        return Err(ScanError::InputNotAFile {
            path: path.to_path_buf(),
        });
    }
    if !has_extension(path, DOCUMENT_EXT) {
        return Err(ScanError::WrongExtension {
            path: path.to_path_buf(),
            expected: DOCUMENT_EXT,
        });
    }

    // Verify PDF magic bytes
    let mut magic = [0u8; 4];
    let mut f = std::fs::File::open(path).map_err(|e| ScanError::Io {
        path: path.to_path_buf(),
        source: e,
    })?;
    match f.read_exact(&mut magic) {
        Ok(()) => {}
        Err(e) if e.kind() == ErrorKind::UnexpectedEof => {
            return Err(ScanError::NotAPdf {
                path: path.to_path_buf(),
                magic,
            })
        }
        Err(e) => {
            return Err(ScanError::Io {
                path: path.to_path_buf(),
                source: e,
            })
        }
    }
    if &magic != b"%PDF" {
        return Err(ScanError::NotAPdf {
            path: path.to_path_buf(),
            magic,
        });
    }

    debug!("Validated input PDF: {}", path.display());
    Ok(())
}

/// Check that `path` is a `.pdf` path that does not exist yet and whose
/// directory does.
pub fn validate_output(path: &Path) -> Result<(), ScanError> {
    if !has_extension(path, DOCUMENT_EXT) {
        return Err(ScanError::WrongExtension {
            path: path.to_path_buf(),
            expected: DOCUMENT_EXT,
        });
    }
    let parent = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
        _ => PathBuf::from("."),
    };
    if !parent.is_dir() {
        return Err(ScanError::OutputDirMissing { path: parent });
    }
    // symlink_metadata: a dangling symlink still occupies the name.
    if std::fs::symlink_metadata(path).is_ok() {
        return Err(ScanError::OutputExists {
            path: path.to_path_buf(),
        });
    }
    Ok(())
}

// ── Stage sequence ───────────────────────────────────────────────────────

struct StagesOutcome {
    sheets: usize,
    kept: Vec<PageImage>,
    scores: Vec<PageScore>,
    timings: Vec<StageTiming>,
    output_bytes: u64,
}

async fn run_stages(
    runner: &dyn ToolRunner,
    input: &Path,
    output: &Path,
    config: &PipelineConfig,
    workspace: &Workspace,
) -> Result<StagesOutcome, ScanError> {
    let programs = &config.programs;
    let mut timings = Vec::with_capacity(Stage::ALL.len());

    // ── Step 2: Rasterize ────────────────────────────────────────────────
    let started = begin_stage(config, Stage::Rasterize, 1);
    let sheets = rasterize::rasterize(runner, programs, input, workspace).await?;
    end_stage(config, Stage::Rasterize, started, sheets.len(), &mut timings);

    // ── Step 3: Tone-correct each page ───────────────────────────────────
    let started = begin_stage(config, Stage::ToneCorrect, sheets.len());
    let mut toned = Vec::with_capacity(sheets.len());
    for page in &sheets {
        toned.push(
            tone::tone_correct(runner, programs, page, config.lightness_factor, workspace).await?,
        );
        notify(config, |cb| {
            cb.on_item_complete(Stage::ToneCorrect, toned.len(), sheets.len())
        });
    }
    end_stage(config, Stage::ToneCorrect, started, toned.len(), &mut timings);

    // ── Step 4: Split spreads ────────────────────────────────────────────
    let started = begin_stage(config, Stage::Split, toned.len());
    let mut pages = Vec::with_capacity(toned.len() * config.page_mode.pages_per_sheet());
    for (i, page) in toned.iter().enumerate() {
        pages.extend(split::split(runner, programs, page, config.page_mode, workspace).await?);
        notify(config, |cb| cb.on_item_complete(Stage::Split, i + 1, toned.len()));
    }
    end_stage(config, Stage::Split, started, pages.len(), &mut timings);

    // ── Step 5: Drop blank pages ─────────────────────────────────────────
    let started = begin_stage(config, Stage::Filter, pages.len());
    let (kept, scores) = filter_blank(pages, config).await?;
    end_stage(config, Stage::Filter, started, kept.len(), &mut timings);

    if kept.is_empty() {
        return Err(ScanError::EmptyPageList {
            blank: scores.len(),
        });
    }

    let doc_name = input
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| format!("input.{DOCUMENT_EXT}"));

    // ── Step 6: Assemble ─────────────────────────────────────────────────
    let started = begin_stage(config, Stage::Assemble, 1);
    let assembled = workspace.artifact(Stage::Assemble, &doc_name);
    let assembled = assemble::assemble(runner, programs, &kept, &assembled).await?;
    end_stage(config, Stage::Assemble, started, 1, &mut timings);

    // ── Step 7: OCR ──────────────────────────────────────────────────────
    let started = begin_stage(config, Stage::Ocr, 1);
    let searchable = workspace.artifact(Stage::Ocr, &doc_name);
    let searchable = ocr::ocr(
        runner,
        programs,
        &assembled,
        &searchable,
        &config.ocr_language,
    )
    .await?;
    end_stage(config, Stage::Ocr, started, 1, &mut timings);

    // ── Step 8: Publish + post-condition ─────────────────────────────────
    publish(&searchable, output).await?;
    let output_bytes = match tokio::fs::metadata(output).await {
        Ok(m) if m.is_file() => m.len(),
        _ => {
            return Err(ScanError::OutputMissing {
                path: output.to_path_buf(),
            })
        }
    };
    info!("Output file size is {} bytes", output_bytes);

    Ok(StagesOutcome {
        sheets: sheets.len(),
        kept,
        scores,
        timings,
        output_bytes,
    })
}

/// Score every page and keep the non-blank ones, in order.
async fn filter_blank(
    pages: Vec<PageImage>,
    config: &PipelineConfig,
) -> Result<(Vec<PageImage>, Vec<PageScore>), ScanError> {
    let classifier = BlankClassifier::new(config.blank_threshold);
    let mut kept = Vec::with_capacity(pages.len());
    let mut scores = Vec::with_capacity(pages.len());
    let total = pages.len();

    for (i, page) in pages.into_iter().enumerate() {
        let inkiness = blank::score_page(&page.path).await?;
        let is_blank = classifier.is_blank_score(inkiness);
        let file = page.file_name();

        if is_blank {
            warn!(
                "{} ({}): inkiness {:.3} < {} → blank, dropped",
                file, page.key, inkiness, classifier.threshold
            );
        } else {
            info!("{} ({}): inkiness {:.3}", file, page.key, inkiness);
        }
        notify(config, |cb| {
            cb.on_page_scored(&file, inkiness, is_blank);
            cb.on_item_complete(Stage::Filter, i + 1, total);
        });

        scores.push(PageScore {
            key: page.key,
            file,
            inkiness,
            blank: is_blank,
        });
        if !is_blank {
            kept.push(page);
        }
    }

    Ok((kept, scores))
}

/// Move the finished document to `to` without ever overwriting it.
///
/// Hard-linking fails if `to` exists, which makes the final step
/// no-clobber. Across filesystems the document is first copied into a
/// uniquely named temp file next to `to` and persisted with no-clobber
/// semantics, so the final name only ever refers to a complete file. The
/// temp file is removed if the copy fails or the run is dropped mid-copy.
async fn publish(from: &Path, to: &Path) -> Result<(), ScanError> {
    let publish_err = |source| ScanError::Publish {
        path: to.to_path_buf(),
        source,
    };

    match tokio::fs::hard_link(from, to).await {
        Ok(()) => return Ok(()),
        Err(e) if e.kind() == ErrorKind::AlreadyExists => {
            return Err(ScanError::OutputExists {
                path: to.to_path_buf(),
            })
        }
        Err(e) => debug!("Cannot hard-link into place ({}), copying instead", e),
    }

    let dir = match to.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    let staged = tempfile::Builder::new()
        .prefix(STAGING_PREFIX)
        .suffix(".partial")
        .tempfile_in(dir)
        .map_err(publish_err)?;
    tokio::fs::copy(from, staged.path())
        .await
        .map_err(publish_err)?;

    staged.persist_noclobber(to).map_err(|e| {
        if e.error.kind() == ErrorKind::AlreadyExists {
            ScanError::OutputExists {
                path: to.to_path_buf(),
            }
        } else {
            publish_err(e.error)
        }
    })?;
    Ok(())
}

const STAGING_PREFIX: &str = ".scan2pdf-";

// ── Tool availability ────────────────────────────────────────────────────

/// Availability of one external program.
#[derive(Debug, Clone, Serialize)]
pub struct ToolStatus {
    pub stage: Stage,
    pub program: String,
    pub available: bool,
    /// First line the program printed for its version flag.
    pub version: Option<String>,
    pub error: Option<String>,
}

fn version_flag(stage: Stage) -> &'static str {
    match stage {
        Stage::Rasterize => "-v",
        Stage::ToneCorrect => "-version",
        _ => "--version",
    }
}

/// Probe every configured program with its version flag.
///
/// Does not need an input document.
pub async fn check_tools(config: &PipelineConfig) -> Vec<ToolStatus> {
    let runner = resolve_runner(config);
    let mut statuses = Vec::new();

    for (stage, program) in config.programs.iter() {
        let inv = ToolInvocation::new(stage, program).arg(version_flag(stage));
        let status = match runner.run(&inv).await {
            Ok(out) => {
                // pdftoppm prints its version on stderr.
                let text = if out.stdout.iter().any(|b| !b.is_ascii_whitespace()) {
                    out.stdout
                } else {
                    out.stderr
                };
                let version = String::from_utf8_lossy(&text)
                    .lines()
                    .map(str::trim)
                    .find(|l| !l.is_empty())
                    .map(str::to_string);
                ToolStatus {
                    stage,
                    program: program.to_string(),
                    available: true,
                    version,
                    error: None,
                }
            }
            Err(e) => ToolStatus {
                stage,
                program: program.to_string(),
                available: false,
                version: None,
                error: Some(e.to_string()),
            },
        };
        debug!(
            "{} ({}): available={} version={:?}",
            status.program, status.stage, status.available, status.version
        );
        statuses.push(status);
    }

    statuses
}

// ── Internal helpers ─────────────────────────────────────────────────────

/// Injected runner first, real processes otherwise.
fn resolve_runner(config: &PipelineConfig) -> Arc<dyn ToolRunner> {
    match config.runner {
        Some(ref runner) => Arc::clone(runner),
        None => Arc::new(SystemRunner),
    }
}

fn notify(config: &PipelineConfig, f: impl FnOnce(&dyn PipelineProgressCallback)) {
    if let Some(ref cb) = config.progress_callback {
        f(cb.as_ref());
    }
}

fn begin_stage(config: &PipelineConfig, stage: Stage, items: usize) -> Instant {
    debug!("Stage {} starting ({} item(s))", stage, items);
    notify(config, |cb| cb.on_stage_start(stage, items));
    Instant::now()
}

fn end_stage(
    config: &PipelineConfig,
    stage: Stage,
    started: Instant,
    produced: usize,
    timings: &mut Vec<StageTiming>,
) {
    let duration_ms = started.elapsed().as_millis() as u64;
    info!("Stage {}: {} artifact(s) in {}ms", stage, produced, duration_ms);
    timings.push(StageTiming { stage, duration_ms });
    notify(config, |cb| cb.on_stage_complete(stage, produced));
}
