//! CLI binary for scan2pdf.
//!
//! A thin shim over the library crate that maps CLI flags
//! to `PipelineConfig` and prints results.

use anyhow::{Context, Result};
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use scan2pdf::{
    check_tools, convert, PageMode, PipelineConfig, PipelineProgressCallback, ProgressCallback,
    RunReport, Stage, ToolPrograms,
};
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

// ── ANSI colour helpers (no extra deps) ──────────────────────────────────────

fn green(s: &str) -> String {
    format!("\x1b[32m{s}\x1b[0m")
}
fn red(s: &str) -> String {
    format!("\x1b[31m{s}\x1b[0m")
}
fn dim(s: &str) -> String {
    format!("\x1b[2m{s}\x1b[0m")
}
fn bold(s: &str) -> String {
    format!("\x1b[1m{s}\x1b[0m")
}
fn cyan(s: &str) -> String {
    format!("\x1b[36m{s}\x1b[0m")
}

const TICKS: &[&str] = &["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"];

// ── CLI progress callback using indicatif ────────────────────────────────────

/// Terminal progress: one bar per stage, one log line per scored page.
struct CliProgressCallback {
    bar: ProgressBar,
}

impl CliProgressCallback {
    fn new() -> Arc<Self> {
        let bar = ProgressBar::new(0);
        let spinner_style = ProgressStyle::with_template("{spinner:.cyan} {prefix:.bold}  {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_strings(TICKS);
        bar.set_style(spinner_style);
        bar.set_prefix("Preparing");
        bar.set_message("Checking paths…");
        bar.enable_steady_tick(Duration::from_millis(80));

        Arc::new(Self { bar })
    }

    fn stage_style() -> ProgressStyle {
        ProgressStyle::with_template(
            "{spinner:.cyan} {prefix:>12.bold}  \
             [{bar:42.green/238}] {pos:>3}/{len} pages  ⏱ {elapsed_precise}",
        )
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("█▉▊▋▌▍▎▏  ")
        .tick_strings(TICKS)
    }
}

impl PipelineProgressCallback for CliProgressCallback {
    fn on_run_start(&self, workspace: &Path) {
        self.bar.println(format!(
            "{} {}",
            cyan("◆"),
            dim(&format!("workspace {}", workspace.display()))
        ));
    }

    fn on_stage_start(&self, stage: Stage, items: usize) {
        self.bar.set_style(Self::stage_style());
        self.bar.set_length(items as u64);
        self.bar.set_position(0);
        self.bar.set_prefix(stage.to_string());
        self.bar.reset_elapsed();
    }

    fn on_item_complete(&self, _stage: Stage, done: usize, _total: usize) {
        self.bar.set_position(done as u64);
    }

    fn on_page_scored(&self, page: &str, inkiness: f64, blank: bool) {
        if blank {
            self.bar.println(format!(
                "  {} {:<32} {}",
                dim("○"),
                page,
                dim(&format!("inkiness {inkiness:>7.3}  blank, dropped"))
            ));
        } else {
            self.bar.println(format!(
                "  {} {:<32} {}",
                green("✓"),
                page,
                dim(&format!("inkiness {inkiness:>7.3}"))
            ));
        }
    }

    fn on_stage_complete(&self, stage: Stage, produced: usize) {
        self.bar.println(format!(
            "{} {:<12} {}",
            green("✔"),
            stage.to_string(),
            dim(&format!("{produced} artifact(s)"))
        ));
    }

    fn on_run_complete(&self, _report: &RunReport) {
        self.bar.finish_and_clear();
    }
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Book scanned two pages per sheet (default)
  scan2pdf scan.pdf book.pdf

  # One page per sheet
  scan2pdf --single-page letters.pdf letters-ocr.pdf

  # English text, keep faint pages
  scan2pdf --language eng --blank-threshold 0.2 scan.pdf out.pdf

  # Machine-readable summary
  scan2pdf --json scan.pdf out.pdf > report.json

  # Are all tools installed?
  scan2pdf --check-tools

PIPELINE:
  1 pdftoppm   PDF → one PPM per sheet
  2 convert    normalize, lighten (HSL lightness × factor), grayscale
  3 unpaper    split spreads (all other unpaper filters disabled)
  - filter     drop pages whose inkiness (255 − mean brightness) < threshold
  4 img2pdf    remaining pages → PDF
  5 ocrmypdf   add text layer → OUTPUT

NOTES:
  The output file must not exist; scan2pdf never overwrites.
  Intermediate files live in a scratch directory that is removed on exit,
  also after an error, Ctrl-C, SIGTERM or SIGHUP.
"#;

/// Turn scanned PDFs into clean, searchable PDFs.
#[derive(Parser, Debug)]
#[command(
    name = "scan2pdf",
    version,
    about = "Turn scanned (double-page) PDFs into clean, searchable PDFs",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    /// Scanned PDF to process.
    #[arg(required_unless_present = "check_tools")]
    input: Option<PathBuf>,

    /// Where to write the searchable PDF (must not exist).
    #[arg(required_unless_present = "check_tools")]
    output: Option<PathBuf>,

    /// Each scanned sheet holds one page (no splitting).
    #[arg(long, env = "SCAN2PDF_SINGLE_PAGE", conflicts_with = "double_page")]
    single_page: bool,

    /// Each scanned sheet is a two-page spread (default).
    #[arg(long)]
    double_page: bool,

    /// Inkiness (0–255) below which a page is dropped as blank.
    #[arg(long, env = "SCAN2PDF_BLANK_THRESHOLD", default_value_t = scan2pdf::config::DEFAULT_BLANK_THRESHOLD)]
    blank_threshold: f64,

    /// Multiplier applied to HSL lightness by the tone filter.
    #[arg(long, env = "SCAN2PDF_LIGHTNESS", default_value_t = scan2pdf::config::DEFAULT_LIGHTNESS_FACTOR)]
    lightness: f64,

    /// OCR language hint, e.g. deu, eng, deu+eng.
    #[arg(short, long, env = "SCAN2PDF_LANGUAGE", default_value = scan2pdf::config::DEFAULT_OCR_LANGUAGE)]
    language: String,

    /// Rasterizer program.
    #[arg(long, env = "SCAN2PDF_PDFTOPPM", default_value = "pdftoppm")]
    pdftoppm: String,

    /// Tone filter program (ImageMagick).
    #[arg(long, env = "SCAN2PDF_CONVERT", default_value = "convert")]
    convert: String,

    /// Page splitter program.
    #[arg(long, env = "SCAN2PDF_UNPAPER", default_value = "unpaper")]
    unpaper: String,

    /// Image-to-PDF program.
    #[arg(long, env = "SCAN2PDF_IMG2PDF", default_value = "img2pdf")]
    img2pdf: String,

    /// OCR program.
    #[arg(long, env = "SCAN2PDF_OCRMYPDF", default_value = "ocrmypdf")]
    ocrmypdf: String,

    /// Print the run report as JSON on stdout.
    #[arg(long, env = "SCAN2PDF_JSON")]
    json: bool,

    /// Check that every external tool can be started, then exit.
    #[arg(long)]
    check_tools: bool,

    /// Disable progress bar.
    #[arg(long, env = "SCAN2PDF_NO_PROGRESS")]
    no_progress: bool,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, env = "SCAN2PDF_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long, env = "SCAN2PDF_QUIET")]
    quiet: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    // The progress bar already shows stage and page events; keep library
    // INFO logs out of its way unless asked for.
    let show_progress = !cli.quiet && !cli.no_progress && !cli.json && !cli.check_tools;
    let filter = if cli.verbose {
        "debug"
    } else if cli.quiet || show_progress {
        "error"
    } else {
        "info"
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_writer(io::stderr)
        .init();

    let progress_cb: Option<ProgressCallback> = if show_progress {
        Some(CliProgressCallback::new() as Arc<dyn PipelineProgressCallback>)
    } else {
        None
    };
    let config = build_config(&cli, progress_cb)?;

    // ── Tool check mode ──────────────────────────────────────────────────
    if cli.check_tools {
        let statuses = check_tools(&config).await;
        let all_ok = statuses.iter().all(|s| s.available);
        if cli.json {
            println!(
                "{}",
                serde_json::to_string_pretty(&statuses).context("Failed to serialise tool status")?
            );
        } else {
            for s in &statuses {
                if s.available {
                    println!(
                        "{} {:<12} {:<10} {}",
                        green("✓"),
                        s.stage.to_string(),
                        s.program,
                        dim(s.version.as_deref().unwrap_or(""))
                    );
                } else {
                    println!(
                        "{} {:<12} {:<10} {}",
                        red("✗"),
                        s.stage.to_string(),
                        s.program,
                        red(s.error.as_deref().unwrap_or("unavailable"))
                    );
                }
            }
        }
        if !all_ok {
            anyhow::bail!("Some required tools are missing");
        }
        return Ok(());
    }

    let input = cli.input.as_deref().context("INPUT is required")?;
    let output = cli.output.as_deref().context("OUTPUT is required")?;

    // ── Run conversion ───────────────────────────────────────────────────
    // Dropping the conversion future on a termination signal kills the
    // running tool and removes the scratch workspace before we exit.
    let report = tokio::select! {
        result = convert(input, output, &config) => result.context("Conversion failed")?,
        (reason, code) = shutdown_signal() => {
            eprintln!("{} {reason}, scratch files removed", red("✘"));
            std::process::exit(code);
        }
    };

    if cli.json {
        println!(
            "{}",
            serde_json::to_string_pretty(&report).context("Failed to serialise report")?
        );
    } else if !cli.quiet {
        eprintln!(
            "{}  {} sheet(s) → {} page(s)  {}  {}ms  →  {}",
            green("✔"),
            report.sheets,
            bold(&report.output_pages().to_string()),
            dim(&format!("{} blank dropped", report.blank_pages)),
            report.total_duration_ms,
            bold(&report.output_path.display().to_string()),
        );
        eprintln!(
            "   Output file size is {} bytes",
            dim(&report.output_bytes.to_string())
        );
    }

    Ok(())
}

/// Resolves on Ctrl-C, SIGTERM or SIGHUP with a description and the
/// conventional `128 + signal` exit code.
#[cfg(unix)]
async fn shutdown_signal() -> (&'static str, i32) {
    use tokio::signal::unix::{signal, SignalKind};

    match (signal(SignalKind::terminate()), signal(SignalKind::hangup())) {
        (Ok(mut term), Ok(mut hup)) => tokio::select! {
            _ = interrupt() => ("interrupted", 130),
            _ = term.recv() => ("terminated", 143),
            _ = hup.recv() => ("hung up", 129),
        },
        (Err(e), _) | (_, Err(e)) => {
            tracing::warn!("Cannot install SIGTERM/SIGHUP handlers: {}", e);
            interrupt().await;
            ("interrupted", 130)
        }
    }
}

#[cfg(not(unix))]
async fn shutdown_signal() -> (&'static str, i32) {
    interrupt().await;
    ("interrupted", 130)
}

async fn interrupt() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!("Cannot listen for Ctrl-C: {}", e);
        std::future::pending::<()>().await;
    }
}

/// Map CLI args to `PipelineConfig`.
fn build_config(cli: &Cli, progress: Option<ProgressCallback>) -> Result<PipelineConfig> {
    let programs = ToolPrograms {
        pdftoppm: cli.pdftoppm.clone(),
        convert: cli.convert.clone(),
        unpaper: cli.unpaper.clone(),
        img2pdf: cli.img2pdf.clone(),
        ocrmypdf: cli.ocrmypdf.clone(),
    };

    let mode = if cli.single_page {
        PageMode::SinglePage
    } else {
        PageMode::DoublePage
    };

    let mut builder = PipelineConfig::builder()
        .page_mode(mode)
        .blank_threshold(cli.blank_threshold)
        .lightness_factor(cli.lightness)
        .ocr_language(cli.language.clone())
        .programs(programs);

    if let Some(cb) = progress {
        builder = builder.progress_callback(cb);
    }

    builder.build().context("Invalid configuration")
}
