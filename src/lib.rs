//! # scan2pdf
//!
//! Turn a scanned PDF, possibly holding two book pages per scanned sheet,
//! into a clean, searchable PDF.
//!
//! The heavy lifting is done by well-known command-line tools; this crate
//! sequences them, owns every intermediate file, decides which pages survive
//! and defines what happens when a tool misbehaves.
//!
//! ## Pipeline Overview
//!
//! ```text
//! scan.pdf
//!  │
//!  ├─ 1. Rasterize     pdftoppm   one PPM per scanned sheet
//!  ├─ 2. Tone-correct  convert    normalize, lighten (HSL), grayscale
//!  ├─ 3. Split         unpaper    spread → left + right page
//!  ├─    Filter        in-process drop pages whose inkiness < threshold
//!  ├─ 4. Assemble      img2pdf    surviving pages → one PDF
//!  └─ 5. OCR           ocrmypdf   add a text layer → output.pdf
//! ```
//!
//! Intermediate files live in a per-run scratch directory that is removed
//! when the run ends, however it ends.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use scan2pdf::{convert, PipelineConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = PipelineConfig::default(); // double-page, threshold 1.0
//!     let report = convert("scan.pdf", "book.pdf", &config).await?;
//!     eprintln!(
//!         "{} pages written ({} blank dropped), {} bytes",
//!         report.output_pages(),
//!         report.blank_pages,
//!         report.output_bytes
//!     );
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `scan2pdf` binary (clap + anyhow + tracing-subscriber + indicatif) |
//!
//! ## Required tools
//!
//! `pdftoppm` (poppler-utils), `convert` (ImageMagick), `unpaper`, `img2pdf`
//! and `ocrmypdf` must be installed. Their names or paths can be changed via
//! [`ToolPrograms`]; [`check_tools`] reports which ones are reachable.

// ── Modules ──────────────────────────────────────────────────────────────

pub mod config;
pub mod convert;
pub mod error;
pub mod output;
pub mod pipeline;
pub mod progress;
pub mod workspace;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use config::{PageMode, PipelineConfig, PipelineConfigBuilder, ToolPrograms};
pub use convert::{check_tools, convert, convert_sync, validate_input, validate_output, ToolStatus};
pub use error::{ErrorCategory, ScanError};
pub use output::{PageScore, RunReport, StageTiming};
pub use pipeline::runner::{SystemRunner, ToolInvocation, ToolOutput, ToolRunner};
pub use progress::{NoopProgressCallback, PipelineProgressCallback, ProgressCallback};
pub use workspace::{PageImage, PageKey, Stage, Workspace};
