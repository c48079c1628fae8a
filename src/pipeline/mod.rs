//! Pipeline stages for scan-to-PDF conversion.
//!
//! Each submodule wraps exactly one external program (or, for [`blank`], the
//! one check done in-process). Stages never see each other; the orchestrator
//! in [`crate::convert`] threads their outputs together.
//!
//! ## Data Flow
//!
//! ```text
//! PDF ──▶ rasterize ──▶ tone ──▶ split ──▶ blank ──▶ assemble ──▶ ocr ──▶ PDF
//!         (pdftoppm)  (convert) (unpaper)  (filter)   (img2pdf)  (ocrmypdf)
//!           1 → N       N → N    N → 2N     2N → M      M → 1      1 → 1
//! ```
//!
//! [`runner`] holds the shared plumbing: the [`runner::ToolRunner`] seam,
//! extension contracts, and output-file discovery.

pub mod assemble;
pub mod blank;
pub mod ocr;
pub mod rasterize;
pub mod runner;
pub mod split;
pub mod tone;
