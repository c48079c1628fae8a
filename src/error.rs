//! Error types for the scan2pdf library.
//!
//! Every failure is fatal to the run: there is no partial output and no retry.
//! A single enum, [`ScanError`], carries all of them. [`ScanError::category`]
//! groups the variants into the broad classes callers usually branch on:
//!
//! * [`ErrorCategory::Precondition`] — the caller handed us something we
//!   refuse to work with (wrong extension, output already exists, …). Raised
//!   before any external tool is started.
//! * [`ErrorCategory::ExternalTool`] — a tool could not be started or exited
//!   with a non-zero status.
//! * [`ErrorCategory::EmptyOutput`] — a tool exited successfully but did not
//!   write the files it was supposed to write.
//! * [`ErrorCategory::Postcondition`] — the final document is missing after
//!   every stage reported success.

use crate::workspace::Stage;
use serde::Serialize;
use std::path::PathBuf;
use thiserror::Error;

/// Broad classification of a [`ScanError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCategory {
    Precondition,
    ExternalTool,
    EmptyOutput,
    Postcondition,
    Io,
    Internal,
}

/// All fatal errors returned by the scan2pdf library.
#[derive(Debug, Error)]
pub enum ScanError {
    // ── Preconditions ─────────────────────────────────────────────────────
    /// Input document was not found at the given path.
    #[error("Input file not found: '{path}'")]
    InputNotFound { path: PathBuf },

    /// Input path exists but is a directory, socket, …
    #[error("Input '{path}' is not a regular file")]
    InputNotAFile { path: PathBuf },

    /// The file exists and was read, but does not start with `%PDF`.
    #[error("File is not a valid PDF: '{path}'\nFirst bytes: {magic:?}")]
    NotAPdf { path: PathBuf, magic: [u8; 4] },

    /// A document path passed by the caller does not end in the expected extension.
    #[error("'{path}' must have a .{expected} extension")]
    WrongExtension { path: PathBuf, expected: &'static str },

    /// The output document already exists; runs never overwrite.
    #[error("Output file '{path}' already exists.\nRemove it or choose another output path.")]
    OutputExists { path: PathBuf },

    /// The directory the output document should be written to does not exist.
    #[error("Output directory '{path}' does not exist")]
    OutputDirMissing { path: PathBuf },

    /// A stage was handed (or asked to produce) a file of the wrong kind.
    ///
    /// Never expected in a correctly wired pipeline.
    #[error("{stage} stage: {role} '{path}' must have a .{expected} extension")]
    ContractViolation {
        stage: Stage,
        role: &'static str,
        path: PathBuf,
        expected: &'static str,
    },

    /// Every page was filtered out (or none was handed to the assembler).
    #[error("No pages left to assemble{}", blank_suffix(.blank))]
    EmptyPageList { blank: usize },

    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // ── External tools ────────────────────────────────────────────────────
    /// The program is not installed or not on `PATH`.
    #[error("{stage} stage: program '{program}' not found.{}", install_hint(.stage))]
    ToolNotFound { stage: Stage, program: String },

    /// The program exists but the OS refused to start it.
    #[error("{stage} stage: failed to start '{program}': {source}")]
    ToolLaunchFailed {
        stage: Stage,
        program: String,
        #[source]
        source: std::io::Error,
    },

    /// The program ran and exited with a non-success status.
    #[error("{stage} stage: '{program}' exited with {status}{}", stderr_suffix(.stderr))]
    ToolFailed {
        stage: Stage,
        program: String,
        status: String,
        stderr: String,
    },

    // ── Empty output ──────────────────────────────────────────────────────
    /// The program exited successfully but produced nothing matching `pattern`.
    #[error("{stage} stage: '{program}' reported success but produced no output matching '{pattern}'")]
    NoOutputProduced {
        stage: Stage,
        program: String,
        pattern: String,
    },

    /// The program produced a different number of files than the stage requires.
    #[error("{stage} stage: expected {expected} output file(s) for '{input}', found {found}")]
    UnexpectedOutputCount {
        stage: Stage,
        input: PathBuf,
        expected: usize,
        found: usize,
    },

    // ── Post-conditions ───────────────────────────────────────────────────
    /// The final document is missing even though every stage succeeded.
    #[error("Output file '{path}' is missing after the run completed")]
    OutputMissing { path: PathBuf },

    // ── I/O ───────────────────────────────────────────────────────────────
    /// Could not create or list the scratch workspace.
    #[error("Scratch workspace error: {0}")]
    Workspace(#[source] std::io::Error),

    /// A page image could not be decoded for blankness scoring.
    #[error("Failed to decode page image '{path}': {detail}")]
    ImageDecode { path: PathBuf, detail: String },

    /// Moving the finished document to the output path failed.
    #[error("Failed to write output file '{path}': {source}")]
    Publish {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Reading a caller-supplied path failed for another reason.
    #[error("I/O error on '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

fn blank_suffix(blank: &usize) -> String {
    if *blank > 0 {
        format!(" ({} blank pages dropped)", blank)
    } else {
        String::new()
    }
}

fn install_hint(stage: &Stage) -> String {
    match stage.tool_flag() {
        Some(flag) => format!("\nInstall it or point scan2pdf at it with --{flag}."),
        None => String::new(),
    }
}

fn stderr_suffix(stderr: &str) -> String {
    if stderr.is_empty() {
        String::new()
    } else {
        format!("\n{}", stderr)
    }
}

impl ScanError {
    /// Which class of failure this is.
    pub fn category(&self) -> ErrorCategory {
        match self {
            ScanError::InputNotFound { .. }
            | ScanError::InputNotAFile { .. }
            | ScanError::NotAPdf { .. }
            | ScanError::WrongExtension { .. }
            | ScanError::OutputExists { .. }
            | ScanError::OutputDirMissing { .. }
            | ScanError::ContractViolation { .. }
            | ScanError::EmptyPageList { .. }
            | ScanError::InvalidConfig(_) => ErrorCategory::Precondition,
            ScanError::ToolNotFound { .. }
            | ScanError::ToolLaunchFailed { .. }
            | ScanError::ToolFailed { .. } => ErrorCategory::ExternalTool,
            ScanError::NoOutputProduced { .. } | ScanError::UnexpectedOutputCount { .. } => {
                ErrorCategory::EmptyOutput
            }
            ScanError::OutputMissing { .. } => ErrorCategory::Postcondition,
            ScanError::Workspace(_)
            | ScanError::ImageDecode { .. }
            | ScanError::Publish { .. }
            | ScanError::Io { .. } => ErrorCategory::Io,
            ScanError::Internal(_) => ErrorCategory::Internal,
        }
    }

    /// The pipeline stage the error was raised in, if any.
    pub fn stage(&self) -> Option<Stage> {
        match self {
            ScanError::ContractViolation { stage, .. }
            | ScanError::ToolNotFound { stage, .. }
            | ScanError::ToolLaunchFailed { stage, .. }
            | ScanError::ToolFailed { stage, .. }
            | ScanError::NoOutputProduced { stage, .. }
            | ScanError::UnexpectedOutputCount { stage, .. } => Some(*stage),
            ScanError::EmptyPageList { .. } => Some(Stage::Assemble),
            ScanError::ImageDecode { .. } => Some(Stage::Filter),
            _ => None,
        }
    }
}
