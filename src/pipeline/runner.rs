//! Raster I/O adapter: run one external tool and collect what it wrote.
//!
//! Every stage goes through the same three steps: check the extension of the
//! files it is handed, run exactly one program through a [`ToolRunner`], then
//! look in the destination directory for the files the program should have
//! written. A program that exits 0 without writing anything is reported as
//! [`ScanError::NoOutputProduced`] instead of letting an empty page list
//! travel downstream.
//!
//! ## Why a trait?
//!
//! [`SystemRunner`] spawns real processes. Tests (and embedders that want to
//! sandbox or containerise the tools) provide their own [`ToolRunner`] via
//! [`crate::config::PipelineConfigBuilder::runner`].

use crate::error::ScanError;
use crate::workspace::Stage;
use async_trait::async_trait;
use regex::Regex;
use std::ffi::{OsStr, OsString};
use std::fmt;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use tokio::process::Command;
use tracing::debug;

/// Extension of the intermediate raster files.
pub const RASTER_EXT: &str = "ppm";

/// Extension of input, intermediate and output documents.
pub const DOCUMENT_EXT: &str = "pdf";

/// Lines of tool stderr kept in [`ScanError::ToolFailed`].
const STDERR_TAIL_LINES: usize = 20;

/// One external program call: which stage, which program, which arguments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolInvocation {
    pub stage: Stage,
    pub program: String,
    pub args: Vec<OsString>,
}

impl ToolInvocation {
    pub fn new(stage: Stage, program: impl Into<String>) -> Self {
        Self {
            stage,
            program: program.into(),
            args: Vec::new(),
        }
    }

    pub fn arg(mut self, arg: impl AsRef<OsStr>) -> Self {
        self.args.push(arg.as_ref().to_os_string());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
    {
        self.args
            .extend(args.into_iter().map(|a| a.as_ref().to_os_string()));
        self
    }

    /// Arguments as (lossy) UTF-8 strings.
    pub fn args_lossy(&self) -> Vec<String> {
        self.args
            .iter()
            .map(|a| a.to_string_lossy().into_owned())
            .collect()
    }
}

impl fmt::Display for ToolInvocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.program)?;
        for arg in self.args_lossy() {
            if arg.is_empty() || arg.contains(|c: char| c.is_whitespace() || c == '\'') {
                write!(f, " '{}'", arg.replace('\'', r"'\''"))?;
            } else {
                write!(f, " {arg}")?;
            }
        }
        Ok(())
    }
}

/// Captured standard streams of a successful invocation.
#[derive(Debug, Clone, Default)]
pub struct ToolOutput {
    pub stdout: Vec<u8>,
    pub stderr: Vec<u8>,
}

/// Runs external programs to completion.
///
/// Implementations must not return before the program has exited, and must
/// map a non-success exit status to [`ScanError::ToolFailed`].
#[async_trait]
pub trait ToolRunner: Send + Sync {
    async fn run(&self, invocation: &ToolInvocation) -> Result<ToolOutput, ScanError>;
}

/// Spawns real processes with `tokio::process`.
///
/// There is no timeout: a hanging tool stalls the run. Dropping the run
/// future kills the child (`kill_on_drop`).
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemRunner;

#[async_trait]
impl ToolRunner for SystemRunner {
    async fn run(&self, invocation: &ToolInvocation) -> Result<ToolOutput, ScanError> {
        debug!(stage = %invocation.stage, "Running: {}", invocation);

        let output = Command::new(&invocation.program)
            .args(&invocation.args)
            .stdin(Stdio::null())
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|e| {
                if e.kind() == std::io::ErrorKind::NotFound {
                    ScanError::ToolNotFound {
                        stage: invocation.stage,
                        program: invocation.program.clone(),
                    }
                } else {
                    ScanError::ToolLaunchFailed {
                        stage: invocation.stage,
                        program: invocation.program.clone(),
                        source: e,
                    }
                }
            })?;

        let stderr = String::from_utf8_lossy(&output.stderr);
        if !stderr.trim().is_empty() {
            debug!(
                stage = %invocation.stage,
                "{} stderr:\n{}",
                invocation.program,
                stderr.trim_end()
            );
        }

        if !output.status.success() {
            return Err(ScanError::ToolFailed {
                stage: invocation.stage,
                program: invocation.program.clone(),
                status: output.status.to_string(),
                stderr: tail_lines(&stderr, STDERR_TAIL_LINES),
            });
        }

        Ok(ToolOutput {
            stdout: output.stdout,
            stderr: output.stderr,
        })
    }
}

fn tail_lines(text: &str, n: usize) -> String {
    let lines: Vec<&str> = text.trim_end().lines().collect();
    let start = lines.len().saturating_sub(n);
    lines[start..].join("\n")
}

/// Check that `path` ends in `.{expected}` (ASCII case-insensitive).
pub fn has_extension(path: &Path, expected: &str) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case(expected))
}

/// Stage-level extension contract.
pub fn require_extension(
    stage: Stage,
    role: &'static str,
    path: &Path,
    expected: &'static str,
) -> Result<(), ScanError> {
    if has_extension(path, expected) {
        Ok(())
    } else {
        Err(ScanError::ContractViolation {
            stage,
            role,
            path: path.to_path_buf(),
            expected,
        })
    }
}

/// Names a tool is expected to write: `<dir>/<prefix><digits><suffix>`.
#[derive(Debug, Clone)]
pub struct OutputPattern {
    dir: PathBuf,
    prefix: String,
    suffix: String,
    matcher: Regex,
}

impl OutputPattern {
    /// Rasterizer-style numbering: `base` = `<dir>/<name>` → `<name>-<N>.<ext>`.
    pub fn numbered(base: &Path, extension: &str) -> Result<Self, ScanError> {
        let dir = parent_dir(base);
        let name = base
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        Self::new(dir, format!("{name}-"), format!(".{extension}"))
    }

    /// Splitter-style pattern: the file name contains a single `%d`.
    ///
    /// Returns `Ok(None)` when the name has no (or more than one) placeholder.
    pub fn from_placeholder(pattern: &Path) -> Result<Option<Self>, ScanError> {
        let name = match pattern.file_name() {
            Some(n) => n.to_string_lossy().into_owned(),
            None => return Ok(None),
        };
        if name.matches("%d").count() != 1 {
            return Ok(None);
        }
        let (prefix, suffix) = name.split_once("%d").unwrap_or((name.as_str(), ""));
        Self::new(parent_dir(pattern), prefix.to_string(), suffix.to_string()).map(Some)
    }

    fn new(dir: PathBuf, prefix: String, suffix: String) -> Result<Self, ScanError> {
        let matcher = Regex::new(&format!(
            "^{}[0-9]+{}$",
            regex::escape(&prefix),
            regex::escape(&suffix)
        ))
        .map_err(|e| ScanError::Internal(format!("bad output pattern: {e}")))?;
        Ok(Self {
            dir,
            prefix,
            suffix,
            matcher,
        })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn matches(&self, file_name: &str) -> bool {
        self.matcher.is_match(file_name)
    }

    /// All regular files in the pattern's directory whose names match,
    /// sorted lexicographically by file name.
    pub async fn collect(&self) -> Result<Vec<PathBuf>, ScanError> {
        let mut entries = tokio::fs::read_dir(&self.dir)
            .await
            .map_err(ScanError::Workspace)?;
        let mut found = Vec::new();
        while let Some(entry) = entries.next_entry().await.map_err(ScanError::Workspace)? {
            let name = entry.file_name();
            let Some(name) = name.to_str() else { continue };
            if !self.matches(name) {
                continue;
            }
            let file_type = entry.file_type().await.map_err(ScanError::Workspace)?;
            if file_type.is_file() {
                found.push(entry.path());
            }
        }
        found.sort_by(|a, b| a.file_name().cmp(&b.file_name()));
        Ok(found)
    }
}

impl fmt::Display for OutputPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}<N>{}", self.prefix, self.suffix)
    }
}

fn parent_dir(path: &Path) -> PathBuf {
    match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
        _ => PathBuf::from("."),
    }
}

/// Run one tool and return the files it wrote that match `pattern`.
///
/// Fails with [`ScanError::NoOutputProduced`] when nothing matches.
pub async fn invoke_and_collect(
    runner: &dyn ToolRunner,
    invocation: &ToolInvocation,
    pattern: &OutputPattern,
) -> Result<Vec<PathBuf>, ScanError> {
    runner.run(invocation).await?;
    let files = pattern.collect().await?;
    if files.is_empty() {
        return Err(ScanError::NoOutputProduced {
            stage: invocation.stage,
            program: invocation.program.clone(),
            pattern: pattern.to_string(),
        });
    }
    debug!(
        stage = %invocation.stage,
        "{} produced {} file(s) matching {}",
        invocation.program,
        files.len(),
        pattern
    );
    Ok(files)
}

/// Run one tool that writes exactly one file at `expected`.
pub async fn invoke_single(
    runner: &dyn ToolRunner,
    invocation: &ToolInvocation,
    expected: &Path,
) -> Result<PathBuf, ScanError> {
    runner.run(invocation).await?;
    let written = tokio::fs::metadata(expected)
        .await
        .map(|m| m.is_file())
        .unwrap_or(false);
    if !written {
        return Err(ScanError::NoOutputProduced {
            stage: invocation.stage,
            program: invocation.program.clone(),
            pattern: expected
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default(),
        });
    }
    Ok(expected.to_path_buf())
}
