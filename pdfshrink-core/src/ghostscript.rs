//! Ghostscript invocation.
//!
//! The tool is always called with the same flags: `pdfwrite` device, PDF 1.4
//! compatibility and the `/screen` quality preset, non-interactive. Arguments
//! are passed as a list, never through a shell.

use crate::error::{Result, ShrinkError};
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;
use tracing::{debug, error, info, warn};

/// Executable name looked up on `PATH`.
#[cfg(windows)]
pub const DEFAULT_PROGRAM: &str = "gswin64c";
#[cfg(not(windows))]
pub const DEFAULT_PROGRAM: &str = "gs";

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(300);

const FIXED_FLAGS: [&str; 6] = [
    "-sDEVICE=pdfwrite",
    "-dCompatibilityLevel=1.4",
    "-dPDFSETTINGS=/screen",
    "-dNOPAUSE",
    "-dQUIET",
    "-dBATCH",
];

/// Captured streams of a finished tool run.
#[derive(Debug, Clone, Default)]
pub struct ToolOutput {
    pub stdout: String,
    pub stderr: String,
}

#[derive(Debug, Clone)]
pub struct Ghostscript {
    program: PathBuf,
    timeout: Duration,
}

impl Default for Ghostscript {
    fn default() -> Self {
        Self::new()
    }
}

impl Ghostscript {
    pub fn new() -> Self {
        Self::with_program(DEFAULT_PROGRAM)
    }

    /// Use a specific executable instead of the platform default.
    pub fn with_program(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            timeout: DEFAULT_TIMEOUT,
        }
    }

    /// Kill the tool and fail with [`ShrinkError::Timeout`] after `timeout`.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn program(&self) -> &Path {
        &self.program
    }

    pub fn timeout_duration(&self) -> Duration {
        self.timeout
    }

    /// Full argument list for compressing `input` into `output`.
    pub fn args(input: &Path, output: &Path) -> Vec<OsString> {
        let mut output_flag = OsString::from("-sOutputFile=");
        output_flag.push(output.as_os_str());

        let mut args: Vec<OsString> = FIXED_FLAGS.iter().map(OsString::from).collect();
        args.push(output_flag);
        args.push(input.as_os_str().to_owned());
        args
    }

    /// Run the tool and wait for it to exit.
    ///
    /// A non-zero exit or a failure to start yields [`ShrinkError::Compression`]
    /// carrying the tool's stderr (or the start error). On timeout the child is
    /// killed before [`ShrinkError::Timeout`] is returned.
    pub async fn compress(&self, input: &Path, output: &Path) -> Result<ToolOutput> {
        let args = Self::args(input, output);
        info!(
            program = %self.program.display(),
            args = ?args,
            "Executing Ghostscript command"
        );

        let child = Command::new(&self.program)
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| {
                error!(
                    program = %self.program.display(),
                    error = %e,
                    "Failed to start Ghostscript"
                );
                ShrinkError::Compression(format!(
                    "failed to start {}: {e}",
                    self.program.display()
                ))
            })?;

        // Dropping the wait future on timeout drops the child, which kills it.
        let result = match tokio::time::timeout(self.timeout, child.wait_with_output()).await {
            Ok(result) => result.map_err(|e| {
                ShrinkError::Compression(format!("failed to wait for Ghostscript: {e}"))
            })?,
            Err(_) => {
                warn!(timeout_secs = self.timeout.as_secs(), "Ghostscript timed out, killed");
                return Err(ShrinkError::Timeout(self.timeout));
            }
        };

        let output = ToolOutput {
            stdout: String::from_utf8_lossy(&result.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&result.stderr).into_owned(),
        };

        if !result.status.success() {
            error!(status = %result.status, stderr = %output.stderr, "Compression error");
            let diagnostic = output.stderr.trim_end();
            return Err(ShrinkError::Compression(if diagnostic.is_empty() {
                format!("{} exited with {}", self.program.display(), result.status)
            } else {
                diagnostic.to_string()
            }));
        }

        debug!(stdout = %output.stdout, "Ghostscript stdout");
        if !output.stderr.is_empty() {
            // gs prints warnings on stderr even for successful runs
            debug!(stderr = %output.stderr, "Ghostscript stderr (possibly informational)");
        }
        Ok(output)
    }

    /// `<program> --version`, trimmed.
    pub async fn version(&self) -> Result<String> {
        let mut command = Command::new(&self.program);
        command
            .arg("--version")
            .stdin(Stdio::null())
            .kill_on_drop(true);
        let result = tokio::time::timeout(self.timeout, command.output())
            .await
            .map_err(|_| ShrinkError::Timeout(self.timeout))?
            .map_err(|e| {
                ShrinkError::Compression(format!(
                    "failed to start {}: {e}",
                    self.program.display()
                ))
            })?;

        if !result.status.success() {
            return Err(ShrinkError::Compression(
                String::from_utf8_lossy(&result.stderr).trim_end().to_string(),
            ));
        }
        Ok(String::from_utf8_lossy(&result.stdout).trim().to_string())
    }
}
