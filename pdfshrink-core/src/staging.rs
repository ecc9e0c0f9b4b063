//! Staging area for uploaded files.
//!
//! Every upload gets its own `job-XXXXXX` folder below the staging root. The
//! folder is removed when the owning [`PendingUpload`], [`crate::CompressionJob`]
//! or [`crate::CompressedOutput`] is dropped, so nothing outlives the request.

use crate::error::{Result, ShrinkError};
use crate::job::CompressionJob;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use tempfile::TempDir;
use tracing::{debug, error, info};

/// Extension the external tool needs to see on its input, with the dot.
pub const PDF_EXTENSION: &str = ".pdf";

/// Media type browsers declare for PDF files.
pub const PDF_MEDIA_TYPE: &str = "application/pdf";

/// Name of the staged upload inside its job folder. Carries no extension, like
/// a token-named file from a multipart parser.
const UPLOAD_FILE_NAME: &str = "upload";

/// What to do with uploads whose declared name does not end in `.pdf`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum NonPdfPolicy {
    /// Log a warning and hand the file to the tool anyway.
    #[default]
    Warn,
    /// Refuse the upload unless its declared media type says PDF.
    Reject,
}

impl FromStr for NonPdfPolicy {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "warn" => Ok(Self::Warn),
            "reject" => Ok(Self::Reject),
            other => Err(format!(
                "unknown non-PDF policy '{other}' (expected 'warn' or 'reject')"
            )),
        }
    }
}

impl fmt::Display for NonPdfPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Warn => f.write_str("warn"),
            Self::Reject => f.write_str("reject"),
        }
    }
}

/// Process-wide scratch directory holding one folder per in-flight request.
#[derive(Debug, Clone)]
pub struct StagingArea {
    root: PathBuf,
}

impl StagingArea {
    /// Create the staging root if it does not exist yet.
    ///
    /// Called once at startup, before any request is accepted.
    pub fn init(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        std::fs::create_dir_all(&root)?;
        let root = std::fs::canonicalize(&root)?;
        info!(path = %root.display(), "Staging directory ready");
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Reserve a request-scoped folder and the path the upload will be written to.
    pub fn begin(&self) -> Result<PendingUpload> {
        let dir = tempfile::Builder::new()
            .prefix("job-")
            .tempdir_in(&self.root)?;
        let path = dir.path().join(UPLOAD_FILE_NAME);
        debug!(path = %path.display(), "Reserved staging slot");
        Ok(PendingUpload { dir, path })
    }

    /// Number of entries currently in the staging root.
    pub fn entry_count(&self) -> Result<usize> {
        Ok(std::fs::read_dir(&self.root)?.count())
    }
}

/// A staging slot whose bytes are still being received.
#[derive(Debug)]
pub struct PendingUpload {
    dir: TempDir,
    path: PathBuf,
}

impl PendingUpload {
    /// Where the upload body should be written.
    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn dir(&self) -> &Path {
        self.dir.path()
    }

    /// Record the client-declared metadata once the body is on disk.
    pub fn finish(
        self,
        original_name: impl Into<String>,
        content_type: Option<String>,
        size: u64,
    ) -> CompressionJob {
        let artifact = UploadedArtifact {
            original_name: original_name.into(),
            content_type,
            size,
            path: self.path,
        };
        CompressionJob::new(self.dir, artifact)
    }
}

/// A received upload as declared by the client.
#[derive(Debug, Clone)]
pub struct UploadedArtifact {
    pub original_name: String,
    pub content_type: Option<String>,
    pub size: u64,
    /// Server-assigned location of the bytes.
    pub path: PathBuf,
}

impl UploadedArtifact {
    /// Lowercased extension of the declared filename, dot included.
    pub fn original_extension(&self) -> String {
        extension_of(&self.original_name).to_ascii_lowercase()
    }

    pub fn has_pdf_extension(&self) -> bool {
        self.original_extension() == PDF_EXTENSION
    }

    pub fn declares_pdf_type(&self) -> bool {
        self.content_type
            .as_deref()
            .and_then(|ct| ct.split(';').next())
            .is_some_and(|ct| ct.trim().eq_ignore_ascii_case(PDF_MEDIA_TYPE))
    }

    /// Name offered to the client for the compressed result.
    pub fn download_name(&self) -> String {
        sanitize_output_name(&self.original_name)
    }
}

/// Last path component of a client-supplied name. Browsers normally send a bare
/// name but some old clients include the full local path.
fn base_name(name: &str) -> &str {
    name.rsplit(['/', '\\']).next().unwrap_or(name)
}

/// Extension of `name` including the leading dot, or `""`.
///
/// A leading dot alone (`.profile`) does not count as an extension.
pub fn extension_of(name: &str) -> &str {
    let base = base_name(name);
    match base.rfind('.') {
        Some(idx) if idx > 0 => &base[idx..],
        _ => "",
    }
}

/// `compressed-<stem>.pdf`, with every character outside `[A-Za-z0-9.-]` of the
/// stem replaced by `_`.
pub fn sanitize_output_name(original_name: &str) -> String {
    let base = base_name(original_name);
    let stem = &base[..base.len() - extension_of(base).len()];
    let sanitized: String = stem
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '.' || c == '-' {
                c
            } else {
                '_'
            }
        })
        .collect();
    format!("compressed-{sanitized}{PDF_EXTENSION}")
}

/// Delete `path` if it is still there. Failures are logged, never returned.
pub(crate) fn remove_if_exists(path: &Path, what: &str) {
    match std::fs::remove_file(path) {
        Ok(()) => info!(path = %path.display(), "Cleaned up {what}"),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => error!(path = %path.display(), error = %e, "Error cleaning up {what}"),
    }
}

pub(crate) fn staging_error(path: &Path, source: std::io::Error) -> ShrinkError {
    ShrinkError::Staging {
        path: path.to_path_buf(),
        source,
    }
}
