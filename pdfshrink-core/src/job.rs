//! Per-request compression lifecycle.
//!
//! `Staged -> ExtensionNormalized -> Invoked -> {Succeeded -> Streaming, Failed}`
//!
//! A request is in its received phase while it is still a
//! [`PendingUpload`](crate::PendingUpload); it has no [`JobState`] until the
//! body is on disk. Cleanup is not a state either: both [`CompressionJob`] and
//! [`CompressedOutput`] delete their files on drop, so every exit path
//! (including early returns and panics) ends cleaned up.

use crate::error::{Result, ShrinkError};
use crate::ghostscript::Ghostscript;
use crate::staging::{
    remove_if_exists, staging_error, NonPdfPolicy, UploadedArtifact, PDF_EXTENSION,
};
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use tempfile::TempDir;
use tracing::{error, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobState {
    Staged,
    ExtensionNormalized,
    Invoked,
    Succeeded,
    Failed,
    Streaming,
}

/// A staged upload on its way through the external tool.
#[derive(Debug)]
pub struct CompressionJob {
    dir: Option<TempDir>,
    artifact: UploadedArtifact,
    input: PathBuf,
    state: JobState,
}

impl CompressionJob {
    pub(crate) fn new(dir: TempDir, artifact: UploadedArtifact) -> Self {
        info!(
            name = %artifact.original_name,
            size = artifact.size,
            content_type = ?artifact.content_type,
            "Received file"
        );
        let input = artifact.path.clone();
        Self {
            dir: Some(dir),
            artifact,
            input,
            state: JobState::Staged,
        }
    }

    pub fn artifact(&self) -> &UploadedArtifact {
        &self.artifact
    }

    pub fn state(&self) -> JobState {
        self.state
    }

    /// Current location of the staged input. Differs from the artifact path
    /// once the extension has been normalized.
    pub fn input_path(&self) -> &Path {
        &self.input
    }

    /// Where the tool is told to write. Lives in the job folder, so two
    /// uploads with the same name never share it.
    pub fn output_path(&self) -> PathBuf {
        let name = self.artifact.download_name();
        match &self.dir {
            Some(dir) => dir.path().join(name),
            None => PathBuf::from(name),
        }
    }

    /// Make sure the staged file ends in `.pdf`; the tool picks its input
    /// format from the extension.
    ///
    /// Under [`NonPdfPolicy::Reject`] an upload that neither ends in `.pdf`
    /// nor declares `application/pdf` fails with
    /// [`ShrinkError::UnsupportedType`].
    pub fn normalize_extension(&mut self, policy: NonPdfPolicy) -> Result<()> {
        if self.state != JobState::Staged {
            return Ok(());
        }

        let original_extension = self.artifact.original_extension();
        if original_extension != PDF_EXTENSION {
            if policy == NonPdfPolicy::Reject && !self.artifact.declares_pdf_type() {
                warn!(name = %self.artifact.original_name, "Rejected non-PDF upload");
                return Err(ShrinkError::UnsupportedType(
                    self.artifact.original_name.clone(),
                ));
            }
            warn!(
                name = %self.artifact.original_name,
                "Uploaded file is not a PDF based on extension, processing anyway"
            );
            self.rename_input(PDF_EXTENSION)?;
        } else if !has_pdf_extension(&self.input) {
            self.rename_input(&original_extension)?;
        }

        self.state = JobState::ExtensionNormalized;
        Ok(())
    }

    fn rename_input(&mut self, suffix: &str) -> Result<()> {
        let mut renamed = OsString::from(self.input.as_os_str());
        renamed.push(suffix);
        let renamed = PathBuf::from(renamed);

        if let Err(e) = std::fs::rename(&self.input, &renamed) {
            error!(
                from = %self.input.display(),
                to = %renamed.display(),
                error = %e,
                "Failed to rename input file"
            );
            remove_if_exists(&self.artifact.path, "staged upload");
            self.state = JobState::Failed;
            return Err(staging_error(&self.input, e));
        }

        info!(path = %renamed.display(), "Renamed input file to include .pdf extension");
        self.input = renamed;
        Ok(())
    }

    /// Run the tool and validate what it wrote.
    ///
    /// The staged input is deleted before this returns, whatever the outcome.
    pub async fn compress(mut self, ghostscript: &Ghostscript) -> Result<CompressedOutput> {
        let output = self.output_path();
        info!(
            input = %self.input.display(),
            output = %output.display(),
            "Processing input"
        );

        self.state = JobState::Invoked;
        let result = ghostscript.compress(&self.input, &output).await;
        self.remove_inputs();

        if let Err(e) = result {
            self.state = JobState::Failed;
            remove_if_exists(&output, "output file");
            return Err(e);
        }

        let size = match tokio::fs::metadata(&output).await {
            Ok(meta) => meta.len(),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => 0,
            Err(e) => {
                error!(error = %e, "Error retrieving output file size");
                self.state = JobState::Failed;
                remove_if_exists(&output, "output file");
                return Err(ShrinkError::OutputIssue(e));
            }
        };
        info!(size, "Output file size");

        if size == 0 {
            error!("Output file is missing or empty");
            self.state = JobState::Failed;
            remove_if_exists(&output, "output file");
            return Err(ShrinkError::EmptyOutput);
        }

        self.state = JobState::Succeeded;
        Ok(CompressedOutput {
            path: output,
            download_name: self.artifact.download_name(),
            size,
            original_size: self.artifact.size,
            state: JobState::Succeeded,
            dir: self.dir.take(),
        })
    }

    /// Normalize the extension and compress in one go.
    pub async fn run(
        mut self,
        ghostscript: &Ghostscript,
        policy: NonPdfPolicy,
    ) -> Result<CompressedOutput> {
        self.normalize_extension(policy)?;
        self.compress(ghostscript).await
    }

    fn remove_inputs(&self) {
        remove_if_exists(&self.input, "input file");
        if self.input != self.artifact.path {
            remove_if_exists(&self.artifact.path, "original staged file");
        }
    }
}

impl Drop for CompressionJob {
    fn drop(&mut self) {
        self.remove_inputs();
    }
}

fn has_pdf_extension(path: &Path) -> bool {
    path.extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case(&PDF_EXTENSION[1..]))
}

/// A validated, non-empty result of the external tool.
///
/// Dropping it deletes the file and its job folder.
#[derive(Debug)]
pub struct CompressedOutput {
    path: PathBuf,
    download_name: String,
    size: u64,
    original_size: u64,
    state: JobState,
    dir: Option<TempDir>,
}

impl CompressedOutput {
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Sanitized `compressed-<name>.pdf` for the client.
    pub fn download_name(&self) -> &str {
        &self.download_name
    }

    pub fn size(&self) -> u64 {
        self.size
    }

    pub fn original_size(&self) -> u64 {
        self.original_size
    }

    pub fn state(&self) -> JobState {
        self.state
    }

    /// Compressed size over original size; `None` when the original was empty.
    pub fn ratio(&self) -> Option<f64> {
        (self.original_size > 0).then(|| self.size as f64 / self.original_size as f64)
    }

    /// Open the output for streaming to a client.
    pub async fn open(&mut self) -> Result<tokio::fs::File> {
        let file = tokio::fs::File::open(&self.path)
            .await
            .map_err(ShrinkError::OutputIssue)?;
        self.state = JobState::Streaming;
        Ok(file)
    }

    /// Copy the output somewhere that outlives the job.
    pub async fn copy_to(&self, dest: &Path) -> Result<u64> {
        Ok(tokio::fs::copy(&self.path, dest).await?)
    }
}

impl Drop for CompressedOutput {
    fn drop(&mut self) {
        remove_if_exists(&self.path, "output file");
    }
}
