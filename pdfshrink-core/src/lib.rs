//! # pdfshrink
//!
//! Request-scoped PDF compression through Ghostscript.
//!
//! The crate does not compress anything itself. It stages an upload in its own
//! folder, makes sure the file carries a `.pdf` extension, runs the external
//! tool with fixed settings, validates the result and removes every file it
//! created once the caller is done with the output.
//!
//! ```rust,no_run
//! use pdfshrink::{Ghostscript, NonPdfPolicy, StagingArea};
//!
//! # async fn example() -> pdfshrink::Result<()> {
//! let staging = StagingArea::init("uploads")?;
//! let pending = staging.begin()?;
//! std::fs::write(pending.path(), std::fs::read("report.pdf")?)?;
//! let job = pending.finish("report.pdf", Some("application/pdf".into()), 2_000_000);
//!
//! let output = job.run(&Ghostscript::new(), NonPdfPolicy::Warn).await?;
//! output.copy_to("compressed-report.pdf".as_ref()).await?;
//! # Ok(())
//! # }
//! ```

pub mod error;
pub mod ghostscript;
pub mod job;
pub mod staging;

pub use error::{Result, ShrinkError};
pub use ghostscript::{Ghostscript, ToolOutput, DEFAULT_PROGRAM, DEFAULT_TIMEOUT};
pub use job::{CompressedOutput, CompressionJob, JobState};
pub use staging::{
    extension_of, sanitize_output_name, NonPdfPolicy, PendingUpload, StagingArea,
    UploadedArtifact, PDF_EXTENSION, PDF_MEDIA_TYPE,
};
