use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ShrinkError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("No file uploaded.")]
    MissingFile,

    #[error("Only PDF uploads are accepted (got \"{0}\").")]
    UnsupportedType(String),

    #[error("Error preparing file for compression: {source}")]
    Staging {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Error compressing PDF: {0}")]
    Compression(String),

    #[error("PDF compression resulted in an empty file.")]
    EmptyOutput,

    #[error("PDF compression failed: output file issue.")]
    OutputIssue(#[source] std::io::Error),

    #[error("PDF compression timed out after {} seconds.", .0.as_secs())]
    Timeout(Duration),
}

impl ShrinkError {
    /// True for failures caused by the request itself rather than the server.
    pub fn is_client_error(&self) -> bool {
        matches!(self, Self::MissingFile | Self::UnsupportedType(_))
    }
}

pub type Result<T> = std::result::Result<T, ShrinkError>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{Error as IoError, ErrorKind};

    #[test]
    fn test_fixed_messages() {
        assert_eq!(ShrinkError::MissingFile.to_string(), "No file uploaded.");
        assert_eq!(
            ShrinkError::EmptyOutput.to_string(),
            "PDF compression resulted in an empty file."
        );
        assert_eq!(
            ShrinkError::OutputIssue(IoError::new(ErrorKind::NotFound, "gone")).to_string(),
            "PDF compression failed: output file issue."
        );
    }

    #[test]
    fn test_compression_error_keeps_diagnostics_verbatim() {
        let error = ShrinkError::Compression("Unrecoverable error, exit code 1".to_string());
        assert!(error
            .to_string()
            .contains("Unrecoverable error, exit code 1"));
    }

    #[test]
    fn test_timeout_message() {
        let error = ShrinkError::Timeout(Duration::from_secs(90));
        assert_eq!(
            error.to_string(),
            "PDF compression timed out after 90 seconds."
        );
    }

    #[test]
    fn test_staging_error_source() {
        let error = ShrinkError::Staging {
            path: PathBuf::from("uploads/job-1/upload"),
            source: IoError::new(ErrorKind::PermissionDenied, "access denied"),
        };
        assert!(error.to_string().starts_with("Error preparing file"));
        let source = std::error::Error::source(&error).unwrap();
        assert_eq!(source.to_string(), "access denied");
    }

    #[test]
    fn test_client_errors() {
        assert!(ShrinkError::MissingFile.is_client_error());
        assert!(ShrinkError::UnsupportedType("a.txt".into()).is_client_error());
        assert!(!ShrinkError::EmptyOutput.is_client_error());
        assert!(!ShrinkError::Compression("x".into()).is_client_error());
    }

    #[test]
    fn test_error_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<ShrinkError>();
    }
}
