use clap::Parser;
use pdfshrink::NonPdfPolicy;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::PathBuf;
use std::time::Duration;

/// Server settings, read from flags or the environment.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "pdfshrink-api",
    about = "HTTP service compressing uploaded PDFs with Ghostscript",
    version
)]
pub struct Config {
    /// Address to bind
    #[arg(long, env = "HOST", default_value_t = IpAddr::V4(Ipv4Addr::UNSPECIFIED))]
    pub host: IpAddr,

    /// Port to listen on
    #[arg(short, long, env = "PORT", default_value_t = 3000)]
    pub port: u16,

    /// Staging directory for uploads, created at startup if missing
    #[arg(long, env = "UPLOADS_DIR", default_value = "uploads")]
    pub uploads_dir: PathBuf,

    /// Seconds before a running Ghostscript is killed
    #[arg(long, env = "COMPRESS_TIMEOUT_SECS", default_value_t = 300)]
    pub timeout_secs: u64,

    /// Uploads not named *.pdf: "warn" processes them anyway, "reject" refuses them
    #[arg(long, env = "NON_PDF_POLICY", default_value_t = NonPdfPolicy::Warn)]
    pub non_pdf_policy: NonPdfPolicy,

    /// Largest accepted request body, in megabytes
    #[arg(long, env = "MAX_UPLOAD_MB", default_value_t = 100)]
    pub max_upload_mb: usize,
}

impl Config {
    pub fn addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn max_upload_bytes(&self) -> usize {
        self.max_upload_mb.saturating_mul(1024 * 1024)
    }
}
