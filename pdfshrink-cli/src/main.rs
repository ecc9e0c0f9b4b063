use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use pdfshrink::{Ghostscript, NonPdfPolicy, StagingArea, DEFAULT_PROGRAM};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::debug;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(
    name = "pdfshrink",
    about = "Shrink PDF files with Ghostscript",
    version,
    author
)]
struct Cli {
    /// Log what is happening (repeat for more detail)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Compress a PDF file
    Compress {
        /// Input PDF file
        input: PathBuf,

        /// Output file path (defaults to compressed-<name>.pdf next to the input)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Seconds before Ghostscript is killed
        #[arg(short, long, default_value_t = 300)]
        timeout_secs: u64,

        /// Inputs not named *.pdf: "warn" or "reject"
        #[arg(long, default_value_t = NonPdfPolicy::Warn)]
        non_pdf: NonPdfPolicy,
    },

    /// Check that Ghostscript is installed
    Check,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match cli.command {
        Commands::Compress {
            input,
            output,
            timeout_secs,
            non_pdf,
        } => {
            let ghostscript = Ghostscript::new().timeout(Duration::from_secs(timeout_secs));
            compress(&input, output.as_deref(), &ghostscript, non_pdf).await?;
        }

        Commands::Check => match Ghostscript::new().version().await {
            Ok(version) => println!("✓ Ghostscript {version} ({DEFAULT_PROGRAM})"),
            Err(e) => {
                eprintln!("Error: {DEFAULT_PROGRAM} is not usable: {e}");
                eprintln!("Install Ghostscript and make sure it is on PATH.");
                std::process::exit(1);
            }
        },
    }

    Ok(())
}

fn init_tracing(verbose: u8) {
    let default = match verbose {
        0 => "warn",
        1 => "pdfshrink=info",
        _ => "pdfshrink=debug",
    };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default.into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

async fn compress(
    input: &Path,
    output: Option<&Path>,
    ghostscript: &Ghostscript,
    policy: NonPdfPolicy,
) -> Result<()> {
    let name = input
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .with_context(|| format!("{} is not a file", input.display()))?;

    // Same pipeline as the server, staged in a private scratch folder.
    let scratch = tempfile::tempdir().context("Failed to create scratch directory")?;
    let staging = StagingArea::init(scratch.path())?;
    let pending = staging.begin()?;
    let size = tokio::fs::copy(input, pending.path())
        .await
        .with_context(|| format!("Failed to read {}", input.display()))?;
    debug!(size, "Staged input");

    let job = pending.finish(name, None, size);
    let compressed = job.run(ghostscript, policy).await?;

    let dest = match output {
        Some(path) => path.to_path_buf(),
        None => input
            .parent()
            .unwrap_or_else(|| Path::new("."))
            .join(compressed.download_name()),
    };
    compressed
        .copy_to(&dest)
        .await
        .with_context(|| format!("Failed to write {}", dest.display()))?;

    let ratio = compressed
        .ratio()
        .map(|r| format!(" ({:.1}%)", r * 100.0))
        .unwrap_or_default();
    println!(
        "✓ Compressed {}: {} -> {}{ratio}",
        input.display(),
        format_size(compressed.original_size()),
        format_size(compressed.size())
    );
    println!("  Written to {}", dest.display());
    Ok(())
}

fn format_size(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = 1024 * 1024;
    if bytes < KB {
        format!("{bytes} B")
    } else if bytes < MB {
        format!("{:.1} KB", bytes as f64 / KB as f64)
    } else {
        format!("{:.2} MB", bytes as f64 / MB as f64)
    }
}
