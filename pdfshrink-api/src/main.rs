use anyhow::Context;
use clap::Parser;
use pdfshrink_api::{app, AppState, Config};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "pdfshrink=debug,pdfshrink_api=debug,tower_http=debug".into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::parse();
    info!(
        non_pdf_policy = %config.non_pdf_policy,
        timeout_secs = config.timeout_secs,
        max_upload_mb = config.max_upload_mb,
        "Starting server"
    );

    let state = AppState::from_config(&config).with_context(|| {
        format!(
            "failed to prepare staging directory {}",
            config.uploads_dir.display()
        )
    })?;

    let listener = tokio::net::TcpListener::bind(config.addr())
        .await
        .with_context(|| format!("failed to bind {}", config.addr()))?;

    info!("pdfshrink API listening on http://{}", listener.local_addr()?);

    axum::serve(listener, app(state)).await?;
    Ok(())
}
