use anyhow::Context;
use splitbill_ocr::ScanPipeline;
use splitbill_server::{build_router, default_recognizer, AppState, ServerConfig};
use tokio::net::TcpListener;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,splitbill_ocr=debug")),
        )
        .init();

    let config = ServerConfig::load().context("Failed to load configuration")?;

    let recognizer = default_recognizer(&config.recognizer);
    let pipeline = ScanPipeline::new(recognizer, config.scan.clone());
    let app = build_router(AppState::new(pipeline), &config);

    let listener = TcpListener::bind(&config.bind)
        .await
        .with_context(|| format!("Failed to bind {}", config.bind))?;
    info!("Listening on {}", config.bind);

    axum::serve(listener, app).await.context("Server error")?;
    Ok(())
}
