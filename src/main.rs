use duo_signal::{AppState, SignalConfig, router};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = SignalConfig::from_env()?;
    let addr = config.bind_addr;
    let app = router(AppState::new(config));

    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!("signaling relay listening on {}", addr);
    axum::serve(listener, app).await?;

    Ok(())
}
