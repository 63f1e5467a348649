mod app;

use tracing_subscriber::EnvFilter;

use app::App;
use insight::config::ClientConfig;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Loaded before the subscriber so RUST_LOG may come from .env
    let dotenv = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    match dotenv {
        Ok(path) => tracing::debug!("Loaded environment from {}", path.display()),
        Err(e) if e.not_found() => {}
        Err(e) => tracing::warn!("Ignoring unreadable .env file: {}", e),
    }

    let config = ClientConfig::from_env()?;
    tracing::debug!(?config, "Loaded configuration");

    let app = App::init(config).await?;
    app.run().await
}
