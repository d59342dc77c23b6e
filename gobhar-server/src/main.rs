use anyhow::Result;
use gobhar_server::{build, public_link, ServerConfig};

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment variables from .env file
    dotenvy::dotenv().ok();

    if std::env::var("RUST_LOG").is_err() {
        std::env::set_var("RUST_LOG", "info");
    }
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let config = ServerConfig::from_env()?;
    let app = build(&config)?;

    tracing::info!(
        store_dir = %config.store_dir.display(),
        obfuscated_ids = config.secret.is_some(),
        chunk_size = config.gateway.chunk_size,
        "[gobhar] serving on {}",
        config.base_url
    );
    if config.secret.is_some() {
        tracing::info!("example stream link: {}", public_link(&config, "stream", 1));
        tracing::info!("example download link: {}", public_link(&config, "download", 1));
    } else {
        tracing::info!("files are served by name, e.g. {}/stream/<file name>", config.base_url);
    }

    app.listen(config.addr()).await?;

    Ok(())
}
