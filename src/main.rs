mod agent;
mod chat;
mod config;
mod entity;
mod intent;
mod session;
mod shell;
mod store;
mod utils;

use anyhow::Result;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into()),
        ))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let config = config::Config::load()?;

    let provider = agent::create_provider(&config)?;
    let store = store::create_store(&config).await?;
    let system = agent::build_preamble(config.persona, config.structured_output);

    let service = chat::ChatService::new(provider, store, system);
    let mut shell = shell::Shell::new(service, config.persona);

    shell.run().await?;
    info!("Shutdown complete");

    Ok(())
}
