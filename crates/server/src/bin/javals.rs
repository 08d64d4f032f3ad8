use anyhow::Result;
use javals_server::{Server, ServerConfig};

#[tokio::main]
async fn main() -> Result<()> {
    // Logging goes to stderr only; stdout carries the protocol.
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn"))
        .target(env_logger::Target::Stderr)
        .init();

    let config = ServerConfig::from_env();
    log::info!("starting javals on stdio");
    log::debug!("configuration: {config:?}");

    let server = Server::detached(config);
    let clean = server.run(tokio::io::stdin(), tokio::io::stdout()).await?;

    if !clean {
        log::warn!("stopped without a preceding shutdown request");
        std::process::exit(1);
    }
    log::info!("javals stopped");
    Ok(())
}
