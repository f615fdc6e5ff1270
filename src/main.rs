use porter::config::{Config, parse_port};
use porter::server::Server;

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    let mut cfg = Config::load()?;

    tracing_subscriber::fmt()
        .with_target(false)
        .with_level(true)
        .with_max_level(cfg.log_level.as_level())
        .init();

    if let Some(arg) = std::env::args().nth(1) {
        match parse_port(&arg) {
            Some(port) => cfg.server.port = port,
            None => tracing::warn!(
                "Invalid port number {:?}. Using port {}",
                arg,
                cfg.server.port
            ),
        }
    }

    tracing::info!("Starting server...");

    tokio::select! {
        res = Server::new(cfg).run() => {
            res?;
        }

        _ = tokio::signal::ctrl_c() => {
            tracing::info!("Shutdown signal received");
        }
    }

    tracing::info!("Server stopped.");
    Ok(())
}
