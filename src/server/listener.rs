use std::net::SocketAddr;

use anyhow::Context;
use tokio::net::{TcpListener, TcpSocket};
use tracing::info;

use crate::config::{Config, ServerConfig};
use crate::handler::Dispatcher;
use crate::http::connection::Connection;

/// Creates the listening socket with the configured backlog.
///
/// Any failure here is a fatal startup error.
pub fn bind(cfg: &ServerConfig) -> anyhow::Result<TcpListener> {
    let addr: SocketAddr = format!("{}:{}", cfg.host, cfg.port)
        .parse()
        .with_context(|| format!("invalid listen address {}:{}", cfg.host, cfg.port))?;

    let socket = if addr.is_ipv4() {
        TcpSocket::new_v4()
    } else {
        TcpSocket::new_v6()
    }
    .context("Error creating socket")?;

    socket.set_reuseaddr(true).context("Error setting SO_REUSEADDR")?;
    socket
        .bind(addr)
        .with_context(|| format!("Bind failed on {}", addr))?;

    socket
        .listen(cfg.backlog)
        .with_context(|| format!("Error listening on {}", addr))
}

/// The file server: configuration plus the dispatcher that owns the
/// session table.
pub struct Server {
    config: Config,
    dispatcher: Dispatcher,
}

impl Server {
    pub fn new(config: Config) -> Self {
        let dispatcher = Dispatcher::new(&config);
        Self { config, dispatcher }
    }

    pub fn bind(&self) -> anyhow::Result<TcpListener> {
        bind(&self.config.server)
    }

    /// Binds and serves forever.
    pub async fn run(self) -> anyhow::Result<()> {
        let listener = self.bind()?;
        self.serve(listener).await
    }

    /// Accepts connections one at a time. Each is handled to completion
    /// before the next accept.
    pub async fn serve(mut self, listener: TcpListener) -> anyhow::Result<()> {
        info!(
            addr = %listener.local_addr()?,
            root = %self.config.static_files.root,
            "Listening"
        );

        loop {
            let (socket, peer) = match listener.accept().await {
                Ok(accepted) => accepted,
                Err(e) => {
                    tracing::error!(error = %e, "Error accepting connection");
                    continue;
                }
            };
            info!("Accepted connection from {}", peer);

            let conn = Connection::new(socket, peer, &self.config.server);
            if let Err(e) = conn.run(&mut self.dispatcher).await {
                tracing::warn!("Connection error from {}: {}", peer, e);
            }
        }
    }
}
