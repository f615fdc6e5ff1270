use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use bytes::BytesMut;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;

use crate::config::ServerConfig;
use crate::handler::{CgiOutcome, Dispatch, Dispatcher};
use crate::http::parser::{MAX_REQUEST_BYTES, parse_request, request_line_end};
use crate::http::request::Request;
use crate::http::writer::ResponseWriter;

/// One accepted client, handled from first read to close.
pub struct Connection {
    stream: TcpStream,
    peer: SocketAddr,
    buffer: BytesMut,
    state: ConnectionState,
    read_timeout: Option<Duration>,
    write_timeout: Option<Duration>,
}

pub enum ConnectionState {
    Reading,
    Processing(Request),
    Writing(ResponseWriter),
    Executing {
        script: PathBuf,
        set_cookie: Option<String>,
    },
    Closed,
    /// Close with a reset so the client sees the response as broken
    Reset,
}

impl Connection {
    pub fn new(stream: TcpStream, peer: SocketAddr, config: &ServerConfig) -> Self {
        Self {
            stream,
            peer,
            buffer: BytesMut::with_capacity(MAX_REQUEST_BYTES),
            state: ConnectionState::Reading,
            read_timeout: config.read_timeout(),
            write_timeout: config.write_timeout(),
        }
    }

    /// Reads one request, answers it and closes the connection.
    ///
    /// The stream is closed on every path out of here, errors included.
    pub async fn run(mut self, dispatcher: &mut Dispatcher) -> anyhow::Result<()> {
        let result = self.drive(dispatcher).await;
        self.close().await;
        result
    }

    async fn drive(&mut self, dispatcher: &mut Dispatcher) -> anyhow::Result<()> {
        loop {
            match std::mem::replace(&mut self.state, ConnectionState::Closed) {
                ConnectionState::Reading => {
                    if let Some(req) = self.read_request().await? {
                        self.state = ConnectionState::Processing(req);
                    }
                }

                ConnectionState::Processing(req) => {
                    self.state = match dispatcher.dispatch(&req).await {
                        Dispatch::Respond(response) => {
                            tracing::info!(
                                peer = %self.peer,
                                method = req.method.as_str(),
                                path = %req.path,
                                status = response.status.as_u16(),
                                "Request served"
                            );
                            ConnectionState::Writing(ResponseWriter::new(&response))
                        }
                        Dispatch::Execute { script, set_cookie } => {
                            tracing::info!(
                                peer = %self.peer,
                                path = %req.path,
                                script = %script.display(),
                                "Running script"
                            );
                            ConnectionState::Executing { script, set_cookie }
                        }
                    };
                }

                ConnectionState::Writing(mut writer) => {
                    writer
                        .write_with_timeout(&mut self.stream, self.write_timeout)
                        .await?;
                }

                ConnectionState::Executing { script, set_cookie } => {
                    let outcome = dispatcher
                        .cgi()
                        .run(&script, &mut self.stream, set_cookie.as_deref())
                        .await?;

                    if outcome == CgiOutcome::Aborted {
                        tracing::warn!(
                            peer = %self.peer,
                            script = %script.display(),
                            "Script failed after output was streamed, resetting connection"
                        );
                        self.state = ConnectionState::Reset;
                    }
                }

                state @ (ConnectionState::Closed | ConnectionState::Reset) => {
                    self.state = state;
                    break;
                }
            }
        }

        Ok(())
    }

    /// Reads until the request line is complete, EOF, or `MAX_REQUEST_BYTES`.
    ///
    /// Whatever arrived with the read that completed the request line is
    /// what the parser sees, headers included; the server never waits for
    /// the blank line.
    ///
    /// `None` means the client sent nothing usable and gets no response.
    pub async fn read_request(&mut self) -> anyhow::Result<Option<Request>> {
        match self.read_timeout {
            Some(limit) => tokio::time::timeout(limit, self.fill_buffer())
                .await
                .map_err(|_| anyhow::anyhow!("read timed out after {:?}", limit))??,
            None => self.fill_buffer().await?,
        }

        if self.buffer.is_empty() {
            tracing::debug!(peer = %self.peer, "Client closed connection without a request");
            return Ok(None);
        }

        match parse_request(&self.buffer) {
            Ok(request) => Ok(Some(request)),
            Err(e) => {
                // Malformed request line: drop the client without answering
                tracing::warn!(peer = %self.peer, error = ?e, "Invalid HTTP request line");
                Ok(None)
            }
        }
    }

    async fn fill_buffer(&mut self) -> anyhow::Result<()> {
        let mut temp = [0u8; 1024];

        while self.buffer.len() < MAX_REQUEST_BYTES && request_line_end(&self.buffer).is_none() {
            let room = (MAX_REQUEST_BYTES - self.buffer.len()).min(temp.len());
            let n = self.stream.read(&mut temp[..room]).await?;

            if n == 0 {
                break;
            }

            self.buffer.extend_from_slice(&temp[..n]);
        }

        Ok(())
    }

    async fn close(&mut self) {
        if matches!(self.state, ConnectionState::Reset) {
            // Zero linger turns the close into an RST. The deprecation is
            // about nonzero values blocking on drop; zero never blocks.
            #[allow(deprecated)]
            let lingered = self.stream.set_linger(Some(Duration::ZERO));
            if let Err(e) = lingered {
                tracing::debug!(peer = %self.peer, error = %e, "Could not set linger");
            }
            return;
        }

        if let Err(e) = self.stream.shutdown().await {
            tracing::debug!(peer = %self.peer, error = %e, "Shutdown failed");
        }
    }
}
