//! CGI-style script execution for POST
//!
//! A script runs as a child process with stdout and stderr piped back to the
//! server. Output is held back until the script exits so the status line can
//! tell the truth; output larger than the buffer limit is streamed instead,
//! and a failure after that point can only be signalled by resetting the
//! connection.

use std::path::Path;
use std::process::{ExitStatus, Stdio};
use std::time::Duration;

use anyhow::Context;
use bytes::BytesMut;
use tokio::io::{AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::process::{Child, Command};

use crate::config::CgiConfig;
use crate::http::response::{Response, ResponseBuilder, StatusCode};
use crate::http::writer::{ResponseWriter, serialize_head};

/// Read size for each pipe
const READ_CHUNK: usize = 4096;

/// Whether the file name at the end of `path` carries an allow-listed
/// script extension.
pub fn is_script(path: &str, extensions: &[String]) -> bool {
    let name = path.rsplit('/').next().unwrap_or(path);
    extensions
        .iter()
        .any(|ext| !ext.is_empty() && name.len() > ext.len() && name.ends_with(ext.as_str()))
}

/// How a script invocation ended, as seen by the client
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CgiOutcome {
    /// 200 with the full output was sent
    Completed,
    /// The script failed before anything was sent; a 500 went out instead
    Failed,
    /// The script failed mid-stream; the connection must be reset
    Aborted,
}

/// Where the response stands while output is being collected
enum CgiState {
    /// Nothing sent yet
    Buffering(BytesMut),
    /// Head and `sent` body bytes are already on the wire
    Streaming { sent: u64 },
}

/// Runs scripts and frames their output
#[derive(Debug, Clone)]
pub struct CgiRunner {
    timeout: Option<Duration>,
    buffer_limit: usize,
    content_type: String,
}

impl CgiRunner {
    pub fn new(config: &CgiConfig) -> Self {
        Self {
            timeout: config.timeout(),
            buffer_limit: config.buffer_limit,
            content_type: config.content_type.clone(),
        }
    }

    /// Executes `script` and writes its response to `out`.
    ///
    /// Errors are reserved for failures talking to the client; script
    /// failures are reported through [`CgiOutcome`].
    pub async fn run<W>(
        &self,
        script: &Path,
        out: &mut W,
        set_cookie: Option<&str>,
    ) -> anyhow::Result<CgiOutcome>
    where
        W: AsyncWrite + Unpin,
    {
        let mut child = match Command::new(script)
            .env("REQUEST_METHOD", "POST")
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
        {
            Ok(child) => child,
            Err(e) => {
                tracing::error!(script = %script.display(), error = %e, "Failed to spawn script");
                let response = Response::internal_error().with_cookie(set_cookie.map(str::to_string));
                ResponseWriter::new(&response).write_to_stream(out).await?;
                return Ok(CgiOutcome::Failed);
            }
        };

        let mut state = CgiState::Buffering(BytesMut::new());

        let pumped = match self.timeout {
            Some(limit) => {
                tokio::time::timeout(limit, self.pump(&mut child, out, &mut state, set_cookie))
                    .await
                    .ok()
            }
            None => Some(self.pump(&mut child, out, &mut state, set_cookie).await),
        };

        let status = match pumped {
            Some(Ok(status)) => Some(status),
            Some(Err(e)) => {
                reap(&mut child).await;
                return Err(e);
            }
            None => {
                tracing::warn!(script = %script.display(), timeout = ?self.timeout, "Script timed out, killing it");
                reap(&mut child).await;
                None
            }
        };

        let succeeded = status.is_some_and(|s| s.success());
        if let Some(status) = status.filter(|s| !s.success()) {
            tracing::warn!(script = %script.display(), status = %status, "Script exited unsuccessfully");
        }

        match state {
            CgiState::Buffering(output) => {
                let response = if succeeded {
                    ResponseBuilder::new(StatusCode::Ok)
                        .content_type(self.content_type.as_str())
                        .set_cookie(set_cookie.map(str::to_string))
                        .body(output.to_vec())
                        .build()
                } else {
                    Response::internal_error().with_cookie(set_cookie.map(str::to_string))
                };
                ResponseWriter::new(&response).write_to_stream(out).await?;

                Ok(if succeeded {
                    CgiOutcome::Completed
                } else {
                    CgiOutcome::Failed
                })
            }
            CgiState::Streaming { sent } => {
                tracing::debug!(script = %script.display(), bytes = sent, "Streamed script output");
                if succeeded {
                    out.flush().await?;
                    Ok(CgiOutcome::Completed)
                } else {
                    Ok(CgiOutcome::Aborted)
                }
            }
        }
    }

    /// Moves output from both pipes to `state` until the child closes them,
    /// then waits for it.
    async fn pump<W>(
        &self,
        child: &mut Child,
        out: &mut W,
        state: &mut CgiState,
        set_cookie: Option<&str>,
    ) -> anyhow::Result<ExitStatus>
    where
        W: AsyncWrite + Unpin,
    {
        let mut stdout = child.stdout.take().context("script stdout was not captured")?;
        let mut stderr = child.stderr.take().context("script stderr was not captured")?;

        let mut out_buf = [0u8; READ_CHUNK];
        let mut err_buf = [0u8; READ_CHUNK];
        let mut stdout_open = true;
        let mut stderr_open = true;

        while stdout_open || stderr_open {
            let (from_stdout, read) = tokio::select! {
                r = stdout.read(&mut out_buf), if stdout_open => (true, r),
                r = stderr.read(&mut err_buf), if stderr_open => (false, r),
                else => break,
            };

            let n = read.context("failed to read script output")?;
            let chunk = match (from_stdout, n) {
                (true, 0) => {
                    stdout_open = false;
                    continue;
                }
                (false, 0) => {
                    stderr_open = false;
                    continue;
                }
                (true, n) => &out_buf[..n],
                (false, n) => &err_buf[..n],
            };

            self.forward(chunk, out, state, set_cookie).await?;
        }

        Ok(child.wait().await?)
    }

    async fn forward<W>(
        &self,
        chunk: &[u8],
        out: &mut W,
        state: &mut CgiState,
        set_cookie: Option<&str>,
    ) -> anyhow::Result<()>
    where
        W: AsyncWrite + Unpin,
    {
        match state {
            CgiState::Buffering(buf) => {
                buf.extend_from_slice(chunk);
                if buf.len() > self.buffer_limit {
                    // Length is unknown from here on; the body ends when the
                    // connection closes
                    let mut head = serialize_head(StatusCode::Ok, &self.content_type, None, set_cookie);
                    head.extend_from_slice(buf);
                    let sent = buf.len() as u64;

                    ResponseWriter::from_bytes(head).write_to_stream(out).await?;
                    tracing::debug!(bytes = sent, "Script output exceeded buffer, streaming");
                    *state = CgiState::Streaming { sent };
                }
            }
            CgiState::Streaming { sent } => {
                out.write_all(chunk).await?;
                *sent += chunk.len() as u64;
            }
        }
        Ok(())
    }
}

async fn reap(child: &mut Child) {
    if let Err(e) = child.start_kill() {
        tracing::debug!(error = %e, "Script already exited");
    }
    let _ = child.wait().await;
}
