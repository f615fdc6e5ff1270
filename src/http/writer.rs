use std::time::Duration;

use tokio::io::{AsyncWrite, AsyncWriteExt};

use crate::http::response::{Response, StatusCode};

const HTTP_VERSION: &str = "HTTP/1.1";

/// Frames a response head.
///
/// Header order is fixed: status line, `Content-Type`, `Content-Length`,
/// `Set-Cookie`, blank line. A `None` length leaves the header out, which is
/// only used for close-delimited CGI output.
pub fn serialize_head(
    status: StatusCode,
    content_type: &str,
    content_length: Option<u64>,
    set_cookie: Option<&str>,
) -> Vec<u8> {
    let mut head = format!(
        "{} {} {}\r\nContent-Type: {}\r\n",
        HTTP_VERSION,
        status.as_u16(),
        status.reason_phrase(),
        content_type
    );

    if let Some(length) = content_length {
        head.push_str(&format!("Content-Length: {}\r\n", length));
    }

    if let Some(cookie) = set_cookie {
        head.push_str(&format!("Set-Cookie: {}\r\n", cookie));
    }

    // Header/body separator
    head.push_str("\r\n");

    head.into_bytes()
}

/// Frames a full response. The body is whatever the response carries, so a
/// HEAD response built with an empty body sends no body bytes.
pub fn serialize_response(resp: &Response) -> Vec<u8> {
    let mut buf = serialize_head(
        resp.status,
        &resp.content_type,
        Some(resp.content_length),
        resp.set_cookie.as_deref(),
    );
    buf.extend_from_slice(&resp.body);
    buf
}

pub struct ResponseWriter {
    buffer: Vec<u8>,
    written: usize,
}

impl ResponseWriter {
    pub fn new(response: &Response) -> Self {
        Self::from_bytes(serialize_response(response))
    }

    /// Writer for pre-framed bytes, e.g. a streaming head.
    pub fn from_bytes(buffer: Vec<u8>) -> Self {
        Self { buffer, written: 0 }
    }

    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    pub async fn write_to_stream<W>(&mut self, stream: &mut W) -> anyhow::Result<()>
    where
        W: AsyncWrite + Unpin,
    {
        while self.written < self.buffer.len() {
            let n = stream.write(&self.buffer[self.written..]).await?;

            if n == 0 {
                return Err(anyhow::anyhow!("connection closed while writing"));
            }

            self.written += n;
        }

        stream.flush().await?;
        Ok(())
    }

    /// Same as [`write_to_stream`](Self::write_to_stream), bounded by an
    /// optional deadline.
    pub async fn write_with_timeout<W>(
        &mut self,
        stream: &mut W,
        limit: Option<Duration>,
    ) -> anyhow::Result<()>
    where
        W: AsyncWrite + Unpin,
    {
        match limit {
            Some(limit) => tokio::time::timeout(limit, self.write_to_stream(stream))
                .await
                .map_err(|_| anyhow::anyhow!("write timed out after {:?}", limit))?,
            None => self.write_to_stream(stream).await,
        }
    }
}
