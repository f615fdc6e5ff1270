//! Helpers shared by the end-to-end tests

#![allow(dead_code)]

use porter::config::Config;
use porter::server::Server;
use std::net::SocketAddr;
use std::path::Path;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;

/// Starts a server on an ephemeral port serving `root`.
pub async fn start_server(root: &Path, tweak: impl FnOnce(&mut Config)) -> SocketAddr {
    let mut cfg = Config::default();
    cfg.server.host = "127.0.0.1".to_string();
    cfg.server.port = 0;
    cfg.static_files.root = root.to_str().unwrap().to_string();
    tweak(&mut cfg);

    let server = Server::new(cfg);
    let listener = server.bind().unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(server.serve(listener));
    addr
}

/// Sends `raw` and reads until the server closes or resets the connection.
pub async fn exchange(addr: SocketAddr, raw: &[u8]) -> std::io::Result<Vec<u8>> {
    let mut stream = TcpStream::connect(addr).await?;
    stream.write_all(raw).await?;

    let mut out = Vec::new();
    stream.read_to_end(&mut out).await?;
    Ok(out)
}

pub struct Reply {
    pub status_line: String,
    pub headers: Vec<(String, String)>,
    pub body: Vec<u8>,
}

impl Reply {
    pub fn parse(raw: &[u8]) -> Self {
        let split = raw
            .windows(4)
            .position(|w| w == b"\r\n\r\n")
            .expect("response has no header terminator");
        let head = String::from_utf8(raw[..split].to_vec()).unwrap();
        let mut lines = head.split("\r\n");
        let status_line = lines.next().unwrap().to_string();
        let headers = lines
            .map(|line| {
                let (k, v) = line.split_once(": ").unwrap();
                (k.to_string(), v.to_string())
            })
            .collect();

        Self {
            status_line,
            headers,
            body: raw[split + 4..].to_vec(),
        }
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }

    pub fn header_names(&self) -> Vec<&str> {
        self.headers.iter().map(|(k, _)| k.as_str()).collect()
    }

    /// The id from a `Set-Cookie: sessionId=<id>; ...` header.
    pub fn session_cookie(&self) -> Option<String> {
        let value = self.header("Set-Cookie")?;
        let pair = value.split(';').next()?;
        pair.strip_prefix("sessionId=").map(str::to_string)
    }
}

pub async fn request(addr: SocketAddr, raw: &str) -> Reply {
    Reply::parse(&exchange(addr, raw.as_bytes()).await.unwrap())
}
