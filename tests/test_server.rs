//! End-to-end tests for static files, method dispatch and sessions

mod common;

use common::{Reply, exchange, request, start_server};
use std::fs;
use std::time::Duration;
use tempfile::TempDir;

const INDEX: &[u8] = b"<html><body>Served by porter</body></html>";

fn site() -> TempDir {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("index.html"), INDEX).unwrap();
    fs::write(dir.path().join("site.css"), b"body { margin: 0 }").unwrap();
    fs::write(dir.path().join("data.bin"), [0u8, 1, 2, 3, 255]).unwrap();
    fs::create_dir(dir.path().join("docs")).unwrap();
    fs::write(dir.path().join("docs/readme.txt"), b"read me").unwrap();
    dir
}

#[tokio::test]
async fn test_get_root_serves_index() {
    let dir = site();
    let addr = start_server(dir.path(), |_| {}).await;

    let reply = request(addr, "GET / HTTP/1.1\r\nHost: localhost\r\n\r\n").await;

    assert_eq!(INDEX.len(), 42);
    assert_eq!(reply.status_line, "HTTP/1.1 200 OK");
    assert_eq!(reply.header("Content-Type"), Some("text/html"));
    assert_eq!(reply.header("Content-Length"), Some("42"));
    assert_eq!(reply.body, INDEX);
}

#[tokio::test]
async fn test_header_order_is_fixed() {
    let dir = site();
    let addr = start_server(dir.path(), |_| {}).await;

    let reply = request(addr, "GET /site.css HTTP/1.1\r\n\r\n").await;

    assert_eq!(
        reply.header_names(),
        vec!["Content-Type", "Content-Length", "Set-Cookie"]
    );
    assert_eq!(reply.header("Content-Type"), Some("text/css"));
}

#[tokio::test]
async fn test_get_nested_file_and_default_mime() {
    let dir = site();
    let addr = start_server(dir.path(), |_| {}).await;

    let reply = request(addr, "GET /docs/readme.txt HTTP/1.1\r\n\r\n").await;
    assert_eq!(reply.header("Content-Type"), Some("text/plain"));
    assert_eq!(reply.body, b"read me");

    let reply = request(addr, "GET /data.bin HTTP/1.1\r\n\r\n").await;
    assert_eq!(reply.header("Content-Type"), Some("application/octet-stream"));
    assert_eq!(reply.body, vec![0u8, 1, 2, 3, 255]);
}

#[tokio::test]
async fn test_get_missing_file() {
    let dir = site();
    let addr = start_server(dir.path(), |_| {}).await;

    let reply = request(addr, "GET /missing.html HTTP/1.1\r\n\r\n").await;

    assert_eq!(reply.status_line, "HTTP/1.1 404 Not Found");
    assert_eq!(reply.header("Content-Length"), Some("0"));
    assert!(reply.body.is_empty());
}

#[tokio::test]
async fn test_get_traversal_is_bad_request() {
    let dir = site();
    let addr = start_server(dir.path(), |_| {}).await;

    for path in ["/../etc/passwd", "//etc/passwd", "/./index.html", "/docs/.."] {
        let reply = request(addr, &format!("GET {} HTTP/1.1\r\n\r\n", path)).await;
        assert_eq!(reply.status_line, "HTTP/1.1 400 Bad Request", "{}", path);
        assert!(reply.body.is_empty());
    }

    let reply = request(addr, "HEAD /../etc/passwd HTTP/1.1\r\n\r\n").await;
    assert_eq!(reply.status_line, "HTTP/1.1 400 Bad Request");
}

#[tokio::test]
async fn test_head_matches_get_without_body() {
    let dir = site();
    let addr = start_server(dir.path(), |_| {}).await;

    let get = request(addr, "GET /index.html HTTP/1.1\r\n\r\n").await;
    let head = request(addr, "HEAD /index.html HTTP/1.1\r\n\r\n").await;

    assert_eq!(head.status_line, "HTTP/1.1 200 OK");
    assert_eq!(head.header("Content-Type"), get.header("Content-Type"));
    assert_eq!(head.header("Content-Length"), get.header("Content-Length"));
    assert!(head.body.is_empty());
}

#[tokio::test]
async fn test_directories_are_not_found() {
    let dir = site();
    let addr = start_server(dir.path(), |_| {}).await;

    let reply = request(addr, "HEAD /docs HTTP/1.1\r\n\r\n").await;
    assert_eq!(reply.status_line, "HTTP/1.1 404 Not Found");

    let reply = request(addr, "GET /docs/ HTTP/1.1\r\n\r\n").await;
    assert_eq!(reply.status_line, "HTTP/1.1 404 Not Found");
}

#[tokio::test]
async fn test_unsupported_methods_are_not_implemented() {
    let dir = site();
    let addr = start_server(dir.path(), |_| {}).await;

    for method in ["PUT", "DELETE", "OPTIONS", "PATCH", "BREW"] {
        let reply = request(addr, &format!("{} /index.html HTTP/1.1\r\n\r\n", method)).await;
        assert_eq!(reply.status_line, "HTTP/1.1 501 Not Implemented", "{}", method);
        assert!(reply.header("Set-Cookie").is_none());
        assert!(reply.body.is_empty());
    }
}

#[tokio::test]
async fn test_malformed_request_gets_no_response() {
    let dir = site();
    let addr = start_server(dir.path(), |_| {}).await;

    let raw = exchange(addr, b"garbage\r\n\r\n").await.unwrap();
    assert!(raw.is_empty());

    let raw = exchange(addr, b"GET index.html HTTP/1.1\r\n\r\n").await.unwrap();
    assert!(raw.is_empty());

    // The server keeps serving afterwards
    let reply = request(addr, "GET / HTTP/1.1\r\n\r\n").await;
    assert_eq!(reply.status_line, "HTTP/1.1 200 OK");
}

#[tokio::test]
async fn test_request_line_alone_is_answered() {
    let dir = site();
    let addr = start_server(dir.path(), |_| {}).await;

    // The client keeps its write half open, so only the request line tells
    // the server it has enough to answer
    let requests: [&[u8]; 3] = [b"GET / HTTP/1.0\n\n", b"GET / HTTP/1.1\r\n", b"GET / HTTP/1.1\n"];
    for raw in requests {
        let out = tokio::time::timeout(Duration::from_secs(5), exchange(addr, raw))
            .await
            .expect("server did not answer before the client timeout")
            .unwrap();

        let reply = Reply::parse(&out);
        assert_eq!(reply.status_line, "HTTP/1.1 200 OK");
        assert_eq!(reply.body, INDEX);
    }
}

#[tokio::test]
async fn test_lf_only_request_keeps_cookie() {
    let dir = site();
    let addr = start_server(dir.path(), |_| {}).await;

    let first = request(addr, "GET /session HTTP/1.1\r\n\r\n").await;
    let id = first.session_cookie().unwrap();

    let raw = format!("GET /session HTTP/1.1\nCookie: sessionId={}\n\n", id);
    let out = tokio::time::timeout(Duration::from_secs(5), exchange(addr, raw.as_bytes()))
        .await
        .expect("server did not answer before the client timeout")
        .unwrap();

    let reply = Reply::parse(&out);
    assert_eq!(reply.status_line, "HTTP/1.1 200 OK");
    assert!(reply.header("Set-Cookie").is_none());
}

#[cfg(target_os = "linux")]
#[tokio::test]
async fn test_get_read_failure_is_internal_error() {
    let dir = site();
    // Opens fine, but reading offset 0 of our own address space fails with EIO
    std::os::unix::fs::symlink("/proc/self/mem", dir.path().join("mem.bin")).unwrap();
    let addr = start_server(dir.path(), |_| {}).await;

    let reply = request(addr, "GET /mem.bin HTTP/1.1\r\n\r\n").await;

    assert_eq!(reply.status_line, "HTTP/1.1 500 Internal Server Error");
    assert_eq!(reply.header("Content-Length"), Some("0"));
    assert!(reply.body.is_empty());

    // Nothing was leaked into later responses
    let reply = request(addr, "GET / HTTP/1.1\r\n\r\n").await;
    assert_eq!(reply.status_line, "HTTP/1.1 200 OK");
    assert_eq!(reply.body, INDEX);
}

#[tokio::test]
async fn test_session_round_trip() {
    let dir = site();
    let addr = start_server(dir.path(), |_| {}).await;

    let first = request(addr, "GET /session HTTP/1.1\r\n\r\n").await;
    assert_eq!(first.status_line, "HTTP/1.1 200 OK");
    assert_eq!(first.header("Content-Type"), Some("text/html"));

    let cookie = first.header("Set-Cookie").unwrap();
    assert!(cookie.ends_with("; Path=/; HttpOnly"));
    let id = first.session_cookie().unwrap();
    assert_eq!(id.len(), 16);
    assert!(id.chars().all(|c| c.is_ascii_alphanumeric()));

    let second = request(
        addr,
        &format!("GET /session HTTP/1.1\r\nCookie: sessionId={}\r\n\r\n", id),
    )
    .await;

    assert!(second.header("Set-Cookie").is_none());
    assert_eq!(first.body, second.body);
    let body = String::from_utf8(second.body).unwrap();
    assert!(body.contains(&format!("Your session ID: {}", id)));
    assert!(body.contains("User1"));
}

#[tokio::test]
async fn test_session_cookie_is_reused_for_files() {
    let dir = site();
    let addr = start_server(dir.path(), |_| {}).await;

    let first = request(addr, "GET / HTTP/1.1\r\n\r\n").await;
    let id = first.session_cookie().unwrap();

    let second = request(
        addr,
        &format!("GET / HTTP/1.1\r\nCookie: theme=dark; sessionId={}\r\n\r\n", id),
    )
    .await;
    assert!(second.header("Set-Cookie").is_none());

    let page = request(
        addr,
        &format!("GET /session HTTP/1.1\r\nCookie: sessionId={}\r\n\r\n", id),
    )
    .await;
    assert!(String::from_utf8(page.body).unwrap().contains(&id));
}

#[tokio::test]
async fn test_unknown_cookie_gets_new_session() {
    let dir = site();
    let addr = start_server(dir.path(), |_| {}).await;

    let reply = request(
        addr,
        "GET / HTTP/1.1\r\nCookie: sessionId=AAAAAAAAAAAAAAAA\r\n\r\n",
    )
    .await;

    let id = reply.session_cookie().unwrap();
    assert_ne!(id, "AAAAAAAAAAAAAAAA");
}

#[tokio::test]
async fn test_full_session_store() {
    let dir = site();
    let addr = start_server(dir.path(), |cfg| cfg.sessions.capacity = 1).await;

    let first = request(addr, "GET /session HTTP/1.1\r\n\r\n").await;
    let id = first.session_cookie().unwrap();

    let refused = request(addr, "GET /session HTTP/1.1\r\n\r\n").await;
    assert_eq!(refused.status_line, "HTTP/1.1 503 Service Unavailable");
    assert!(refused.header("Set-Cookie").is_none());

    // Files are still served, just without a session
    let file = request(addr, "GET /site.css HTTP/1.1\r\n\r\n").await;
    assert_eq!(file.status_line, "HTTP/1.1 200 OK");
    assert!(file.header("Set-Cookie").is_none());

    // The existing session survives
    let again = request(
        addr,
        &format!("GET /session HTTP/1.1\r\nCookie: sessionId={}\r\n\r\n", id),
    )
    .await;
    assert_eq!(again.status_line, "HTTP/1.1 200 OK");
}

#[tokio::test]
async fn test_head_session_page() {
    let dir = site();
    let addr = start_server(dir.path(), |_| {}).await;

    let get = request(addr, "GET /session HTTP/1.1\r\n\r\n").await;
    let id = get.session_cookie().unwrap();

    let head = request(
        addr,
        &format!("HEAD /session HTTP/1.1\r\nCookie: sessionId={}\r\n\r\n", id),
    )
    .await;

    assert_eq!(head.header("Content-Length"), get.header("Content-Length"));
    assert!(head.body.is_empty());
}

#[tokio::test]
async fn test_bind_failure_is_reported() {
    let dir = site();
    let addr = start_server(dir.path(), |_| {}).await;

    let mut cfg = porter::config::Config::default();
    cfg.server.host = "127.0.0.1".to_string();
    cfg.server.port = addr.port();

    // SO_REUSEADDR does not allow two listeners on one port
    assert!(porter::server::bind(&cfg.server).is_err());
}
