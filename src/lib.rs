//! Porter - minimal HTTP/1.1 file server
//!
//! Serves static files from a document root, runs CGI-style scripts on
//! POST and tracks clients with an in-memory session table.

pub mod config;
pub mod handler;
pub mod http;
pub mod server;
pub mod session;
