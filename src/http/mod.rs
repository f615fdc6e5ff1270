//! HTTP protocol implementation.
//!
//! This module implements the HTTP/1.1 side of the server: one request per
//! connection, no keep-alive.
//!
//! # Architecture
//!
//! - **`connection`**: The per-connection state machine
//! - **`parser`**: Parses the request line and `Cookie` header from a raw buffer
//! - **`request`**: HTTP request representation and cookie lookup
//! - **`response`**: HTTP response representation with builder pattern
//! - **`writer`**: Frames responses with a fixed header order
//! - **`mime`**: MIME type detection based on file extensions
//!
//! # Connection State Machine
//!
//! ```text
//!        ┌─────────────┐
//!        │   Reading   │ ← Read until the request line ends (max 4095)
//!        └──────┬──────┘
//!               │ Request line parsed (otherwise → Closed, no response)
//!               ▼
//!        ┌──────────────────┐
//!        │   Processing     │ ← Dispatch on method
//!        └──────┬───────────┘
//!               ├─ Response ready → Writing
//!               └─ Script target  → Executing
//!               ▼
//!        ┌──────────────────┐
//!        │ Writing/Executing│ ← Send response or script output
//!        └──────┬───────────┘
//!               ├─ Done → Closed
//!               └─ Script failed mid-stream → Reset
//! ```

pub mod connection;
pub mod mime;
pub mod parser;
pub mod request;
pub mod response;
pub mod writer;
