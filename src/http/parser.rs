use crate::http::request::{Method, Request};

/// Largest request prefix the server looks at. One byte of the classic
/// 4096-byte read buffer stays reserved.
pub const MAX_REQUEST_BYTES: usize = 4095;

const COOKIE_HEADER: &str = "Cookie: ";

#[derive(Debug, PartialEq, Eq)]
pub enum ParseError {
    /// Empty buffer or a request line that is not UTF-8
    InvalidRequest,
    /// Request line with no space after the method token
    IncompleteRequestLine,
    MissingMethod,
    MissingPath,
    MissingVersion,
    /// Path token that does not start with `/`
    InvalidPath,
}

/// Parses the request line and the `Cookie` header out of a raw buffer.
///
/// Only the first `MAX_REQUEST_BYTES` bytes are considered. The request line
/// is split on the first space (method) and the next space (path); the rest of
/// the line is the protocol token. Other headers are ignored.
pub fn parse_request(buf: &[u8]) -> Result<Request, ParseError> {
    let buf = &buf[..buf.len().min(MAX_REQUEST_BYTES)];

    let line_end = request_line_end(buf).unwrap_or(buf.len());
    let line = std::str::from_utf8(&buf[..line_end]).map_err(|_| ParseError::InvalidRequest)?;

    if line.is_empty() {
        return Err(ParseError::InvalidRequest);
    }

    let (method, rest) = line.split_once(' ').ok_or(ParseError::IncompleteRequestLine)?;
    if method.is_empty() {
        return Err(ParseError::MissingMethod);
    }

    let (path, version) = rest.split_once(' ').ok_or(ParseError::MissingVersion)?;
    if path.is_empty() {
        return Err(ParseError::MissingPath);
    }
    if !path.starts_with('/') {
        return Err(ParseError::InvalidPath);
    }

    let version = version.trim();
    if version.is_empty() {
        return Err(ParseError::MissingVersion);
    }

    Ok(Request {
        method: Method::parse(method),
        path: path.to_string(),
        version: version.to_string(),
        cookie_header: find_cookie_header(buf),
    })
}

/// Finds `Cookie: ` anywhere in the buffer and returns the rest of its line.
fn find_cookie_header(buf: &[u8]) -> Option<String> {
    let start = buf
        .windows(COOKIE_HEADER.len())
        .position(|w| w == COOKIE_HEADER.as_bytes())?
        + COOKIE_HEADER.len();
    let value = &buf[start..];
    let end = value
        .iter()
        .position(|b| *b == b'\r' || *b == b'\n')
        .unwrap_or(value.len());

    Some(String::from_utf8_lossy(&value[..end]).into_owned())
}

/// Position of the first `\r` or `\n`, i.e. where the request line ends.
///
/// `None` while the request line is still incomplete.
pub fn request_line_end(buf: &[u8]) -> Option<usize> {
    buf.iter().position(|b| *b == b'\r' || *b == b'\n')
}
