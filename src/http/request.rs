/// HTTP request methods.
///
/// GET, HEAD and POST are served. Every other token lands in
/// [`Method::Extension`] and is answered with 501 Not Implemented.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Method {
    /// GET - Retrieve a resource
    GET,
    /// HEAD - Like GET but without the response body
    HEAD,
    /// POST - Run a CGI script
    POST,
    /// Any other token from the request line
    Extension(String),
}

/// A parsed request line plus the raw `Cookie` header, if one was sent.
///
/// Only constructed when method, path and protocol version were all present.
#[derive(Debug, Clone)]
pub struct Request {
    pub method: Method,
    /// Raw request path, always starting with `/`
    pub path: String,
    /// Protocol token, typically "HTTP/1.1"
    pub version: String,
    /// Value of the `Cookie:` header up to the line terminator
    pub cookie_header: Option<String>,
}

impl Method {
    /// Parses an HTTP method token.
    ///
    /// Matching is case-sensitive; unrecognised tokens become
    /// [`Method::Extension`].
    ///
    /// # Example
    ///
    /// ```
    /// # use porter::http::request::Method;
    /// assert_eq!(Method::parse("GET"), Method::GET);
    /// assert_eq!(Method::parse("get"), Method::Extension("get".to_string()));
    /// ```
    pub fn parse(s: &str) -> Self {
        match s {
            "GET" => Method::GET,
            "HEAD" => Method::HEAD,
            "POST" => Method::POST,
            other => Method::Extension(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Method::GET => "GET",
            Method::HEAD => "HEAD",
            Method::POST => "POST",
            Method::Extension(token) => token,
        }
    }
}

impl Request {
    /// Looks up a cookie by exact name in the `Cookie` header.
    ///
    /// Returns `None` when the header is missing or carries no pair with
    /// that name.
    pub fn cookie(&self, name: &str) -> Option<&str> {
        self.cookie_header
            .as_deref()?
            .split(';')
            .filter_map(|pair| pair.trim().split_once('='))
            .find(|(key, _)| *key == name)
            .map(|(_, value)| value.trim())
    }
}
