/// HTTP status codes the server emits.
///
/// - `Ok` (200): Request successful
/// - `BadRequest` (400): Path traversal attempt
/// - `NotFound` (404): Missing file, directory, or non-script POST target
/// - `InternalServerError` (500): Read failure or failed script
/// - `NotImplemented` (501): Method without a handler
/// - `ServiceUnavailable` (503): Session table full
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusCode {
    /// 200 OK
    Ok,
    /// 400 Bad Request
    BadRequest,
    /// 404 Not Found
    NotFound,
    /// 500 Internal Server Error
    InternalServerError,
    /// 501 Not Implemented
    NotImplemented,
    /// 503 Service Unavailable
    ServiceUnavailable,
}

impl StatusCode {
    /// Returns the numeric HTTP status code.
    ///
    /// # Example
    ///
    /// ```
    /// # use porter::http::response::StatusCode;
    /// assert_eq!(StatusCode::Ok.as_u16(), 200);
    /// assert_eq!(StatusCode::NotFound.as_u16(), 404);
    /// ```
    pub fn as_u16(&self) -> u16 {
        match self {
            StatusCode::Ok => 200,
            StatusCode::BadRequest => 400,
            StatusCode::NotFound => 404,
            StatusCode::InternalServerError => 500,
            StatusCode::NotImplemented => 501,
            StatusCode::ServiceUnavailable => 503,
        }
    }

    /// Returns the standard HTTP reason phrase for this status code.
    ///
    /// # Example
    ///
    /// ```
    /// # use porter::http::response::StatusCode;
    /// assert_eq!(StatusCode::Ok.reason_phrase(), "OK");
    /// assert_eq!(StatusCode::NotImplemented.reason_phrase(), "Not Implemented");
    /// ```
    pub fn reason_phrase(&self) -> &'static str {
        match self {
            StatusCode::Ok => "OK",
            StatusCode::BadRequest => "Bad Request",
            StatusCode::NotFound => "Not Found",
            StatusCode::InternalServerError => "Internal Server Error",
            StatusCode::NotImplemented => "Not Implemented",
            StatusCode::ServiceUnavailable => "Service Unavailable",
        }
    }
}

/// Content type used for the empty-bodied error responses.
pub const PLAIN_TEXT: &str = "text/plain";

/// A complete HTTP response ready to be framed onto a connection.
///
/// The header set is fixed: `Content-Type`, `Content-Length` and an optional
/// `Set-Cookie`. `content_length` is kept apart from `body` so a HEAD
/// response can advertise a length without carrying the bytes.
#[derive(Debug, Clone)]
pub struct Response {
    pub status: StatusCode,
    pub content_type: String,
    pub content_length: u64,
    /// Value of the `Set-Cookie` header, without the header name
    pub set_cookie: Option<String>,
    pub body: Vec<u8>,
}

/// Builder for constructing HTTP responses in a fluent style.
///
/// # Example
///
/// ```ignore
/// let response = ResponseBuilder::new(StatusCode::Ok)
///     .content_type("text/html")
///     .body(b"<h1>hi</h1>".to_vec())
///     .build();
/// ```
pub struct ResponseBuilder {
    status: StatusCode,
    content_type: String,
    content_length: Option<u64>,
    set_cookie: Option<String>,
    body: Vec<u8>,
}

impl ResponseBuilder {
    /// Creates a new response builder with the specified status code.
    pub fn new(status: StatusCode) -> Self {
        Self {
            status,
            content_type: PLAIN_TEXT.to_string(),
            content_length: None,
            set_cookie: None,
            body: Vec::new(),
        }
    }

    pub fn content_type(mut self, content_type: impl Into<String>) -> Self {
        self.content_type = content_type.into();
        self
    }

    /// Overrides the advertised length. Only HEAD responses need this.
    pub fn content_length(mut self, length: u64) -> Self {
        self.content_length = Some(length);
        self
    }

    pub fn set_cookie(mut self, cookie: Option<String>) -> Self {
        self.set_cookie = cookie;
        self
    }

    /// Sets the response body.
    pub fn body(mut self, body: Vec<u8>) -> Self {
        self.body = body;
        self
    }

    /// Builds the final Response.
    ///
    /// The length defaults to the body size unless one was set explicitly.
    pub fn build(self) -> Response {
        let content_length = self
            .content_length
            .unwrap_or_else(|| self.body.len() as u64);

        Response {
            status: self.status,
            content_type: self.content_type,
            content_length,
            set_cookie: self.set_cookie,
            body: self.body,
        }
    }
}

impl Response {
    /// Creates an empty-bodied response with the given status.
    pub fn empty(status: StatusCode) -> Self {
        ResponseBuilder::new(status).build()
    }

    /// Creates a 200 OK response with the given body.
    pub fn ok(content_type: impl Into<String>, body: impl Into<Vec<u8>>) -> Self {
        ResponseBuilder::new(StatusCode::Ok)
            .content_type(content_type)
            .body(body.into())
            .build()
    }

    pub fn bad_request() -> Self {
        Self::empty(StatusCode::BadRequest)
    }

    pub fn not_found() -> Self {
        Self::empty(StatusCode::NotFound)
    }

    pub fn internal_error() -> Self {
        Self::empty(StatusCode::InternalServerError)
    }

    pub fn not_implemented() -> Self {
        Self::empty(StatusCode::NotImplemented)
    }

    pub fn service_unavailable() -> Self {
        Self::empty(StatusCode::ServiceUnavailable)
    }

    /// Attaches a `Set-Cookie` value, keeping any that is already present.
    pub fn with_cookie(mut self, cookie: Option<String>) -> Self {
        if self.set_cookie.is_none() {
            self.set_cookie = cookie;
        }
        self
    }
}
