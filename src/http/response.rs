use crate::http::request::{Method, Version};

/// HTTP status codes produced by the server.
///
/// - `Ok` (200): Resource read or written
/// - `Created` (201): POST created a new file
/// - `NoContent` (204): Success with nothing to return
/// - `BadRequest` (400): Malformed request
/// - `Forbidden` (403): Target is inside the error-page directory
/// - `NotFound` (404): Resource missing or a directory
/// - `InternalServerError` (500): Filesystem failure
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusCode {
    /// 200 OK
    Ok,
    /// 201 Created
    Created,
    /// 204 No Content
    NoContent,
    /// 400 Bad Request
    BadRequest,
    /// 403 Forbidden
    Forbidden,
    /// 404 Not Found
    NotFound,
    /// 500 Internal Server Error
    InternalServerError,
}

impl StatusCode {
    /// Returns the numeric HTTP status code.
    ///
    /// # Example
    ///
    /// ```
    /// # use filehttpd::http::response::StatusCode;
    /// assert_eq!(StatusCode::Ok.as_u16(), 200);
    /// assert_eq!(StatusCode::Forbidden.as_u16(), 403);
    /// ```
    pub fn as_u16(&self) -> u16 {
        match self {
            StatusCode::Ok => 200,
            StatusCode::Created => 201,
            StatusCode::NoContent => 204,
            StatusCode::BadRequest => 400,
            StatusCode::Forbidden => 403,
            StatusCode::NotFound => 404,
            StatusCode::InternalServerError => 500,
        }
    }

    /// Returns the standard HTTP reason phrase for this status code.
    pub fn reason_phrase(&self) -> &'static str {
        match self {
            StatusCode::Ok => "OK",
            StatusCode::Created => "Created",
            StatusCode::NoContent => "No Content",
            StatusCode::BadRequest => "Bad Request",
            StatusCode::Forbidden => "Forbidden",
            StatusCode::NotFound => "Not Found",
            StatusCode::InternalServerError => "Internal Server Error",
        }
    }
}

/// A finished HTTP response, ready to be serialized once.
///
/// `Content-Length` is not stored; the writer derives it from `body`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
    /// Protocol version echoed from the request
    pub version: Version,
    /// The HTTP status code
    pub status: StatusCode,
    /// Methods advertised in `Allow` (OPTIONS only)
    pub allow: Option<Vec<Method>>,
    /// MIME type probed from the resource path
    pub content_type: Option<String>,
    /// Response body as bytes
    pub body: Option<Vec<u8>>,
}

/// Builder for constructing HTTP responses in a fluent style.
///
/// # Example
///
/// ```ignore
/// let response = ResponseBuilder::new(StatusCode::Ok)
///     .content_type("text/html")
///     .body(b"<p>hi</p>".to_vec())
///     .build();
/// ```
pub struct ResponseBuilder {
    version: Version,
    status: StatusCode,
    allow: Option<Vec<Method>>,
    content_type: Option<String>,
    body: Option<Vec<u8>>,
}

impl ResponseBuilder {
    /// Creates a new response builder with the specified status code.
    pub fn new(status: StatusCode) -> Self {
        Self {
            version: Version::Http11,
            status,
            allow: None,
            content_type: None,
            body: None,
        }
    }

    pub fn version(mut self, version: Version) -> Self {
        self.version = version;
        self
    }

    pub fn allow(mut self, methods: impl Into<Vec<Method>>) -> Self {
        self.allow = Some(methods.into());
        self
    }

    pub fn content_type(mut self, content_type: impl Into<String>) -> Self {
        self.content_type = Some(content_type.into());
        self
    }

    /// Sets the response body.
    pub fn body(mut self, body: impl Into<Vec<u8>>) -> Self {
        self.body = Some(body.into());
        self
    }

    /// Builds the final Response.
    pub fn build(self) -> Response {
        Response {
            version: self.version,
            status: self.status,
            allow: self.allow,
            content_type: self.content_type,
            body: self.body,
        }
    }
}

impl Response {
    pub fn builder(status: StatusCode) -> ResponseBuilder {
        ResponseBuilder::new(status)
    }

    /// Plain-text response used when an error template cannot be read.
    pub fn fallback(status: StatusCode) -> Self {
        ResponseBuilder::new(status)
            .content_type("text/plain")
            .body(format!("{} {}", status.as_u16(), status.reason_phrase()))
            .build()
    }

    /// Length of the body, which is what `Content-Length` reports.
    pub fn content_length(&self) -> Option<usize> {
        self.body.as_ref().map(Vec::len)
    }
}
