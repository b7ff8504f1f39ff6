use std::fmt;

/// HTTP request methods.
///
/// Only these seven methods are recognised; any other token on the request
/// line makes the request malformed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Method {
    /// GET - Read a resource
    GET,
    /// HEAD - Like GET but without the response body
    HEAD,
    /// PATCH - Append to a resource
    PATCH,
    /// POST - Create or overwrite a resource
    POST,
    /// DELETE - Remove a resource
    DELETE,
    /// PUT - Overwrite an existing resource
    PUT,
    /// OPTIONS - Describe the supported methods
    OPTIONS,
}

impl Method {
    /// Every recognised method, in the order advertised by `Allow`.
    pub const ALL: [Method; 7] = [
        Method::GET,
        Method::HEAD,
        Method::PATCH,
        Method::POST,
        Method::DELETE,
        Method::PUT,
        Method::OPTIONS,
    ];

    /// Parses an HTTP method from a string.
    ///
    /// Matching is case-sensitive.
    ///
    /// # Example
    ///
    /// ```
    /// # use filehttpd::http::request::Method;
    /// assert_eq!(Method::from_str("GET"), Some(Method::GET));
    /// assert_eq!(Method::from_str("get"), None);
    /// ```
    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "GET" => Some(Method::GET),
            "HEAD" => Some(Method::HEAD),
            "PATCH" => Some(Method::PATCH),
            "POST" => Some(Method::POST),
            "DELETE" => Some(Method::DELETE),
            "PUT" => Some(Method::PUT),
            "OPTIONS" => Some(Method::OPTIONS),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Method::GET => "GET",
            Method::HEAD => "HEAD",
            Method::PATCH => "PATCH",
            Method::POST => "POST",
            Method::DELETE => "DELETE",
            Method::PUT => "PUT",
            Method::OPTIONS => "OPTIONS",
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Protocol versions accepted on the request line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Version {
    Http10,
    #[default]
    Http11,
}

impl Version {
    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "HTTP/1.0" => Some(Version::Http10),
            "HTTP/1.1" => Some(Version::Http11),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Version::Http10 => "HTTP/1.0",
            Version::Http11 => "HTTP/1.1",
        }
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A parsed HTTP request.
///
/// Built once per connection by the parser and never mutated afterwards.
/// Only `Content-Length` survives from the header block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Request {
    /// The HTTP method
    pub method: Method,
    /// Slash-rooted resource path; `/` is already rewritten to `/index.html`
    pub resource: String,
    /// Protocol version from the request line
    pub version: Version,
    /// Declared body length, if the client sent `Content-Length`
    pub content_length: Option<usize>,
    /// Body bytes; absent when nothing was declared or nothing arrived
    pub body: Option<Vec<u8>>,
}

/// Builder for constructing Request objects.
pub struct RequestBuilder {
    method: Option<Method>,
    resource: Option<String>,
    version: Version,
    body: Option<Vec<u8>>,
}

impl Default for RequestBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl RequestBuilder {
    pub fn new() -> Self {
        Self {
            method: None,
            resource: None,
            version: Version::Http11,
            body: None,
        }
    }

    pub fn method(mut self, method: Method) -> Self {
        self.method = Some(method);
        self
    }

    pub fn resource(mut self, resource: impl Into<String>) -> Self {
        self.resource = Some(resource.into());
        self
    }

    pub fn version(mut self, version: Version) -> Self {
        self.version = version;
        self
    }

    pub fn body(mut self, body: impl Into<Vec<u8>>) -> Self {
        self.body = Some(body.into());
        self
    }

    /// Builds the request, applying the same `/` normalisation as the parser.
    pub fn build(self) -> Result<Request, &'static str> {
        let resource = self.resource.ok_or("resource missing")?;
        Ok(Request {
            method: self.method.ok_or("method missing")?,
            resource: normalize_resource(&resource),
            version: self.version,
            content_length: self.body.as_ref().map(Vec::len),
            body: self.body,
        })
    }
}

/// Rewrites the bare root to the index document; every other path passes
/// through verbatim.
pub fn normalize_resource(resource: &str) -> String {
    if resource == "/" {
        "/index.html".to_string()
    } else {
        resource.to_string()
    }
}

impl Request {
    pub fn builder() -> RequestBuilder {
        RequestBuilder::new()
    }

    /// Serializes the request back into wire form.
    ///
    /// Only `Content-Length` is emitted as a header, mirroring what the
    /// parser keeps.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut buf = Vec::new();
        buf.extend_from_slice(
            format!("{} {} {}\r\n", self.method, self.resource, self.version).as_bytes(),
        );

        if let Some(body) = &self.body {
            buf.extend_from_slice(format!("Content-Length: {}\r\n", body.len()).as_bytes());
        }

        buf.extend_from_slice(b"\r\n");

        if let Some(body) = &self.body {
            buf.extend_from_slice(body);
        }

        buf
    }
}
