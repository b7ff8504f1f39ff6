//! Request dispatch onto the document root.
//!
//! ```text
//! Parsed ──▶ Routed ──┬──▶ Served
//!                     └──▶ ErrorServed (fixed page)
//! ```
//!
//! Routing checks run first (400, OPTIONS, 404, 403). Each file operation
//! then runs under the path's lock from the shared [`LockRegistry`] and
//! re-checks existence while holding it.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use tokio::fs::{self, OpenOptions};
use tokio::io::AsyncWriteExt;
use tracing::{debug, error, info, warn};

use crate::http::mime::content_type_for;
use crate::http::parser::ParseError;
use crate::http::request::{Method, Request, Version};
use crate::http::response::{Response, StatusCode};
use crate::resource::canonical_key;
use crate::resource::locks::LockRegistry;

/// Directory under the document root holding the error templates.
pub const DEFAULT_ERROR_PAGES: &str = "error_pages";

/// Fixed error templates, one per error status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorPage {
    BadRequest,
    Forbidden,
    NotFound,
    InternalServerError,
}

impl ErrorPage {
    pub fn file_name(&self) -> &'static str {
        match self {
            ErrorPage::BadRequest => "BadRequest.html",
            ErrorPage::Forbidden => "Forbidden.html",
            ErrorPage::NotFound => "NotFound.html",
            ErrorPage::InternalServerError => "InternalServerError.html",
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            ErrorPage::BadRequest => StatusCode::BadRequest,
            ErrorPage::Forbidden => StatusCode::Forbidden,
            ErrorPage::NotFound => StatusCode::NotFound,
            ErrorPage::InternalServerError => StatusCode::InternalServerError,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum WriteMode {
    Overwrite,
    Append,
}

/// Turns parsed requests into responses, touching the filesystem as needed.
#[derive(Clone)]
pub struct Dispatcher {
    document_root: PathBuf,
    error_pages: PathBuf,
    locks: LockRegistry,
}

impl Dispatcher {
    /// Creates a dispatcher over `document_root`.
    ///
    /// `locks` must be the process-wide registry; a private registry would
    /// give no exclusion against other connections.
    pub fn new(document_root: impl Into<PathBuf>, locks: LockRegistry) -> Self {
        let document_root = document_root.into();
        let error_pages = document_root.join(DEFAULT_ERROR_PAGES);
        Self {
            document_root,
            error_pages,
            locks,
        }
    }

    /// Uses `dir` (relative to the document root) for the error templates.
    pub fn with_error_pages(mut self, dir: impl AsRef<Path>) -> Self {
        self.error_pages = self.document_root.join(dir);
        self
    }

    /// Produces exactly one response for a decoded (or rejected) request.
    pub async fn handle(&self, parsed: &Result<Request, ParseError>) -> Response {
        match parsed {
            Ok(request) => {
                let response = self.dispatch(request).await;
                info!(
                    method = %request.method,
                    resource = %request.resource,
                    status = response.status.as_u16(),
                    "Request served"
                );
                response
            }
            Err(e) => {
                debug!(error = %e, "Malformed request");
                self.render_page(ErrorPage::BadRequest, Version::Http11).await
            }
        }
    }

    async fn dispatch(&self, request: &Request) -> Response {
        let version = request.version;

        if request.method == Method::OPTIONS {
            return Self::options(version);
        }

        let path = self.resolve(&request.resource);
        let (exists, is_dir) = match fs::metadata(&path).await {
            Ok(meta) => (true, meta.is_dir()),
            Err(_) => (false, false),
        };

        if (!exists && request.method != Method::POST) || is_dir {
            return self.render_page(ErrorPage::NotFound, version).await;
        }

        if self.is_reserved(&path) {
            return self.render_page(ErrorPage::Forbidden, version).await;
        }

        match request.method {
            Method::GET => self.read(&path, true, version).await,
            Method::HEAD => self.read(&path, false, version).await,
            Method::POST | Method::PUT => self.write(request, &path, WriteMode::Overwrite).await,
            Method::PATCH => self.write(request, &path, WriteMode::Append).await,
            Method::DELETE => self.delete(&path, version).await,
            Method::OPTIONS => Self::options(version),
        }
    }

    fn options(version: Version) -> Response {
        Response::builder(StatusCode::NoContent)
            .version(version)
            .allow(Method::ALL)
            .build()
    }

    /// Joins the resource onto the document root. No traversal checks.
    fn resolve(&self, resource: &str) -> PathBuf {
        self.document_root.join(resource.trim_start_matches('/'))
    }

    fn is_reserved(&self, path: &Path) -> bool {
        canonical_key(path).starts_with(canonical_key(&self.error_pages))
    }

    async fn read(&self, path: &Path, with_body: bool, version: Version) -> Response {
        let guard = self.locks.acquire(path).await;

        let result = fs::read(path).await;
        drop(guard);

        match result {
            Ok(content) => {
                let builder = Response::builder(StatusCode::Ok)
                    .version(version)
                    .content_type(content_type_for(path));
                if with_body {
                    builder.body(content).build()
                } else {
                    builder.build()
                }
            }
            Err(e) if e.kind() == ErrorKind::NotFound => {
                self.render_page(ErrorPage::NotFound, version).await
            }
            Err(e) => {
                error!(path = %path.display(), error = %e, "Could not read the requested file");
                self.render_page(ErrorPage::InternalServerError, version).await
            }
        }
    }

    async fn write(&self, request: &Request, path: &Path, mode: WriteMode) -> Response {
        let version = request.version;
        let guard = self.locks.acquire(path).await;

        let existed = fs::try_exists(path).await.unwrap_or(false);
        if !existed && request.method != Method::POST {
            drop(guard);
            return self.render_page(ErrorPage::NotFound, version).await;
        }

        let result = match write_body(path, request.body.as_deref(), mode, existed).await {
            // Read back so appends report the whole file.
            Ok(()) => fs::read(path).await,
            Err(e) => Err(e),
        };
        drop(guard);

        let content = match result {
            Ok(content) => content,
            Err(e) => {
                error!(path = %path.display(), error = %e, "Could not write the requested file");
                return self.render_page(ErrorPage::InternalServerError, version).await;
            }
        };

        let status = if !existed && request.method == Method::POST {
            StatusCode::Created
        } else if !content.is_empty() {
            StatusCode::Ok
        } else {
            StatusCode::NoContent
        };

        let builder = Response::builder(status).version(version);
        if content.is_empty() {
            builder.build()
        } else {
            builder
                .content_type(content_type_for(path))
                .body(content)
                .build()
        }
    }

    async fn delete(&self, path: &Path, version: Version) -> Response {
        let guard = self.locks.acquire(path).await;
        let result = fs::remove_file(path).await;
        drop(guard);

        match result {
            Ok(()) => Response::builder(StatusCode::NoContent)
                .version(version)
                .build(),
            Err(e) if e.kind() == ErrorKind::NotFound => {
                self.render_page(ErrorPage::NotFound, version).await
            }
            Err(e) => {
                error!(path = %path.display(), error = %e, "Could not delete the requested file");
                self.render_page(ErrorPage::InternalServerError, version).await
            }
        }
    }

    /// Serves a fixed error template.
    ///
    /// Never re-enters dispatch: a missing or unreadable template becomes a
    /// plain-text body with the same status.
    pub async fn render_page(&self, page: ErrorPage, version: Version) -> Response {
        let path = self.error_pages.join(page.file_name());
        let guard = self.locks.acquire(&path).await;
        let result = fs::read(&path).await;
        drop(guard);

        match result {
            Ok(content) => Response::builder(page.status())
                .version(version)
                .content_type(content_type_for(&path))
                .body(content)
                .build(),
            Err(e) => {
                warn!(page = %path.display(), error = %e, "Error page unavailable");
                let mut response = Response::fallback(page.status());
                response.version = version;
                response
            }
        }
    }
}

async fn write_body(
    path: &Path,
    body: Option<&[u8]>,
    mode: WriteMode,
    existed: bool,
) -> std::io::Result<()> {
    // Nothing to write and nothing to create.
    if body.is_none() && existed {
        return Ok(());
    }

    let mut options = OpenOptions::new();
    options.create(true);
    match mode {
        WriteMode::Append => options.append(true),
        WriteMode::Overwrite => options.write(true).truncate(true),
    };

    let mut file = options.open(path).await?;
    if let Some(body) = body {
        file.write_all(body).await?;
    }
    file.flush().await?;
    Ok(())
}
