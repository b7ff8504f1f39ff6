//! HTTP protocol implementation.
//!
//! A deliberately small HTTP/1.0 and HTTP/1.1 subset: one request per
//! connection, no keep-alive, no chunked bodies. Only `Content-Length` is
//! read from the request headers.
//!
//! # Architecture
//!
//! - **`connection`**: Per-connection state machine driving decode → dispatch → encode
//! - **`parser`**: Parses an incoming request from the bytes received so far
//! - **`request`**: Request representation, methods and protocol versions
//! - **`response`**: Response representation with builder pattern
//! - **`writer`**: Serializes and writes responses to the client
//! - **`mime`**: MIME type detection based on file extensions
//!
//! # Connection State Machine
//!
//! ```text
//!        ┌─────────────┐
//!        │   Reading   │ ← Wait for the request (or end of stream)
//!        └──────┬──────┘
//!               │ Request parsed or rejected
//!               ▼
//!        ┌──────────────────┐
//!        │   Processing     │ ← Dispatch onto the document root
//!        └──────┬───────────┘
//!               │ Response ready
//!               ▼
//!        ┌──────────────────┐
//!        │    Writing       │ ← Send response to client
//!        └──────┬───────────┘
//!               │ Response sent
//!               ▼
//!        ┌──────────────────┐
//!        │     Closed       │ ← Stream shut down, socket dropped
//!        └──────────────────┘
//! ```

pub mod connection;
pub mod mime;
pub mod parser;
pub mod request;
pub mod response;
pub mod writer;
