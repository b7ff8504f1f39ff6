//! filehttpd - HTTP methods mapped onto files
//!
//! GET/HEAD read a file under the document root, POST/PUT/PATCH write or
//! append one, DELETE removes one and OPTIONS lists the supported methods.

pub mod config;
pub mod http;
pub mod resource;
pub mod server;
