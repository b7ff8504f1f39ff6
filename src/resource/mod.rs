//! Filesystem side of the server.
//!
//! - **`locks`**: process-wide registry of per-path exclusive locks
//! - **`dispatcher`**: maps a parsed request onto a file operation and a response

use std::path::{Component, Path, PathBuf};

pub mod dispatcher;
pub mod locks;

pub use dispatcher::{Dispatcher, ErrorPage};
pub use locks::{LockRegistry, ResourceGuard};

/// Folds `.` and `..` without touching the filesystem.
///
/// `..` at the root stays at the root.
pub fn normalize_lexically(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                out.pop();
            }
            other => out.push(other.as_os_str()),
        }
    }
    out
}

/// Absolute, lexically normalised form of `path`; works for files that do
/// not exist yet.
pub fn canonical_key(path: &Path) -> PathBuf {
    let absolute = std::path::absolute(path).unwrap_or_else(|_| path.to_path_buf());
    normalize_lexically(&absolute)
}
