#![allow(dead_code)]

use std::fs;
use std::path::Path;

use filehttpd::resource::{Dispatcher, LockRegistry};
use tempfile::TempDir;

pub const INDEX: &str = "<h1>index</h1>";

/// Document root with the four error templates and an index page.
pub fn docroot() -> TempDir {
    let dir = tempfile::tempdir().unwrap();
    let pages = dir.path().join("error_pages");
    fs::create_dir(&pages).unwrap();

    for (file, text) in [
        ("BadRequest.html", "bad request page"),
        ("NotFound.html", "not found page"),
        ("Forbidden.html", "forbidden page"),
        ("InternalServerError.html", "internal error page"),
    ] {
        fs::write(pages.join(file), text).unwrap();
    }

    fs::write(dir.path().join("index.html"), INDEX).unwrap();
    dir
}

pub fn dispatcher(root: &Path) -> Dispatcher {
    Dispatcher::new(root, LockRegistry::new())
}
