use std::path::Path;

/// Probes a MIME type from the file extension, falling back to
/// `application/octet-stream`.
pub fn content_type_for(path: &Path) -> String {
    mime_guess::from_path(path)
        .first_or_octet_stream()
        .essence_str()
        .to_string()
}
