//! Extension to MIME type lookup.

use std::path::Path;

/// Returned for missing or unrecognised extensions.
pub const DEFAULT_MIME_TYPE: &str = "application/octet-stream";

/// MIME type sent with an upload, guessed from the file extension.
pub fn mime_type_for(path: &Path) -> String {
    mime_guess::from_path(path)
        .first_or_octet_stream()
        .essence_str()
        .to_string()
}
