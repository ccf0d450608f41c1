//! MIME type handling

use std::path::Path;

/// Get the Content-Type header value for a file path
///
/// Text types and JSON get an explicit UTF-8 charset.
pub fn content_type(path: impl AsRef<Path>) -> String {
    let mime = mime_guess::from_path(path).first_or_octet_stream();
    // older mime tables still say application/javascript
    if mime.essence_str() == "application/javascript" {
        return "text/javascript; charset=UTF-8".to_string();
    }
    if needs_charset(&mime) {
        format!("{}; charset=UTF-8", mime.essence_str())
    } else {
        mime.essence_str().to_string()
    }
}

fn needs_charset(mime: &mime_guess::Mime) -> bool {
    mime.type_() == mime_guess::mime::TEXT
        || matches!(
            mime.essence_str(),
            "application/json" | "application/manifest+json"
        )
}
