//! Directory disposition
//!
//! What to answer when a request resolves to a directory: a 301 to the same
//! URL with a trailing slash, or a plain 404.

use bytes::Bytes;
use http::header::{
    CONTENT_LENGTH, CONTENT_SECURITY_POLICY, CONTENT_TYPE, LOCATION, X_CONTENT_TYPE_OPTIONS,
};
use http::{HeaderValue, Response, StatusCode, Uri};
use percent_encoding::{AsciiSet, CONTROLS, utf8_percent_encode};

use crate::body::StaticBody;
use crate::send::{DirectoryAction, DirectoryContext};

/// Characters `encode_url` escapes besides controls and non-ASCII
const URL_UNSAFE: &AsciiSet = &CONTROLS
    .add(b' ')
    .add(b'"')
    .add(b'<')
    .add(b'>')
    .add(b'`')
    .add(b'{')
    .add(b'}');

/// Directory policy, fixed when the middleware is built
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DirectoryPolicy {
    /// 301 to the trailing-slash URL
    Redirect,
    /// 404 through the engine
    NotFound,
}

impl DirectoryPolicy {
    pub fn from_redirect(redirect: bool) -> Self {
        if redirect {
            DirectoryPolicy::Redirect
        } else {
            DirectoryPolicy::NotFound
        }
    }

    /// Decide what to do for a directory hit; `original` is the URL as the
    /// client sent it, before any mount prefix was stripped
    pub fn dispose(&self, dir: &DirectoryContext<'_>, original: &Uri) -> DirectoryAction {
        match self {
            DirectoryPolicy::NotFound => DirectoryAction::Error(StatusCode::NOT_FOUND),
            DirectoryPolicy::Redirect => {
                if dir.has_trailing_slash() {
                    return DirectoryAction::Error(StatusCode::NOT_FOUND);
                }
                let location = redirect_location(original);
                tracing::debug!("redirecting directory {} -> {}", dir.fs_path.display(), location);
                DirectoryAction::Respond(redirect_response(&location))
            }
        }
    }
}

/// `original` with one trailing slash added to its path, leading slashes
/// collapsed, and the result made safe for a Location header
pub fn redirect_location(original: &Uri) -> String {
    let mut location = collapse_leading_slashes(&format!("{}/", original.path()));
    if let Some(query) = original.query() {
        location.push('?');
        location.push_str(query);
    }
    encode_url(&location)
}

fn collapse_leading_slashes(path: &str) -> String {
    let rest = path.trim_start_matches('/');
    if rest.len() == path.len() {
        path.to_string()
    } else {
        format!("/{}", rest)
    }
}

/// Percent-encode a URL, keeping well-formed `%XX` escapes intact
pub fn encode_url(url: &str) -> String {
    let mut out = String::with_capacity(url.len());
    let mut rest = url;

    while let Some(idx) = rest.find('%') {
        out.extend(utf8_percent_encode(&rest[..idx], URL_UNSAFE));
        let tail = &rest[idx + 1..];
        let escaped = tail.len() >= 2 && tail.as_bytes()[..2].iter().all(u8::is_ascii_hexdigit);
        out.push_str(if escaped { "%" } else { "%25" });
        rest = tail;
    }

    out.extend(utf8_percent_encode(rest, URL_UNSAFE));
    out
}

/// Escape text for inclusion in HTML
pub fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

fn html_document(title: &str, body: &str) -> String {
    format!(
        "<!DOCTYPE html>\n<html lang=\"en\">\n<head>\n<meta charset=\"utf-8\">\n<title>{}</title>\n</head>\n<body>\n<pre>{}</pre>\n</body>\n</html>\n",
        title, body
    )
}

/// The 301 sent for a directory without a trailing slash
pub fn redirect_response(location: &str) -> Response<StaticBody> {
    let doc = html_document(
        "Redirecting",
        &format!("Redirecting to {}", escape_html(location)),
    );
    let len = doc.len() as u64;

    let mut response = Response::new(StaticBody::full(Bytes::from(doc)));
    *response.status_mut() = StatusCode::MOVED_PERMANENTLY;

    let headers = response.headers_mut();
    headers.insert(
        CONTENT_TYPE,
        HeaderValue::from_static("text/html; charset=UTF-8"),
    );
    headers.insert(CONTENT_LENGTH, HeaderValue::from(len));
    headers.insert(
        CONTENT_SECURITY_POLICY,
        HeaderValue::from_static("default-src 'none'"),
    );
    headers.insert(X_CONTENT_TYPE_OPTIONS, HeaderValue::from_static("nosniff"));
    // encode_url leaves only visible ASCII
    if let Ok(value) = HeaderValue::from_str(location) {
        headers.insert(LOCATION, value);
    }
    response
}
