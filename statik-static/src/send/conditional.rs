//! Conditional request evaluation (ETag, Last-Modified, If-Range)

use http::HeaderMap;
use http::header::{
    CACHE_CONTROL, ETAG, IF_MATCH, IF_MODIFIED_SINCE, IF_NONE_MATCH, IF_RANGE,
    IF_UNMODIFIED_SINCE, LAST_MODIFIED,
};
use httpdate::parse_http_date;
use std::time::SystemTime;

/// Generate a weak ETag from file size and modification time
///
/// Format: `W/"<size hex>-<mtime millis hex>"`
pub fn generate_etag(size: u64, modified: Option<SystemTime>) -> String {
    let mtime_ms = modified
        .and_then(|t| t.duration_since(SystemTime::UNIX_EPOCH).ok())
        .map(|d| d.as_millis())
        .unwrap_or(0);
    format!("W/\"{:x}-{:x}\"", size, mtime_ms)
}

fn header_str<'a>(headers: &'a HeaderMap, name: http::header::HeaderName) -> Option<&'a str> {
    headers.get(name).and_then(|v| v.to_str().ok())
}

/// Whether the request carries any validator
pub(crate) fn is_conditional(req: &HeaderMap) -> bool {
    req.contains_key(IF_MATCH)
        || req.contains_key(IF_UNMODIFIED_SINCE)
        || req.contains_key(IF_NONE_MATCH)
        || req.contains_key(IF_MODIFIED_SINCE)
}

/// `If-Match` / `If-Unmodified-Since` evaluation; true means 412
pub(crate) fn precondition_failed(req: &HeaderMap, res: &HeaderMap) -> bool {
    if let Some(if_match) = header_str(req, IF_MATCH) {
        let etag = header_str(res, ETAG);
        let matched =
            if_match.trim() == "*" || etag.is_some_and(|etag| etag_matches(etag, if_match));
        if !matched {
            return true;
        }
    }

    if let Some(since) = header_str(req, IF_UNMODIFIED_SINCE) {
        let last_modified = header_str(res, LAST_MODIFIED).and_then(|v| parse_http_date(v).ok());
        if let (Some(last_modified), Ok(since)) = (last_modified, parse_http_date(since)) {
            if last_modified > since {
                return true;
            }
        }
    }

    false
}

/// `If-None-Match` / `If-Modified-Since` evaluation; true means 304
pub(crate) fn is_fresh(req: &HeaderMap, res: &HeaderMap) -> bool {
    let if_none_match = header_str(req, IF_NONE_MATCH);
    let if_modified_since = header_str(req, IF_MODIFIED_SINCE);

    if if_none_match.is_none() && if_modified_since.is_none() {
        return false;
    }

    if header_str(req, CACHE_CONTROL).is_some_and(|cc| cc.contains("no-cache")) {
        return false;
    }

    if let Some(if_none_match) = if_none_match {
        if if_none_match.trim() != "*" {
            let Some(etag) = header_str(res, ETAG) else {
                return false;
            };
            if !etag_matches(etag, if_none_match) {
                return false;
            }
        }
    }

    if let Some(since) = if_modified_since {
        let last_modified = header_str(res, LAST_MODIFIED).and_then(|v| parse_http_date(v).ok());
        match (last_modified, parse_http_date(since)) {
            (Some(last_modified), Ok(since)) if last_modified <= since => {}
            _ => return false,
        }
    }

    true
}

/// Whether a `Range` may be honored given `If-Range`
pub(crate) fn is_range_fresh(req: &HeaderMap, res: &HeaderMap) -> bool {
    let Some(if_range) = header_str(req, IF_RANGE) else {
        return true;
    };

    if if_range.contains('"') {
        return header_str(res, ETAG).is_some_and(|etag| etag_matches(etag, if_range));
    }

    let last_modified = header_str(res, LAST_MODIFIED).and_then(|v| parse_http_date(v).ok());
    match (last_modified, parse_http_date(if_range)) {
        (Some(last_modified), Ok(since)) => last_modified <= since,
        _ => false,
    }
}

/// Weak comparison of an ETag against a comma-separated candidate list
pub(crate) fn etag_matches(etag: &str, candidates: &str) -> bool {
    let etag = strip_weak(etag);
    candidates
        .split(',')
        .any(|candidate| strip_weak(candidate.trim()) == etag)
}

fn strip_weak(tag: &str) -> &str {
    tag.strip_prefix("W/").unwrap_or(tag)
}
