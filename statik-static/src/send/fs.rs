//! Filesystem-backed engine

use async_trait::async_trait;
use http::header::{
    ACCEPT_RANGES, CACHE_CONTROL, CONTENT_ENCODING, CONTENT_LANGUAGE, CONTENT_LENGTH,
    CONTENT_RANGE, CONTENT_TYPE, ETAG, LAST_MODIFIED, RANGE,
};
use http::{HeaderMap, HeaderValue, Response, StatusCode};
use percent_encoding::percent_decode_str;
use std::fs::Metadata;
use std::io::SeekFrom;
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::io::AsyncSeekExt;

use super::conditional::{generate_etag, is_conditional, is_fresh, is_range_fresh, precondition_failed};
use super::error::{SendError, SendErrorKind, is_not_found};
use super::range::{RangeOutcome, parse_range};
use super::{DirectoryAction, DirectoryContext, Engine, SendEvents, SendOptions, SendRequest};
use crate::body::StaticBody;
use crate::mime;
use statik_core::config::Dotfiles;

/// Sends files from the local filesystem with tokio
#[derive(Debug, Default, Clone, Copy)]
pub struct FsEngine;

#[async_trait]
impl Engine for FsEngine {
    async fn send(
        &self,
        req: &SendRequest<'_>,
        path: &str,
        options: &SendOptions,
        events: &mut dyn SendEvents,
    ) -> Result<Response<StaticBody>, SendError> {
        let decoded = decode_path(path)?;

        if has_parent_segment(&decoded) {
            tracing::debug!("rejecting traversal attempt: {}", path);
            return Err(SendError::forbidden());
        }

        if has_dotfile_segment(&decoded) {
            match options.dotfiles {
                Dotfiles::Allow => {}
                Dotfiles::Deny => return Err(SendError::forbidden()),
                Dotfiles::Ignore => return Err(SendError::not_found()),
            }
        }

        let fs_path = options.root.join(decoded.trim_start_matches('/'));

        if decoded.ends_with('/') && !options.index.is_empty() {
            return send_index(req, &fs_path, options, events).await;
        }

        let stat = fs::metadata(&fs_path).await;
        let (fs_path, meta) = match stat {
            Ok(meta) => (fs_path, meta),
            Err(err) if is_not_found(&err) => {
                match try_extensions(&decoded, &fs_path, options).await {
                    Some(found) => found,
                    None => return Err(SendError::from_io(err)),
                }
            }
            Err(err) => return Err(SendError::from_io(err)),
        };

        if meta.is_dir() {
            let dir = DirectoryContext {
                path,
                fs_path: &fs_path,
            };
            return match events.directory(&dir) {
                DirectoryAction::Respond(response) => Ok(response),
                DirectoryAction::Error(status) => Err(SendError::status(status)),
            };
        }

        send_file(req, &fs_path, meta, options, events).await
    }
}

fn decode_path(path: &str) -> Result<String, SendError> {
    let decoded = percent_decode_str(path)
        .decode_utf8()
        .map_err(|_| SendError::bad_request())?;
    if decoded.contains('\0') {
        return Err(SendError::bad_request());
    }
    Ok(decoded.into_owned())
}

fn segments(path: &str) -> impl Iterator<Item = &str> {
    path.split(['/', '\\']).filter(|s| !s.is_empty())
}

fn has_parent_segment(path: &str) -> bool {
    segments(path).any(|s| s == "..")
}

fn has_dotfile_segment(path: &str) -> bool {
    segments(path).any(|s| s.len() > 1 && s.starts_with('.'))
}

async fn try_extensions(
    decoded: &str,
    fs_path: &Path,
    options: &SendOptions,
) -> Option<(PathBuf, Metadata)> {
    if options.extensions.is_empty() || decoded.ends_with('/') || fs_path.extension().is_some() {
        return None;
    }

    for ext in &options.extensions {
        let mut candidate = fs_path.as_os_str().to_owned();
        candidate.push(".");
        candidate.push(ext);
        let candidate = PathBuf::from(candidate);

        if let Ok(meta) = fs::metadata(&candidate).await {
            if meta.is_file() {
                return Some((candidate, meta));
            }
        }
    }
    None
}

async fn send_index(
    req: &SendRequest<'_>,
    dir: &Path,
    options: &SendOptions,
    events: &mut dyn SendEvents,
) -> Result<Response<StaticBody>, SendError> {
    for name in &options.index {
        let candidate = dir.join(name);
        match fs::metadata(&candidate).await {
            Ok(meta) if meta.is_file() => {
                return send_file(req, &candidate, meta, options, events).await;
            }
            _ => continue,
        }
    }
    Err(SendError::not_found())
}

async fn send_file(
    req: &SendRequest<'_>,
    fs_path: &Path,
    meta: Metadata,
    options: &SendOptions,
    events: &mut dyn SendEvents,
) -> Result<Response<StaticBody>, SendError> {
    events.file(fs_path, &meta);

    let size = meta.len();
    let mut headers = default_headers(fs_path, &meta, options);
    events.headers(&mut headers, fs_path, &meta);

    if is_conditional(req.headers) {
        if precondition_failed(req.headers, &headers) {
            return Err(SendError::new(
                SendErrorKind::PreconditionFailed,
                StatusCode::PRECONDITION_FAILED,
            ));
        }
        if is_fresh(req.headers, &headers) {
            return Ok(not_modified(headers));
        }
    }

    let mut status = StatusCode::OK;
    let mut offset = 0;
    let mut length = size;

    let range = req.headers.get(RANGE).and_then(|v| v.to_str().ok());
    if let Some(range) = range.filter(|_| options.accept_ranges) {
        if is_range_fresh(req.headers, &headers) {
            match parse_range(range, size) {
                RangeOutcome::Satisfiable(window) => {
                    status = StatusCode::PARTIAL_CONTENT;
                    offset = window.start;
                    length = window.len();
                    headers.insert(CONTENT_RANGE, header_value(&window.content_range(size)));
                    headers.insert(CONTENT_LENGTH, HeaderValue::from(length));
                }
                RangeOutcome::Unsatisfiable => {
                    return Err(SendError::new(
                        SendErrorKind::RangeNotSatisfiable,
                        StatusCode::RANGE_NOT_SATISFIABLE,
                    )
                    .with_header(CONTENT_RANGE, header_value(&format!("bytes */{}", size))));
                }
                RangeOutcome::Ignored => {}
            }
        }
    }

    let body = if req.is_head() {
        StaticBody::empty()
    } else {
        let mut file = fs::File::open(fs_path).await.map_err(SendError::from_io)?;
        if offset > 0 {
            file.seek(SeekFrom::Start(offset))
                .await
                .map_err(SendError::from_io)?;
        }
        StaticBody::file(file, length)
    };

    tracing::debug!("📁 {} {} ({} bytes)", status.as_u16(), fs_path.display(), length);

    let mut response = Response::new(body);
    *response.status_mut() = status;
    *response.headers_mut() = headers;
    Ok(response)
}

fn default_headers(fs_path: &Path, meta: &Metadata, options: &SendOptions) -> HeaderMap {
    let mut headers = HeaderMap::new();
    let modified = meta.modified().ok();

    if options.accept_ranges {
        headers.insert(ACCEPT_RANGES, HeaderValue::from_static("bytes"));
    }
    if options.cache_control {
        headers.insert(CACHE_CONTROL, header_value(&options.cache_control_value()));
    }
    if options.last_modified {
        if let Some(modified) = modified {
            headers.insert(LAST_MODIFIED, header_value(&httpdate::fmt_http_date(modified)));
        }
    }
    if options.etag {
        headers.insert(ETAG, header_value(&generate_etag(meta.len(), modified)));
    }
    headers.insert(CONTENT_TYPE, header_value(&mime::content_type(fs_path)));
    headers.insert(CONTENT_LENGTH, HeaderValue::from(meta.len()));
    headers
}

fn not_modified(mut headers: HeaderMap) -> Response<StaticBody> {
    for name in [CONTENT_ENCODING, CONTENT_LANGUAGE, CONTENT_LENGTH, CONTENT_RANGE, CONTENT_TYPE] {
        headers.remove(name);
    }
    let mut response = Response::new(StaticBody::empty());
    *response.status_mut() = StatusCode::NOT_MODIFIED;
    *response.headers_mut() = headers;
    response
}

/// Values built here are ASCII by construction; fall back to empty rather than panic.
fn header_value(value: &str) -> HeaderValue {
    HeaderValue::from_str(value).unwrap_or_else(|_| HeaderValue::from_static(""))
}
