//! File sending engine
//!
//! The engine turns a path below a root into a response: it owns path
//! decoding, stat, conditional GET, byte ranges, ETag/Last-Modified and the
//! file stream. Callers observe the lifecycle through [`SendEvents`]:
//!
//! - `directory` fires when the path names a directory (instead of `file`
//!   and `headers`); the listener decides between a response and an error.
//! - `file` fires once a regular file has been positively identified.
//! - `headers` fires after the default headers are computed and before the
//!   conditional/range logic reads them, so listener overrides are honored.
//!
//! `file` always precedes `headers` and any error raised afterwards.

mod conditional;
mod error;
mod fs;
mod range;

pub use conditional::generate_etag;
pub use error::{SendError, SendErrorKind};
pub use fs::FsEngine;
pub use range::{ByteRange, RangeOutcome, parse_range};

use async_trait::async_trait;
use http::{HeaderMap, Method, Response, StatusCode};
use std::fs::Metadata;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::body::StaticBody;
use statik_core::config::Dotfiles;

/// Longest max-age the engine advertises
pub const MAX_MAX_AGE: Duration = Duration::from_secs(60 * 60 * 24 * 365);

/// The parts of a request the engine reads
#[derive(Debug, Clone, Copy)]
pub struct SendRequest<'a> {
    pub method: &'a Method,
    pub headers: &'a HeaderMap,
}

impl<'a> SendRequest<'a> {
    pub fn new(method: &'a Method, headers: &'a HeaderMap) -> Self {
        Self { method, headers }
    }

    pub fn from_request<B>(req: &'a http::Request<B>) -> Self {
        Self::new(req.method(), req.headers())
    }

    pub fn is_head(&self) -> bool {
        *self.method == Method::HEAD
    }
}

/// Options the engine applies to every file it sends
#[derive(Debug, Clone)]
pub struct SendOptions {
    /// Directory paths are resolved beneath
    pub root: PathBuf,
    /// Cache-Control max-age (capped at [`MAX_MAX_AGE`])
    pub max_age: Duration,
    /// Index files tried for trailing-slash paths
    pub index: Vec<String>,
    pub dotfiles: Dotfiles,
    /// Extensions (without the dot) tried when the file is missing
    pub extensions: Vec<String>,
    pub etag: bool,
    pub last_modified: bool,
    pub accept_ranges: bool,
    pub cache_control: bool,
    pub immutable: bool,
}

impl SendOptions {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            max_age: Duration::ZERO,
            index: vec!["index.html".to_string()],
            dotfiles: Dotfiles::Ignore,
            extensions: Vec::new(),
            etag: true,
            last_modified: true,
            accept_ranges: true,
            cache_control: true,
            immutable: false,
        }
    }

    /// The Cache-Control value for served files
    pub fn cache_control_value(&self) -> String {
        let secs = self.max_age.min(MAX_MAX_AGE).as_secs();
        if self.immutable {
            format!("public, max-age={}, immutable", secs)
        } else {
            format!("public, max-age={}", secs)
        }
    }
}

/// What the engine was looking at when it found a directory
#[derive(Debug, Clone, Copy)]
pub struct DirectoryContext<'a> {
    /// The path handed to the engine, before decoding
    pub path: &'a str,
    /// The directory on disk
    pub fs_path: &'a Path,
}

impl DirectoryContext<'_> {
    pub fn has_trailing_slash(&self) -> bool {
        self.path.ends_with('/')
    }
}

/// A listener's answer to a `directory` event
#[derive(Debug)]
pub enum DirectoryAction {
    /// Send this response instead
    Respond(Response<StaticBody>),
    /// Fail the send with this status
    Error(StatusCode),
}

/// Lifecycle listener attached to one send
pub trait SendEvents: Send {
    fn directory(&mut self, _dir: &DirectoryContext<'_>) -> DirectoryAction {
        DirectoryAction::Error(StatusCode::NOT_FOUND)
    }

    fn file(&mut self, _path: &Path, _meta: &Metadata) {}

    fn headers(&mut self, _headers: &mut HeaderMap, _path: &Path, _meta: &Metadata) {}
}

/// A listener that keeps every default
#[derive(Debug, Default)]
pub struct NoEvents;

impl SendEvents for NoEvents {}

/// Streams files beneath a root
#[async_trait]
pub trait Engine: Send + Sync {
    async fn send(
        &self,
        req: &SendRequest<'_>,
        path: &str,
        options: &SendOptions,
        events: &mut dyn SendEvents,
    ) -> Result<Response<StaticBody>, SendError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cache_control_value() {
        let mut options = SendOptions::new("/srv");
        assert_eq!(options.cache_control_value(), "public, max-age=0");

        options.max_age = Duration::from_millis(90_500);
        assert_eq!(options.cache_control_value(), "public, max-age=90");

        options.max_age = Duration::from_secs(10 * 365 * 24 * 3600);
        options.immutable = true;
        assert_eq!(
            options.cache_control_value(),
            "public, max-age=31536000, immutable"
        );
    }

    #[test]
    fn test_trailing_slash() {
        let dir = DirectoryContext {
            path: "/docs/",
            fs_path: Path::new("/srv/docs"),
        };
        assert!(dir.has_trailing_slash());
        let dir = DirectoryContext { path: "", ..dir };
        assert!(!dir.has_trailing_slash());
    }
}
