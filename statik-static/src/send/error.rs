//! Errors raised while sending a file

use http::{HeaderMap, HeaderName, HeaderValue, StatusCode};
use std::io;

/// Why a send failed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SendErrorKind {
    /// Undecodable path or NUL byte
    BadRequest,
    /// Traversal attempt or denied dotfile
    Forbidden,
    NotFound,
    PreconditionFailed,
    RangeNotSatisfiable,
    /// Filesystem failure other than a missing file
    Io,
    /// Status forced by a listener
    Status,
}

impl SendErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            SendErrorKind::BadRequest => "bad request path",
            SendErrorKind::Forbidden => "forbidden",
            SendErrorKind::NotFound => "not found",
            SendErrorKind::PreconditionFailed => "precondition failed",
            SendErrorKind::RangeNotSatisfiable => "range not satisfiable",
            SendErrorKind::Io => "i/o error",
            SendErrorKind::Status => "error status",
        }
    }
}

/// A failed send, carrying the HTTP status it maps to
#[derive(Debug, thiserror::Error)]
#[error("{} ({})", .kind.as_str(), .status)]
pub struct SendError {
    status: StatusCode,
    kind: SendErrorKind,
    headers: HeaderMap,
    #[source]
    source: Option<io::Error>,
}

impl SendError {
    pub fn new(kind: SendErrorKind, status: StatusCode) -> Self {
        Self {
            status,
            kind,
            headers: HeaderMap::new(),
            source: None,
        }
    }

    pub fn bad_request() -> Self {
        Self::new(SendErrorKind::BadRequest, StatusCode::BAD_REQUEST)
    }

    pub fn forbidden() -> Self {
        Self::new(SendErrorKind::Forbidden, StatusCode::FORBIDDEN)
    }

    pub fn not_found() -> Self {
        Self::new(SendErrorKind::NotFound, StatusCode::NOT_FOUND)
    }

    /// An error with an arbitrary status, as requested by a listener
    pub fn status(status: StatusCode) -> Self {
        let kind = match status {
            StatusCode::NOT_FOUND => SendErrorKind::NotFound,
            StatusCode::FORBIDDEN => SendErrorKind::Forbidden,
            StatusCode::BAD_REQUEST => SendErrorKind::BadRequest,
            _ => SendErrorKind::Status,
        };
        Self::new(kind, status)
    }

    /// Map a filesystem error: missing paths are 404, anything else 500
    pub fn from_io(err: io::Error) -> Self {
        let (kind, status) = if is_not_found(&err) {
            (SendErrorKind::NotFound, StatusCode::NOT_FOUND)
        } else {
            (SendErrorKind::Io, StatusCode::INTERNAL_SERVER_ERROR)
        };
        Self {
            source: Some(err),
            ..Self::new(kind, status)
        }
    }

    pub fn with_header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.headers.insert(name, value);
        self
    }

    pub fn status_code(&self) -> StatusCode {
        self.status
    }

    pub fn kind(&self) -> SendErrorKind {
        self.kind
    }

    /// Headers the error response should carry (e.g. `Content-Range` on 416)
    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    pub fn is_server_error(&self) -> bool {
        self.status.as_u16() >= 500
    }
}

pub(crate) fn is_not_found(err: &io::Error) -> bool {
    matches!(
        err.kind(),
        io::ErrorKind::NotFound | io::ErrorKind::NotADirectory
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_io() {
        let missing = SendError::from_io(io::Error::from(io::ErrorKind::NotFound));
        assert_eq!(missing.status_code(), StatusCode::NOT_FOUND);
        assert!(!missing.is_server_error());

        let denied = SendError::from_io(io::Error::from(io::ErrorKind::PermissionDenied));
        assert_eq!(denied.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(denied.kind(), SendErrorKind::Io);
        assert!(denied.is_server_error());
        assert!(std::error::Error::source(&denied).is_some());
    }

    #[test]
    fn test_status_kind() {
        assert_eq!(
            SendError::status(StatusCode::NOT_FOUND).kind(),
            SendErrorKind::NotFound
        );
        assert_eq!(
            SendError::status(StatusCode::GONE).kind(),
            SendErrorKind::Status
        );
    }

    #[test]
    fn test_display() {
        assert_eq!(SendError::not_found().to_string(), "not found (404 Not Found)");
    }
}
