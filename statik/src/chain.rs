//! Mount chain
//!
//! Routes a request through the configured mounts in order. Each mount owns a
//! `ServeStatic` reached under a path prefix; a mount that passes the request
//! on hands it to the next one.

use bytes::Bytes;
use http::header::{CONTENT_LENGTH, CONTENT_TYPE};
use http::{HeaderValue, Request, Response, StatusCode, Uri};

use statik_core::config::{MountConfig, StatikConfig};
use statik_static::{OriginalUri, Outcome, SendError, ServeStatic, ServeStaticOptions, StaticBody};

/// A `ServeStatic` reached under a path prefix
pub struct Mount {
    /// Prefix without trailing slash; empty for `/`
    prefix: String,
    serve: ServeStatic,
}

impl Mount {
    pub fn new(prefix: &str, serve: ServeStatic) -> Self {
        Self {
            prefix: prefix.trim_end_matches('/').to_string(),
            serve,
        }
    }

    pub fn from_config(mount: &MountConfig) -> statik_core::Result<Self> {
        let options = ServeStaticOptions::try_from(mount)?;
        let serve = ServeStatic::new(&mount.root, options)?;
        tracing::info!("📂 Mounted {} at {}", serve.root().display(), mount.path);
        Ok(Self::new(&mount.path, serve))
    }

    /// The path left after the prefix, or `None` if the mount doesn't apply
    fn strip<'a>(&self, path: &'a str) -> Option<&'a str> {
        let rest = path.strip_prefix(self.prefix.as_str())?;
        if rest.is_empty() {
            Some("/")
        } else if rest.starts_with('/') {
            Some(rest)
        } else {
            None
        }
    }
}

/// Ordered list of mounts
#[derive(Default)]
pub struct Chain {
    mounts: Vec<Mount>,
}

impl Chain {
    pub fn new(mounts: Vec<Mount>) -> Self {
        Self { mounts }
    }

    pub fn from_config(config: &StatikConfig) -> statik_core::Result<Self> {
        config
            .mounts
            .iter()
            .map(Mount::from_config)
            .collect::<statik_core::Result<Vec<_>>>()
            .map(Self::new)
    }

    pub fn len(&self) -> usize {
        self.mounts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.mounts.is_empty()
    }

    pub async fn handle<B>(&self, mut req: Request<B>) -> Response<StaticBody> {
        let original = req.uri().clone();
        req.extensions_mut().insert(OriginalUri(original.clone()));

        for mount in &self.mounts {
            let Some(rest) = mount.strip(original.path()) else {
                continue;
            };
            let Some(uri) = rewrite(rest, original.query()) else {
                tracing::warn!("could not rewrite {} for mount {}", original, mount.prefix);
                continue;
            };
            *req.uri_mut() = uri;

            match mount.serve.serve(&req).await {
                Outcome::Respond(response) => return response,
                Outcome::Next(None) => continue,
                Outcome::Next(Some(err)) => return error_response(&original, err),
            }
        }

        tracing::debug!("no mount answered {}", original);
        plain(StatusCode::NOT_FOUND)
    }
}

fn rewrite(path: &str, query: Option<&str>) -> Option<Uri> {
    let path_and_query = match query {
        Some(query) => format!("{}?{}", path, query),
        None => path.to_string(),
    };
    Uri::try_from(path_and_query).ok()
}

fn error_response(uri: &Uri, err: SendError) -> Response<StaticBody> {
    if err.is_server_error() {
        tracing::error!("❌ {} failed: {}", uri, err);
    } else {
        tracing::debug!("{} -> {}", uri, err);
    }

    let mut response = plain(err.status_code());
    for (name, value) in err.headers() {
        response.headers_mut().insert(name.clone(), value.clone());
    }
    response
}

/// Status response with the canonical reason as body
fn plain(status: StatusCode) -> Response<StaticBody> {
    let reason = status.canonical_reason().unwrap_or("Error");
    let mut response = Response::new(StaticBody::full(Bytes::from(reason)));
    *response.status_mut() = status;
    let headers = response.headers_mut();
    headers.insert(
        CONTENT_TYPE,
        HeaderValue::from_static("text/plain; charset=utf-8"),
    );
    headers.insert(CONTENT_LENGTH, HeaderValue::from(reason.len()));
    response
}
