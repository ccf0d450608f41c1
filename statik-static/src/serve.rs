//! Request dispatcher
//!
//! [`ServeStatic`] is the middleware: it gates methods, derives the lookup
//! path, consults the path cache and the precompression negotiator, then
//! hands the path to an [`Engine`] and reacts to its lifecycle events.
//! Every request ends in exactly one [`Outcome`]: a response, or a request to
//! continue the chain (optionally with an error).

use http::header::{ACCEPT_ENCODING, ALLOW, CONTENT_ENCODING, CONTENT_LENGTH, CONTENT_TYPE, VARY};
use http::{HeaderMap, HeaderValue, Method, Request, Response, StatusCode, Uri};
use std::fs::Metadata;
use std::future::Future;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::body::StaticBody;
use crate::cache::{PathCache, normalize_pathname};
use crate::directory::DirectoryPolicy;
use crate::mime;
use crate::negotiate::{Negotiated, Negotiator};
use crate::options::{ServeStaticOptions, SetHeaders};
use crate::send::{
    DirectoryAction, DirectoryContext, Engine, FsEngine, SendError, SendEvents, SendOptions,
    SendRequest,
};
use statik_core::{Error, Result};

/// The request URI before a mounting layer stripped its prefix
///
/// Insert it as a request extension when rewriting the URI; redirects are
/// built from it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OriginalUri(pub Uri);

/// What the chain should do after the middleware ran
#[derive(Debug)]
pub enum Outcome {
    /// The middleware answered
    Respond(Response<StaticBody>),
    /// Continue with the next handler; `Some` reports a failure upward
    Next(Option<SendError>),
}

impl Outcome {
    pub fn is_next(&self) -> bool {
        matches!(self, Outcome::Next(_))
    }

    pub fn into_response(self) -> Option<Response<StaticBody>> {
        match self {
            Outcome::Respond(response) => Some(response),
            Outcome::Next(_) => None,
        }
    }
}

/// Static file middleware bound to one root directory
pub struct ServeStatic {
    root: PathBuf,
    root_key: String,
    fallthrough: bool,
    directory: DirectoryPolicy,
    set_headers: Option<SetHeaders>,
    prefer_precompressed: bool,
    negotiator: Negotiator,
    send_options: SendOptions,
    engine: Arc<dyn Engine>,
    cache: Arc<PathCache>,
}

impl std::fmt::Debug for ServeStatic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServeStatic")
            .field("root", &self.root)
            .field("fallthrough", &self.fallthrough)
            .field("directory", &self.directory)
            .field("prefer_precompressed", &self.prefer_precompressed)
            .finish_non_exhaustive()
    }
}

impl ServeStatic {
    /// Build the middleware; fails on an empty root or invalid options
    pub fn new(root: impl AsRef<Path>, options: ServeStaticOptions) -> Result<Self> {
        let root = root.as_ref();
        if root.as_os_str().is_empty() {
            return Err(Error::config("root path required"));
        }
        let root = std::path::absolute(root)?;
        let send_options = options.send_options(root.clone())?;

        let index = options
            .index
            .first()
            .cloned()
            .unwrap_or_else(|| "index.html".to_string());

        tracing::debug!("serving static files from {}", root.display());

        Ok(Self {
            root_key: root.to_string_lossy().into_owned(),
            root,
            fallthrough: options.fallthrough,
            directory: DirectoryPolicy::from_redirect(options.redirect),
            set_headers: options.set_headers,
            prefer_precompressed: options.prefer_precompressed,
            negotiator: Negotiator::new(index),
            send_options,
            engine: Arc::new(FsEngine),
            cache: PathCache::shared(),
        })
    }

    /// Replace the filesystem engine
    pub fn with_engine(mut self, engine: Arc<dyn Engine>) -> Self {
        self.engine = engine;
        self
    }

    /// Use a private path cache instead of the process-wide one
    pub fn with_path_cache(mut self, cache: Arc<PathCache>) -> Self {
        self.cache = cache;
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Handle one request; the body is never read
    pub fn serve<'a, B>(&'a self, req: &'a Request<B>) -> impl Future<Output = Outcome> + Send + 'a {
        let head = RequestHead {
            method: req.method(),
            uri: req.uri(),
            headers: req.headers(),
            original: req.extensions().get::<OriginalUri>().map(|o| &o.0),
        };
        self.dispatch(head)
    }

    async fn dispatch(&self, head: RequestHead<'_>) -> Outcome {
        if head.method != Method::GET && head.method != Method::HEAD {
            if self.fallthrough {
                return Outcome::Next(None);
            }
            return Outcome::Respond(method_not_allowed());
        }

        let original = head.original.unwrap_or(head.uri);
        let mut pathname = head.uri.path();
        if pathname == "/" && !original.path().ends_with('/') {
            // let the directory policy add the slash
            pathname = "";
        }

        let path = self
            .cache
            .resolve(pathname, &self.root_key, normalize_pathname);

        let negotiated = if self.prefer_precompressed {
            let accept = head
                .headers
                .get(ACCEPT_ENCODING)
                .and_then(|v| v.to_str().ok());
            self.negotiator.negotiate(&path, accept, &self.root).await
        } else {
            None
        };
        let send_path = negotiated.as_ref().map_or(path.as_str(), |n| n.path.as_str());

        let mut listener = DispatchListener {
            directory: self.directory,
            original,
            negotiated: negotiated.as_ref(),
            set_headers: self.set_headers.as_ref(),
            file_seen: false,
        };

        let req = SendRequest::new(head.method, head.headers);
        let result = self
            .engine
            .send(&req, send_path, &self.send_options, &mut listener)
            .await;

        match result {
            Ok(response) => Outcome::Respond(response),
            Err(err) => {
                if !self.fallthrough || listener.file_seen || err.is_server_error() {
                    tracing::debug!("forwarding error for {}: {}", send_path, err);
                    Outcome::Next(Some(err))
                } else {
                    tracing::debug!("falling through for {}: {}", send_path, err);
                    Outcome::Next(None)
                }
            }
        }
    }
}

struct RequestHead<'a> {
    method: &'a Method,
    uri: &'a Uri,
    headers: &'a HeaderMap,
    original: Option<&'a Uri>,
}

/// Per-request listener wiring engine events to the middleware's policies
struct DispatchListener<'a> {
    directory: DirectoryPolicy,
    original: &'a Uri,
    negotiated: Option<&'a Negotiated>,
    set_headers: Option<&'a SetHeaders>,
    file_seen: bool,
}

impl SendEvents for DispatchListener<'_> {
    fn directory(&mut self, dir: &DirectoryContext<'_>) -> DirectoryAction {
        self.directory.dispose(dir, self.original)
    }

    fn file(&mut self, _path: &Path, _meta: &Metadata) {
        // from here on a failure is a real error, not a missing file
        self.file_seen = true;
    }

    fn headers(&mut self, headers: &mut HeaderMap, path: &Path, meta: &Metadata) {
        headers.insert(VARY, HeaderValue::from_static("Accept-Encoding"));

        if let Some(negotiated) = self.negotiated {
            if let Ok(value) = HeaderValue::from_str(&mime::content_type(&negotiated.original)) {
                headers.insert(CONTENT_TYPE, value);
            }
            headers.insert(
                CONTENT_ENCODING,
                HeaderValue::from_static(negotiated.encoding.encoding()),
            );
            headers.insert(CONTENT_LENGTH, HeaderValue::from(meta.len()));
        }

        if let Some(set_headers) = self.set_headers {
            set_headers(headers, path, meta);
        }
    }
}

fn method_not_allowed() -> Response<StaticBody> {
    let mut response = Response::new(StaticBody::empty());
    *response.status_mut() = StatusCode::METHOD_NOT_ALLOWED;
    let headers = response.headers_mut();
    headers.insert(ALLOW, HeaderValue::from_static("GET, HEAD"));
    headers.insert(CONTENT_LENGTH, HeaderValue::from_static("0"));
    response
}
