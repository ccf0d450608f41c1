//! Middleware options

use http::{HeaderMap, HeaderName, HeaderValue};
use std::fmt;
use std::fs::Metadata;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use crate::send::SendOptions;
use statik_core::config::{Dotfiles, MountConfig};
use statik_core::{Error, Result};

/// Caller hook run last on every file response; may override any header
pub type SetHeaders = Arc<dyn Fn(&mut HeaderMap, &Path, &Metadata) + Send + Sync>;

/// Options for [`ServeStatic`](crate::ServeStatic)
#[derive(Clone)]
pub struct ServeStaticOptions {
    /// Call `next` for missing files and disallowed methods instead of
    /// answering 404/405
    pub fallthrough: bool,
    /// Redirect directory requests to the trailing-slash URL
    pub redirect: bool,
    pub set_headers: Option<SetHeaders>,
    pub max_age: Duration,
    /// Serve `.br` / `.gz` siblings when the client accepts them
    pub prefer_precompressed: bool,
    pub index: Vec<String>,
    pub dotfiles: Dotfiles,
    pub extensions: Vec<String>,
    pub etag: bool,
    pub last_modified: bool,
    pub accept_ranges: bool,
    pub cache_control: bool,
    pub immutable: bool,
}

impl Default for ServeStaticOptions {
    fn default() -> Self {
        Self {
            fallthrough: true,
            redirect: true,
            set_headers: None,
            max_age: Duration::ZERO,
            prefer_precompressed: false,
            index: vec!["index.html".to_string()],
            dotfiles: Dotfiles::default(),
            extensions: Vec::new(),
            etag: true,
            last_modified: true,
            accept_ranges: true,
            cache_control: true,
            immutable: false,
        }
    }
}

impl fmt::Debug for ServeStaticOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServeStaticOptions")
            .field("fallthrough", &self.fallthrough)
            .field("redirect", &self.redirect)
            .field("set_headers", &self.set_headers.is_some())
            .field("max_age", &self.max_age)
            .field("prefer_precompressed", &self.prefer_precompressed)
            .field("index", &self.index)
            .field("dotfiles", &self.dotfiles)
            .field("extensions", &self.extensions)
            .field("immutable", &self.immutable)
            .finish_non_exhaustive()
    }
}

impl ServeStaticOptions {
    pub fn fallthrough(mut self, enable: bool) -> Self {
        self.fallthrough = enable;
        self
    }

    pub fn redirect(mut self, enable: bool) -> Self {
        self.redirect = enable;
        self
    }

    pub fn set_headers<F>(mut self, f: F) -> Self
    where
        F: Fn(&mut HeaderMap, &Path, &Metadata) + Send + Sync + 'static,
    {
        self.set_headers = Some(Arc::new(f));
        self
    }

    pub fn max_age(mut self, max_age: Duration) -> Self {
        self.max_age = max_age;
        self
    }

    /// Max-age given in milliseconds
    pub fn max_age_ms(self, millis: u64) -> Self {
        self.max_age(Duration::from_millis(millis))
    }

    pub fn prefer_precompressed(mut self, enable: bool) -> Self {
        self.prefer_precompressed = enable;
        self
    }

    pub fn index<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.index = names.into_iter().map(Into::into).collect();
        self
    }

    pub fn dotfiles(mut self, dotfiles: Dotfiles) -> Self {
        self.dotfiles = dotfiles;
        self
    }

    pub fn extensions<I, S>(mut self, extensions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.extensions = extensions.into_iter().map(Into::into).collect();
        self
    }

    pub fn etag(mut self, enable: bool) -> Self {
        self.etag = enable;
        self
    }

    pub fn last_modified(mut self, enable: bool) -> Self {
        self.last_modified = enable;
        self
    }

    pub fn accept_ranges(mut self, enable: bool) -> Self {
        self.accept_ranges = enable;
        self
    }

    pub fn cache_control(mut self, enable: bool) -> Self {
        self.cache_control = enable;
        self
    }

    pub fn immutable(mut self, enable: bool) -> Self {
        self.immutable = enable;
        self
    }

    /// Check every field and produce the engine options for `root`
    pub(crate) fn send_options(&self, root: PathBuf) -> Result<SendOptions> {
        for name in &self.index {
            if name.is_empty() || name.contains(['/', '\\']) {
                return Err(Error::Config(format!("invalid index file name: {:?}", name)));
            }
        }

        let mut extensions = Vec::with_capacity(self.extensions.len());
        for ext in &self.extensions {
            let ext = ext.trim_start_matches('.');
            if ext.is_empty() || ext.contains(['/', '\\']) {
                return Err(Error::Config(format!("invalid extension: {:?}", ext)));
            }
            extensions.push(ext.to_string());
        }

        Ok(SendOptions {
            root,
            max_age: self.max_age,
            index: self.index.clone(),
            dotfiles: self.dotfiles,
            extensions,
            etag: self.etag,
            last_modified: self.last_modified,
            accept_ranges: self.accept_ranges,
            cache_control: self.cache_control,
            immutable: self.immutable,
        })
    }
}

impl<'a> TryFrom<&'a MountConfig> for ServeStaticOptions {
    type Error = Error;

    fn try_from(mount: &'a MountConfig) -> Result<Self> {
        let mut options = ServeStaticOptions::default()
            .fallthrough(mount.fallthrough)
            .redirect(mount.redirect)
            .max_age_ms(mount.max_age)
            .prefer_precompressed(mount.prefer_precompressed)
            .index(mount.index.iter().cloned())
            .dotfiles(mount.dotfiles)
            .extensions(mount.extensions.iter().cloned())
            .etag(mount.etag)
            .last_modified(mount.last_modified)
            .accept_ranges(mount.accept_ranges)
            .cache_control(mount.cache_control)
            .immutable(mount.immutable);

        if !mount.headers.is_empty() {
            let mut extra = HeaderMap::new();
            for (name, value) in &mount.headers {
                let name = HeaderName::from_bytes(name.as_bytes())
                    .map_err(|e| Error::Config(format!("invalid header name {:?}: {}", name, e)))?;
                let value = HeaderValue::from_str(value)
                    .map_err(|e| Error::Config(format!("invalid value for {}: {}", name, e)))?;
                extra.insert(name, value);
            }
            options = options.set_headers(move |headers, _, _| {
                for (name, value) in &extra {
                    headers.insert(name.clone(), value.clone());
                }
            });
        }

        Ok(options)
    }
}
