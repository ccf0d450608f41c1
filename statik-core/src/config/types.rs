//! Configuration type definitions
//!
//! These types represent the on-disk configuration for a Statik server.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::error::{Error, Result};

/// Root configuration for Statik
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct StatikConfig {
    /// Listener configuration
    #[serde(default)]
    pub server: ServerConfig,

    /// Global logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,

    /// Static mounts, tried in declaration order
    #[serde(default)]
    pub mounts: Vec<MountConfig>,
}

impl StatikConfig {
    /// Check the parts of the configuration serde cannot express
    pub fn validate(&self) -> Result<()> {
        if self.mounts.is_empty() {
            return Err(Error::config("at least one mount is required"));
        }
        for mount in &self.mounts {
            if !mount.path.starts_with('/') {
                return Err(Error::Config(format!(
                    "mount path must start with '/': {:?}",
                    mount.path
                )));
            }
            if mount.root.is_empty() {
                return Err(Error::Config(format!(
                    "mount {} has an empty root",
                    mount.path
                )));
            }
        }
        Ok(())
    }
}

/// Listener configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Listen address, `host:port` or `:port`
    #[serde(default = "default_listen")]
    pub listen: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen: default_listen(),
        }
    }
}

fn default_listen() -> String {
    "127.0.0.1:8080".to_string()
}

/// Global logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Log format
    #[serde(default)]
    pub format: LogFormat,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: LogFormat::default(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Log output format
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

/// How paths containing a dot-prefixed segment are treated
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Dotfiles {
    /// Serve them like any other file
    Allow,
    /// Respond 403
    Deny,
    /// Pretend they do not exist (404)
    #[default]
    Ignore,
}

/// A static directory mounted under a path prefix
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MountConfig {
    /// Path prefix the mount answers under
    #[serde(default = "default_mount_path")]
    pub path: String,

    /// Directory served by this mount
    pub root: String,

    /// Defer to the next mount instead of answering 404/405
    #[serde(default = "default_bool_true")]
    pub fallthrough: bool,

    /// Redirect directory requests to the trailing-slash URL
    #[serde(default = "default_bool_true")]
    pub redirect: bool,

    /// Cache-Control max-age in milliseconds
    #[serde(default, alias = "maxage")]
    pub max_age: u64,

    /// Serve `.br` / `.gz` siblings when the client accepts them
    #[serde(default)]
    pub prefer_precompressed: bool,

    /// Index file names tried for trailing-slash requests
    #[serde(default = "default_index")]
    pub index: Vec<String>,

    /// Dotfile policy
    #[serde(default)]
    pub dotfiles: Dotfiles,

    /// Extensions tried when the requested file has none
    #[serde(default)]
    pub extensions: Vec<String>,

    #[serde(default = "default_bool_true")]
    pub etag: bool,

    #[serde(default = "default_bool_true")]
    pub last_modified: bool,

    #[serde(default = "default_bool_true")]
    pub accept_ranges: bool,

    #[serde(default = "default_bool_true")]
    pub cache_control: bool,

    /// Add `immutable` to Cache-Control
    #[serde(default)]
    pub immutable: bool,

    /// Extra response headers set on every served file
    #[serde(default)]
    pub headers: BTreeMap<String, String>,
}

impl MountConfig {
    /// A mount at `/` with every option at its default
    pub fn new(root: impl Into<String>) -> Self {
        Self {
            path: default_mount_path(),
            root: root.into(),
            fallthrough: true,
            redirect: true,
            max_age: 0,
            prefer_precompressed: false,
            index: default_index(),
            dotfiles: Dotfiles::default(),
            extensions: Vec::new(),
            etag: true,
            last_modified: true,
            accept_ranges: true,
            cache_control: true,
            immutable: false,
            headers: BTreeMap::new(),
        }
    }
}

fn default_mount_path() -> String {
    "/".to_string()
}

fn default_index() -> Vec<String> {
    vec!["index.html".to_string()]
}

fn default_bool_true() -> bool {
    true
}
