//! Statik static file middleware
//!
//! Serves files below a root directory for GET and HEAD requests:
//! - Path resolution memoized in a bounded LRU
//! - Precompressed `.br` / `.gz` siblings chosen from `Accept-Encoding`
//! - Trailing-slash redirects for directories
//! - Conditional and range requests through a pluggable [`Engine`]
//!
//! ```no_run
//! use statik_static::{Outcome, ServeStatic, ServeStaticOptions};
//!
//! # async fn run(req: http::Request<()>) -> statik_core::Result<()> {
//! let serve = ServeStatic::new("public", ServeStaticOptions::default().prefer_precompressed(true))?;
//! match serve.serve(&req).await {
//!     Outcome::Respond(_response) => {}
//!     Outcome::Next(_error) => {}
//! }
//! # Ok(())
//! # }
//! ```

mod body;
mod cache;
mod directory;
mod encoding;
mod mime;
mod negotiate;
mod options;
pub mod send;
mod serve;

pub use body::StaticBody;
pub use cache::{PATH_CACHE_CAPACITY, PathCache, normalize_pathname};
pub use directory::{DirectoryPolicy, encode_url, escape_html, redirect_location, redirect_response};
pub use encoding::Encoding;
pub use mime::content_type;
pub use negotiate::{Negotiated, Negotiator};
pub use options::{ServeStaticOptions, SetHeaders};
pub use send::{
    DirectoryAction, DirectoryContext, Engine, FsEngine, SendError, SendErrorKind, SendEvents,
    SendOptions, SendRequest,
};
pub use serve::{OriginalUri, Outcome, ServeStatic};

// Re-export config enums callers need for options
pub use statik_core::config::Dotfiles;
