//! Precompressed variant negotiation
//!
//! Given the path about to be sent and the client's `Accept-Encoding`, pick a
//! `.br` or `.gz` sibling that exists on disk. Brotli always wins when both
//! are acceptable and present.

use percent_encoding::percent_decode_str;
use std::path::Path;
use tokio::fs;

use crate::encoding::Encoding;

/// A sibling chosen in place of the requested file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Negotiated {
    /// Request path of the sibling, e.g. `/app.js.br`
    pub path: String,
    /// Decoded path of the file the sibling stands in for (after index
    /// substitution); its extension decides the Content-Type
    pub original: String,
    pub encoding: Encoding,
}

/// Picks precompressed siblings
#[derive(Debug, Clone)]
pub struct Negotiator {
    index: String,
}

impl Negotiator {
    /// `index` is the file name substituted for directory paths
    pub fn new(index: impl Into<String>) -> Self {
        Self {
            index: index.into(),
        }
    }

    /// Choose a sibling of `candidate` below `root`, or `None` to serve the
    /// original
    ///
    /// At most one existence check per acceptable coding.
    pub async fn negotiate(
        &self,
        candidate: &str,
        accept_encoding: Option<&str>,
        root: &Path,
    ) -> Option<Negotiated> {
        let accept = accept_encoding?;
        let acceptable: Vec<Encoding> = Encoding::PREFERENCE
            .into_iter()
            .filter(|e| e.accepted_by(accept))
            .collect();
        if acceptable.is_empty() {
            return None;
        }

        let original = self.with_index(candidate);
        let on_disk = disk_path(&original)?;

        for encoding in acceptable {
            let mut sibling = root.join(on_disk.trim_start_matches('/')).into_os_string();
            sibling.push(encoding.extension());

            match fs::metadata(&sibling).await {
                Ok(meta) if meta.is_file() => {
                    tracing::debug!("✅ Using pre-compressed file: {} ({})", on_disk, encoding);
                    return Some(Negotiated {
                        path: format!("{}{}", original, encoding.extension()),
                        original: on_disk,
                        encoding,
                    });
                }
                _ => continue,
            }
        }

        None
    }

    fn with_index(&self, candidate: &str) -> String {
        if candidate.is_empty() {
            format!("/{}", self.index)
        } else if candidate.ends_with('/') {
            format!("{}{}", candidate, self.index)
        } else {
            candidate.to_string()
        }
    }
}

/// Decoded path for the existence check; `None` for paths the engine will
/// reject anyway
fn disk_path(path: &str) -> Option<String> {
    let decoded = percent_decode_str(path).decode_utf8().ok()?;
    if decoded.contains('\0') || decoded.split(['/', '\\']).any(|s| s == "..") {
        return None;
    }
    Some(decoded.into_owned())
}
