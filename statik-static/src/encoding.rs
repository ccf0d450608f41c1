//! Content-coding support for precompressed variants

use std::fmt;

/// Codings a precompressed sibling can carry, in preference order
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Encoding {
    Brotli,
    Gzip,
}

impl Encoding {
    /// Negotiation order: brotli always wins over gzip
    pub const PREFERENCE: [Encoding; 2] = [Encoding::Brotli, Encoding::Gzip];

    /// Get the content-encoding header value
    pub fn encoding(&self) -> &'static str {
        match self {
            Encoding::Brotli => "br",
            Encoding::Gzip => "gzip",
        }
    }

    /// Suffix of the sibling file holding this coding
    pub fn extension(&self) -> &'static str {
        match self {
            Encoding::Brotli => ".br",
            Encoding::Gzip => ".gz",
        }
    }

    /// Whether an `Accept-Encoding` header value admits this coding
    ///
    /// Parameters other than `q` are ignored; `q=0` rejects the coding and
    /// `*` admits anything not explicitly listed.
    pub fn accepted_by(&self, accept_encoding: &str) -> bool {
        let mut wildcard = None;
        for part in accept_encoding.split(',') {
            let mut params = part.split(';');
            let token = params.next().unwrap_or("").trim();
            let acceptable = quality(params) > 0.0;

            if token.eq_ignore_ascii_case(self.encoding()) {
                return acceptable;
            }
            if token == "*" {
                wildcard = Some(acceptable);
            }
        }
        wildcard.unwrap_or(false)
    }
}

impl fmt::Display for Encoding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.encoding())
    }
}

fn quality<'a>(params: impl Iterator<Item = &'a str>) -> f32 {
    params
        .filter_map(|p| {
            let (name, value) = p.split_once('=')?;
            if name.trim().eq_ignore_ascii_case("q") {
                value.trim().parse::<f32>().ok()
            } else {
                None
            }
        })
        .next()
        .unwrap_or(1.0)
}
