//! Range header parsing

/// An inclusive byte window
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ByteRange {
    pub start: u64,
    pub end: u64,
}

impl ByteRange {
    #[allow(clippy::len_without_is_empty)]
    pub fn len(&self) -> u64 {
        self.end - self.start + 1
    }

    /// `Content-Range` value for this window of a `size`-byte entity
    pub fn content_range(&self, size: u64) -> String {
        format!("bytes {}-{}/{}", self.start, self.end, size)
    }
}

/// What to do with a `Range` header
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RangeOutcome {
    /// Serve this single window with 206
    Satisfiable(ByteRange),
    /// No listed range overlaps the entity: 416
    Unsatisfiable,
    /// Malformed, non-byte, or multi-range: serve the whole entity
    Ignored,
}

/// Parse a `Range` header against an entity of `size` bytes
///
/// Overlapping and adjacent ranges are merged; only a request that collapses
/// to a single window is honored.
pub fn parse_range(header: &str, size: u64) -> RangeOutcome {
    let Some((unit, spec)) = header.trim().split_once('=') else {
        return RangeOutcome::Ignored;
    };
    if unit.trim() != "bytes" {
        return RangeOutcome::Ignored;
    }

    let mut ranges: Vec<ByteRange> = Vec::new();
    for part in spec.split(',') {
        match parse_one(part, size) {
            Part::Window(range) => ranges.push(range),
            Part::Unsatisfiable => {}
            Part::Malformed => return RangeOutcome::Ignored,
        }
    }

    if ranges.is_empty() {
        return RangeOutcome::Unsatisfiable;
    }

    ranges.sort_by_key(|r| r.start);
    let mut merged: Vec<ByteRange> = Vec::with_capacity(ranges.len());
    for range in ranges {
        match merged.last_mut() {
            Some(last) if range.start <= last.end.saturating_add(1) => {
                last.end = last.end.max(range.end);
            }
            _ => merged.push(range),
        }
    }

    match merged.as_slice() {
        [only] => RangeOutcome::Satisfiable(*only),
        _ => RangeOutcome::Ignored,
    }
}

enum Part {
    Window(ByteRange),
    Unsatisfiable,
    Malformed,
}

fn parse_one(part: &str, size: u64) -> Part {
    let Some((start, end)) = part.trim().split_once('-') else {
        return Part::Malformed;
    };
    let (start, end) = (start.trim(), end.trim());

    let (start, end) = if start.is_empty() {
        // suffix range: the final N bytes
        let Ok(suffix) = end.parse::<u64>() else {
            return Part::Malformed;
        };
        if suffix == 0 || size == 0 {
            return Part::Unsatisfiable;
        }
        (size.saturating_sub(suffix), size - 1)
    } else {
        let Ok(start) = start.parse::<u64>() else {
            return Part::Malformed;
        };
        let end = if end.is_empty() {
            None
        } else {
            match end.parse::<u64>() {
                Ok(end) => Some(end),
                Err(_) => return Part::Malformed,
            }
        };
        if end.is_some_and(|end| start > end) {
            return Part::Unsatisfiable;
        }
        let Some(last) = size.checked_sub(1) else {
            return Part::Unsatisfiable;
        };
        (start, end.unwrap_or(last).min(last))
    };

    if start > end {
        return Part::Unsatisfiable;
    }
    Part::Window(ByteRange { start, end })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn window(start: u64, end: u64) -> RangeOutcome {
        RangeOutcome::Satisfiable(ByteRange { start, end })
    }

    #[test]
    fn test_simple_ranges() {
        assert_eq!(parse_range("bytes=0-4", 10), window(0, 4));
        assert_eq!(parse_range("bytes=5-", 10), window(5, 9));
        assert_eq!(parse_range("bytes=-3", 10), window(7, 9));
        assert_eq!(parse_range("bytes=2-100", 10), window(2, 9));
    }

    #[test]
    fn test_unsatisfiable() {
        assert_eq!(parse_range("bytes=10-", 10), RangeOutcome::Unsatisfiable);
        assert_eq!(parse_range("bytes=5-2", 10), RangeOutcome::Unsatisfiable);
        assert_eq!(parse_range("bytes=0-0", 0), RangeOutcome::Unsatisfiable);
        assert_eq!(parse_range("bytes=-0", 10), RangeOutcome::Unsatisfiable);
        assert_eq!(parse_range("bytes=20-30,40-", 10), RangeOutcome::Unsatisfiable);
    }

    #[test]
    fn test_ignored() {
        assert_eq!(parse_range("items=0-4", 10), RangeOutcome::Ignored);
        assert_eq!(parse_range("0-4", 10), RangeOutcome::Ignored);
        assert_eq!(parse_range("bytes=0-1,5-6", 10), RangeOutcome::Ignored);
        assert_eq!(parse_range("bytes=abc", 10), RangeOutcome::Ignored);
        assert_eq!(parse_range("bytes=x-y", 10), RangeOutcome::Ignored);
        assert_eq!(parse_range("bytes=0-4,junk", 10), RangeOutcome::Ignored);
        assert_eq!(parse_range("bytes=20-30,1-x", 10), RangeOutcome::Ignored);
    }

    #[test]
    fn test_merges_overlaps() {
        assert_eq!(parse_range("bytes=0-3,2-6", 10), window(0, 6));
        assert_eq!(parse_range("bytes=4-5,0-3", 10), window(0, 5));
        assert_eq!(parse_range("bytes=0-4,20-30", 10), window(0, 4));
    }

    #[test]
    fn test_content_range() {
        let range = ByteRange { start: 0, end: 4 };
        assert_eq!(range.len(), 5);
        assert_eq!(range.content_range(11), "bytes 0-4/11");
    }
}
