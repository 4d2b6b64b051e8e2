//! `Range` request header handling.
//!
//! Only single byte ranges are served. Anything else, including multiple
//! ranges or unknown units, is ignored and the full object is returned, as
//! RFC 9110 allows.

use std::ops::Range;

/// Outcome of matching a `Range` header against an object size.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ByteRange {
    /// No usable range; serve the whole object.
    Full,
    /// Serve this half-open byte range with `206 Partial Content`.
    Partial(Range<u64>),
    /// Syntactically valid, but no byte of the object falls inside.
    Unsatisfiable,
}

/// Parse `bytes=start-end`, `bytes=start-` or `bytes=-suffix` for an
/// object of `size` bytes. HTTP ranges are inclusive; the result is
/// half-open.
pub fn parse_range_header(header: &str, size: u64) -> ByteRange {
    let Some(spec) = header.trim().strip_prefix("bytes=") else {
        return ByteRange::Full;
    };
    if spec.contains(',') {
        return ByteRange::Full;
    }
    let Some((first, last)) = spec.trim().split_once('-') else {
        return ByteRange::Full;
    };
    let (first, last) = (first.trim(), last.trim());

    if first.is_empty() {
        // Suffix: the final `n` bytes.
        let Ok(suffix) = last.parse::<u64>() else {
            return ByteRange::Full;
        };
        if suffix == 0 || size == 0 {
            return ByteRange::Unsatisfiable;
        }
        return ByteRange::Partial(size.saturating_sub(suffix)..size);
    }

    let Ok(start) = first.parse::<u64>() else {
        return ByteRange::Full;
    };
    let end = if last.is_empty() {
        size
    } else {
        match last.parse::<u64>() {
            Ok(end) if end >= start => end.saturating_add(1).min(size),
            _ => return ByteRange::Full,
        }
    };

    if start >= size {
        return ByteRange::Unsatisfiable;
    }
    ByteRange::Partial(start..end)
}

/// `Content-Range` value for a served range.
pub fn content_range(range: &Range<u64>, size: u64) -> String {
    format!("bytes {}-{}/{size}", range.start, range.end - 1)
}
