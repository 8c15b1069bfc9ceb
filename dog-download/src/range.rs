//! `Range` header resolution against a known content length.
//!
//! Only the first range of a multi-range request is honoured, and anything
//! that does not parse is ignored so the full content is served instead.

use crate::ByteRange;

/// What to serve for a request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RangeDecision {
    /// No usable range: serve everything (200)
    Full,
    /// Serve this span only (206)
    Partial(ByteRange),
    /// The range lies outside the content (416)
    NotSatisfiable,
}

impl RangeDecision {
    pub fn is_partial(&self) -> bool {
        matches!(self, RangeDecision::Partial(_))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RangeSpec {
    Bounded { start: u64, end: u64 },
    From { start: u64 },
    Suffix { length: u64 },
}

/// Resolve a raw `Range` header value (e.g. `bytes=200-299`) against `total_length`.
pub fn resolve_range(requested: Option<&str>, total_length: u64) -> RangeDecision {
    let Some(spec) = requested.and_then(parse_first_spec) else {
        return RangeDecision::Full;
    };

    let last = match total_length.checked_sub(1) {
        Some(last) => last,
        None => return RangeDecision::NotSatisfiable,
    };

    let span = match spec {
        RangeSpec::Bounded { start, end } => {
            if start > end || start >= total_length {
                return RangeDecision::NotSatisfiable;
            }
            ByteRange::new(start, end.min(last))
        }
        RangeSpec::From { start } => {
            if start >= total_length {
                return RangeDecision::NotSatisfiable;
            }
            ByteRange::new(start, last)
        }
        RangeSpec::Suffix { length } => {
            if length == 0 {
                return RangeDecision::NotSatisfiable;
            }
            ByteRange::new(total_length.saturating_sub(length), last)
        }
    };

    span.map_or(RangeDecision::NotSatisfiable, RangeDecision::Partial)
}

fn parse_first_spec(header: &str) -> Option<RangeSpec> {
    let (unit, ranges) = header.trim().split_once('=')?;
    if !unit.trim().eq_ignore_ascii_case("bytes") {
        return None;
    }

    let first = ranges.split(',').next()?.trim();
    let (start, end) = first.split_once('-')?;
    let (start, end) = (start.trim(), end.trim());

    match (start.is_empty(), end.is_empty()) {
        (true, true) => None,
        (true, false) => Some(RangeSpec::Suffix {
            length: parse_digits(end)?,
        }),
        (false, true) => Some(RangeSpec::From {
            start: parse_digits(start)?,
        }),
        (false, false) => Some(RangeSpec::Bounded {
            start: parse_digits(start)?,
            end: parse_digits(end)?,
        }),
    }
}

fn parse_digits(s: &str) -> Option<u64> {
    if !s.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    s.parse().ok()
}
