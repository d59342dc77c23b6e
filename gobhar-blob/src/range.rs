//! `Range` header parsing.
//!
//! Only single ranges in the `bytes` unit are understood. Multi-range
//! requests are rejected rather than answered with some other range.

use crate::{ByteRange, GatewayError, GatewayResult, RangeRequest};

/// Parse an optional `Range` header value against the object size.
///
/// No header yields [`RangeRequest::Full`]; anything else either resolves to a
/// [`RangeRequest::Partial`] inside `[0, total_size)` or fails with
/// `InvalidRange` (syntax) or `RangeNotSatisfiable` (bounds).
pub fn parse_range(header: Option<&str>, total_size: u64) -> GatewayResult<RangeRequest> {
    let Some(raw) = header else {
        return Ok(RangeRequest::Full(ByteRange::full(total_size)));
    };

    let spec = parse_spec(raw)?;
    resolve(spec, total_size).map(RangeRequest::Partial)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RangeSpec {
    /// `bytes=a-b`, inclusive end
    Bounded { first: u64, last: u64 },
    /// `bytes=a-`
    From { first: u64 },
    /// `bytes=-n`
    Suffix { len: u64 },
}

fn parse_spec(raw: &str) -> GatewayResult<RangeSpec> {
    let raw = raw.trim();
    let (unit, set) = raw
        .split_once('=')
        .ok_or_else(|| GatewayError::invalid_range(format!("missing unit in {raw:?}")))?;

    if !unit.trim().eq_ignore_ascii_case("bytes") {
        return Err(GatewayError::invalid_range(format!(
            "unsupported range unit {:?}",
            unit.trim()
        )));
    }

    let set = set.trim();
    if set.contains(',') {
        return Err(GatewayError::invalid_range("multiple ranges are not supported"));
    }

    let (first, last) = set
        .split_once('-')
        .ok_or_else(|| GatewayError::invalid_range(format!("missing '-' in {set:?}")))?;
    let (first, last) = (first.trim(), last.trim());

    match (first.is_empty(), last.is_empty()) {
        (true, true) => Err(GatewayError::invalid_range("empty range")),
        (true, false) => Ok(RangeSpec::Suffix {
            len: parse_offset(last)?,
        }),
        (false, true) => Ok(RangeSpec::From {
            first: parse_offset(first)?,
        }),
        (false, false) => Ok(RangeSpec::Bounded {
            first: parse_offset(first)?,
            last: parse_offset(last)?,
        }),
    }
}

fn parse_offset(digits: &str) -> GatewayResult<u64> {
    if !digits.bytes().all(|b| b.is_ascii_digit()) {
        return Err(GatewayError::invalid_range(format!("not a byte offset: {digits:?}")));
    }
    digits
        .parse::<u64>()
        .map_err(|_| GatewayError::invalid_range(format!("byte offset out of range: {digits}")))
}

fn resolve(spec: RangeSpec, total_size: u64) -> GatewayResult<ByteRange> {
    let (start, end) = match spec {
        RangeSpec::Bounded { first, last } => (first, last.saturating_add(1).min(total_size)),
        RangeSpec::From { first } => (first, total_size),
        RangeSpec::Suffix { len: 0 } => return Err(GatewayError::not_satisfiable(total_size)),
        // Over-long suffixes clamp to the whole file: resume tools over-request
        RangeSpec::Suffix { len } => (total_size.saturating_sub(len), total_size),
    };

    if start >= total_size || start >= end {
        return Err(GatewayError::not_satisfiable(total_size));
    }

    Ok(ByteRange::new(start, end))
}
