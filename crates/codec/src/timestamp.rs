//! ISO-8601 timestamp text
//!
//! Timestamps render as `YYYY-MM-DDTHH:MM:SSZ` in UTC. Parsing is strict:
//! exactly 20 characters, separators at fixed positions and digits everywhere
//! else. The empty string parses to the epoch, which is how unset stamps are
//! written.

use chrono::{DateTime, NaiveDate};
use keystone_core::{Error, Result, Timestamp};

/// Length of a formatted timestamp
pub const TIMESTAMP_LEN: usize = 20;

/// Largest timestamp with a four-digit year (9999-12-31T23:59:59Z)
pub const MAX_TIMESTAMP_SECS: u64 = 253_402_300_799;

/// Format as `YYYY-MM-DDTHH:MM:SSZ`
pub fn format_timestamp(ts: Timestamp) -> Result<String> {
    let secs = ts.as_secs();
    if secs > MAX_TIMESTAMP_SECS {
        return Err(Error::InvalidTimestamp(secs.to_string()));
    }
    let dt = DateTime::from_timestamp(secs as i64, 0)
        .ok_or_else(|| Error::InvalidTimestamp(secs.to_string()))?;
    Ok(dt.format("%Y-%m-%dT%H:%M:%SZ").to_string())
}

/// Parse `YYYY-MM-DDTHH:MM:SSZ`; the empty string is the epoch
pub fn parse_timestamp(raw: &str) -> Result<Timestamp> {
    if raw.is_empty() {
        return Ok(Timestamp::EPOCH);
    }

    let invalid = || Error::InvalidTimestamp(raw.to_string());
    let bytes = raw.as_bytes();
    if bytes.len() != TIMESTAMP_LEN {
        return Err(invalid());
    }
    for (i, b) in bytes.iter().enumerate() {
        let ok = match i {
            4 | 7 => *b == b'-',
            10 => *b == b'T',
            13 | 16 => *b == b':',
            19 => *b == b'Z',
            _ => b.is_ascii_digit(),
        };
        if !ok {
            return Err(invalid());
        }
    }

    // All numeric fields are ASCII digits at this point
    let field = |start: usize, end: usize| -> u32 {
        raw[start..end]
            .bytes()
            .fold(0u32, |acc, d| acc * 10 + u32::from(d - b'0'))
    };

    let secs = NaiveDate::from_ymd_opt(field(0, 4) as i32, field(5, 7), field(8, 10))
        .and_then(|date| date.and_hms_opt(field(11, 13), field(14, 16), field(17, 19)))
        .map(|dt| dt.and_utc().timestamp())
        .ok_or_else(invalid)?;

    if secs < 0 {
        return Err(invalid());
    }
    Ok(Timestamp::from_secs(secs as u64))
}
