//! Conversion between GStreamer's `GST_TIME_FORMAT` text and seconds.
//!
//! GStreamer prints clock times as `H:MM:SS.nnnnnnnnn`, signed variants with a
//! leading `+`/`-`, and `GST_CLOCK_TIME_NONE` as `99:99:99.999999999`.

use crate::error::ClockTimeError;
use once_cell::sync::Lazy;
use regex::Regex;

pub const NS_PER_SECOND: u64 = 1_000_000_000;

/// Text GStreamer prints for `GST_CLOCK_TIME_NONE`
pub const CLOCK_TIME_NONE: &str = "99:99:99.999999999";

// Any of the reserved all-nines fields marks the time as unknown.
const NONE_MARKER: &str = "9:99:99";

static CLOCK_TIME: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^([+-])?(\d+):(\d{2}):(\d{2})\.(\d{1,9})$").unwrap());

/// Returns true when `text` is the "no known time" sentinel
pub fn is_unknown(text: &str) -> bool {
    text.contains(NONE_MARKER)
}

/// Parse a clock time into seconds, failing on the sentinel
pub fn parse(text: &str) -> Result<f64, ClockTimeError> {
    if is_unknown(text) {
        return Err(ClockTimeError::TimeUnknown);
    }
    parse_known(text)
}

/// Parse a clock time into seconds, mapping the sentinel to `default`
pub fn parse_or(text: &str, default: f64) -> Result<f64, ClockTimeError> {
    if is_unknown(text) {
        return Ok(default);
    }
    parse_known(text)
}

fn parse_known(text: &str) -> Result<f64, ClockTimeError> {
    let malformed = || ClockTimeError::TimeMalformed(text.to_string());
    let caps = CLOCK_TIME.captures(text).ok_or_else(malformed)?;

    let hours: u64 = caps[2].parse().map_err(|_| malformed())?;
    let minutes: u64 = caps[3].parse().map_err(|_| malformed())?;
    let seconds: u64 = caps[4].parse().map_err(|_| malformed())?;

    // Right-pad the fraction to nanoseconds
    let fraction = &caps[5];
    let mut nanos: u64 = fraction.parse().map_err(|_| malformed())?;
    for _ in fraction.len()..9 {
        nanos *= 10;
    }

    let total_ns = hours
        .checked_mul(3600)
        .and_then(|h| h.checked_add(minutes * 60 + seconds))
        .and_then(|s| s.checked_mul(NS_PER_SECOND))
        .and_then(|ns| ns.checked_add(nanos))
        .ok_or_else(malformed)?;

    let magnitude = total_ns as f64 / NS_PER_SECOND as f64;
    match caps.get(1).map(|m| m.as_str()) {
        Some("-") => Ok(-magnitude),
        _ => Ok(magnitude),
    }
}

/// Encode seconds as `H:MM:SS.nnnnnnnnn`.
///
/// Non-finite values and values past the nanosecond range encode as
/// [`CLOCK_TIME_NONE`].
pub fn format(seconds: f64) -> String {
    if !seconds.is_finite() {
        return CLOCK_TIME_NONE.to_string();
    }
    let total = (seconds.abs() * NS_PER_SECOND as f64).round();
    // beyond u64 nanoseconds
    if total >= u64::MAX as f64 {
        return CLOCK_TIME_NONE.to_string();
    }
    let sign = if seconds.is_sign_negative() { "-" } else { "" };
    let total = total as u64;

    let nanos = total % NS_PER_SECOND;
    let whole = total / NS_PER_SECOND;
    let hours = whole / 3600;
    let minutes = (whole / 60) % 60;
    let secs = whole % 60;

    format!("{}{}:{:02}:{:02}.{:09}", sign, hours, minutes, secs, nanos)
}

/// Resolve a PTS/DTS pair where either side may be unknown.
///
/// An unknown PTS takes the DTS (itself defaulting to `default`) for both
/// values; an unknown DTS takes the PTS.
pub fn pts_or_dts(pts: &str, dts: &str, default: f64) -> Result<(f64, f64), ClockTimeError> {
    let pts = match parse(pts) {
        Ok(pts) => pts,
        Err(ClockTimeError::TimeUnknown) => {
            let dts = parse_or(dts, default)?;
            return Ok((dts, dts));
        }
        Err(e) => return Err(e),
    };
    match parse(dts) {
        Ok(dts) => Ok((pts, dts)),
        Err(ClockTimeError::TimeUnknown) => Ok((pts, pts)),
        Err(e) => Err(e),
    }
}
