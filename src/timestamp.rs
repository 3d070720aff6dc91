//! Conversion of browser export timestamps.
//!
//! Exports store `date_added` as a decimal count of ticks since
//! 1601-01-01T00:00:00 UTC, where one tick is one microsecond.

use chrono::{DateTime, NaiveDate, TimeDelta, Utc};

use crate::errors::{AppError, AppResult};

/// Ticks accumulated per step onto the epoch.
const TICKS_PER_CHUNK: i64 = 10_000_000_000_000;

/// 1601-01-01T00:00:00 UTC
pub fn epoch() -> DateTime<Utc> {
    NaiveDate::from_ymd_opt(1601, 1, 1)
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
        .unwrap_or(DateTime::<Utc>::MIN_UTC)
}

/// Converts a decimal tick string into a UTC instant.
///
/// The value is added onto the epoch in chunks of [`TICKS_PER_CHUNK`] so no
/// single duration ever exceeds the range chrono accepts.
pub fn parse_timestamp(ticks: &str) -> AppResult<DateTime<Utc>> {
    let malformed = |reason: String| AppError::MalformedTimestamp {
        value: ticks.to_string(),
        reason,
    };

    let value = ticks
        .trim()
        .parse::<i64>()
        .map_err(|err| malformed(err.to_string()))?;

    if value < 0 {
        return Err(malformed("negative tick count".to_string()));
    }

    let chunks = value / TICKS_PER_CHUNK;
    let remainder = value % TICKS_PER_CHUNK;

    let step = TimeDelta::microseconds(TICKS_PER_CHUNK);
    let mut instant = epoch();
    for _ in 0..chunks {
        instant = instant
            .checked_add_signed(step)
            .ok_or_else(|| malformed("instant out of range".to_string()))?;
    }

    instant
        .checked_add_signed(TimeDelta::microseconds(remainder))
        .ok_or_else(|| malformed("instant out of range".to_string()))
}
