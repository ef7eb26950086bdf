//! OLE Automation date encoding used for every timestamp on the wire.
//!
//! The integer part counts days since 1899-12-30 and the fractional part is
//! the elapsed fraction of the day. Values are derived from 100ns ticks
//! counted from 0001-01-01, matching the viewer's native clock.

use chrono::NaiveDateTime;

/// Ticks between 0001-01-01 and the Unix epoch.
pub const TICKS_EPOCH_OFFSET: i64 = 621_355_968_000_000_000;
pub const MICROSECONDS_PER_DAY: i64 = 86_400_000_000;
/// Days between 1899-12-30 and the Unix epoch.
pub const DAY_OFFSET: i64 = 25_569;

const TICKS_PER_MICROSECOND: i64 = 10;

/// 100ns ticks since 0001-01-01 for `timestamp`, saturating at the `i64`
/// range.
pub fn ticks(timestamp: NaiveDateTime) -> i64 {
    let utc = timestamp.and_utc();
    let sub_micro = i64::from(utc.timestamp_subsec_nanos() % 1_000 / 100);
    utc.timestamp_micros()
        .checked_mul(TICKS_PER_MICROSECOND)
        .map_or(i64::MAX, |ticks| ticks.saturating_add(sub_micro))
        .saturating_add(TICKS_EPOCH_OFFSET)
}

/// Encode `timestamp` as an OLE Automation date.
pub fn encode(timestamp: NaiveDateTime) -> f64 {
    let micros = timestamp.and_utc().timestamp_micros();
    micros as f64 / MICROSECONDS_PER_DAY as f64 + DAY_OFFSET as f64
}
