//! Market-session classification relative to the exchange close.

use chrono::{NaiveTime, Timelike};

/// Hour of the trading-session cutoff (exchange local time).
pub const MARKET_CLOSE_HOUR: u32 = 15;
/// Minute of the trading-session cutoff.
pub const MARKET_CLOSE_MINUTE: u32 = 15;

/// Whether a clock time is at or after the 15:15 close.
pub fn is_after_close(time: NaiveTime) -> bool {
    let (hour, minute) = (time.hour(), time.minute());
    hour > MARKET_CLOSE_HOUR || (hour == MARKET_CLOSE_HOUR && minute >= MARKET_CLOSE_MINUTE)
}

/// Classify an `HH:MM` announcement time.
///
/// A missing or unparseable time counts as after close.
pub fn classify(time24: Option<&str>) -> bool {
    time24.and_then(parse_time).map_or(true, is_after_close)
}

fn parse_time(time24: &str) -> Option<NaiveTime> {
    let (hour, minute) = time24.trim().split_once(':')?;
    NaiveTime::from_hms_opt(hour.parse().ok()?, minute.parse().ok()?, 0)
}
